//! Configuration management for the CLI

use anyhow::{Context, Result};
use estimator_lib::{CostPolicy, ARM_TYPE_MARKER, CLUSTER_FEE, ONE_YEAR_DISCOUNT, THREE_YEAR_DISCOUNT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix, e.g. `AP_ESTIMATE_CLUSTER_FEE`
const ENV_PREFIX: &str = "AP_ESTIMATE";

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Flat cluster management fee per hour
    #[serde(default = "default_cluster_fee")]
    pub cluster_fee: f64,

    #[serde(default = "default_one_year_factor")]
    pub one_year_factor: f64,

    #[serde(default = "default_three_year_factor")]
    pub three_year_factor: f64,

    /// Instance type fragment that marks Arm nodes
    #[serde(default = "default_arm_type_marker")]
    pub arm_type_marker: String,

    /// Namespaces whose pods are left out of the estimate
    #[serde(default = "default_excluded_namespaces")]
    pub excluded_namespaces: Vec<String>,

    #[serde(default)]
    pub billing: BillingSettings,
}

/// Cloud Billing catalog access
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingSettings {
    #[serde(default = "default_billing_url")]
    pub base_url: String,

    /// Kubernetes Engine service in the billing catalog
    #[serde(default = "default_service_id")]
    pub service_id: String,

    #[serde(default = "default_currency_code")]
    pub currency_code: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// OAuth bearer token, e.g. from `gcloud auth print-access-token`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

fn default_cluster_fee() -> f64 {
    CLUSTER_FEE
}

fn default_one_year_factor() -> f64 {
    ONE_YEAR_DISCOUNT
}

fn default_three_year_factor() -> f64 {
    THREE_YEAR_DISCOUNT
}

fn default_arm_type_marker() -> String {
    ARM_TYPE_MARKER.to_string()
}

fn default_excluded_namespaces() -> Vec<String> {
    vec!["kube-system".to_string(), "gke-gmp-system".to_string()]
}

fn default_billing_url() -> String {
    "https://cloudbilling.googleapis.com/".to_string()
}

fn default_service_id() -> String {
    "CCD8-9BF1-090E".to_string()
}

fn default_currency_code() -> String {
    "USD".to_string()
}

impl Default for BillingSettings {
    fn default() -> Self {
        Self {
            base_url: default_billing_url(),
            service_id: default_service_id(),
            currency_code: default_currency_code(),
            api_key: None,
            access_token: None,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cluster_fee: default_cluster_fee(),
            one_year_factor: default_one_year_factor(),
            three_year_factor: default_three_year_factor(),
            arm_type_marker: default_arm_type_marker(),
            excluded_namespaces: default_excluded_namespaces(),
            billing: BillingSettings::default(),
        }
    }
}

impl Settings {
    /// Load defaults, then the config file, then `AP_ESTIMATE_*` variables
    ///
    /// An explicit `path` must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        let file = match path {
            Some(path) => Some((path.to_path_buf(), true)),
            None => Self::config_path().map(|p| (p, false)),
        };
        if let Some((file, required)) = &file {
            builder = builder.add_source(
                config::File::from(file.as_path())
                    .format(config::FileFormat::Toml)
                    .required(*required),
            );
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("excluded_namespaces")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to load configuration")?;

        config
            .try_deserialize()
            .context("Invalid configuration value")
    }

    pub fn policy(&self) -> CostPolicy {
        CostPolicy {
            cluster_fee: self.cluster_fee,
            one_year_factor: self.one_year_factor,
            three_year_factor: self.three_year_factor,
        }
    }

    /// Default configuration file path, if a home directory is known
    fn config_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".config").join("ap-estimate").join("config.toml"))
    }
}
