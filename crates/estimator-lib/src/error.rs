//! Error types for the estimator library
//!
//! The pricing core never fails: degraded inputs are logged and priced
//! at zero. Errors only come from the collaborators that feed it
//! (snapshot files, price catalogs, quantity strings, context names).

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or decoding estimator inputs
#[derive(Error, Debug)]
pub enum EstimatorError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {what}: {source}")]
    Json {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid quantity {value:?}: {reason}")]
    InvalidQuantity { value: String, reason: String },

    #[error("invalid unit price for SKU {sku:?}: {reason}")]
    InvalidPrice { sku: String, reason: String },

    #[error("invalid cluster context {0:?}, expected gke_<project>_<location>_<cluster>")]
    InvalidContext(String),

    #[error("input source unavailable: {0}")]
    Source(String),

    #[error("metrics registry error: {0}")]
    Metrics(#[from] prometheus::Error),
}

pub type Result<T> = std::result::Result<T, EstimatorError>;
