//! GKE cluster identity from a kubeconfig context name

use serde::Serialize;
use std::str::FromStr;

use crate::error::EstimatorError;

const GKE_CONTEXT_PREFIX: &str = "gke";

/// Project, location and name of a GKE cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterContext {
    pub project: String,
    /// Zone (`us-central1-a`) or region (`us-central1`)
    pub location: String,
    pub cluster: String,
}

impl ClusterContext {
    /// Region that hosts the cluster
    ///
    /// Zonal locations end in a single-letter zone suffix that is dropped.
    pub fn region(&self) -> String {
        match self.location.rsplit_once('-') {
            Some((region, zone)) if is_zone_suffix(zone) => region.to_string(),
            _ => self.location.clone(),
        }
    }
}

fn is_zone_suffix(segment: &str) -> bool {
    segment.len() == 1 && segment.chars().all(|c| c.is_ascii_lowercase())
}

impl FromStr for ClusterContext {
    type Err = EstimatorError;

    /// Parse `gke_<project>_<location>_<cluster>`
    fn from_str(context: &str) -> Result<Self, Self::Err> {
        let mut parts = context.splitn(4, '_');
        let (Some(prefix), Some(project), Some(location), Some(cluster)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(EstimatorError::InvalidContext(context.to_string()));
        };

        if prefix != GKE_CONTEXT_PREFIX
            || project.is_empty()
            || location.is_empty()
            || cluster.is_empty()
        {
            return Err(EstimatorError::InvalidContext(context.to_string()));
        }

        Ok(Self {
            project: project.to_string(),
            location: location.to_string(),
            cluster: cluster.to_string(),
        })
    }
}
