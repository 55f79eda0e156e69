//! Recorded cluster snapshot
//!
//! A JSON document listing nodes and per-container usage as Kubernetes
//! quantity strings, as captured from the metrics API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::MetricsSource;
use crate::error::{EstimatorError, Result};
use crate::models::{Node, WorkloadSample};
use crate::quantity::container_usage;

/// On-disk snapshot layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotDocument {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub workloads: Vec<SnapshotWorkload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotWorkload {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    pub node_name: String,
    #[serde(default)]
    pub containers: Vec<SnapshotContainer>,
}

/// Container usage as quantity strings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotContainer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub cpu: String,
    pub memory: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ephemeral_storage: Option<String>,
}

impl SnapshotWorkload {
    /// Convert quantity strings into billing units
    pub fn to_sample(&self) -> Result<WorkloadSample> {
        let containers = self
            .containers
            .iter()
            .map(|c| container_usage(&c.cpu, &c.memory, c.ephemeral_storage.as_deref()))
            .collect::<Result<Vec<_>>>()?;

        Ok(WorkloadSample {
            name: self.name.clone(),
            namespace: self.namespace.clone(),
            node_name: self.node_name.clone(),
            containers,
        })
    }
}

/// Metrics source backed by a snapshot file
pub struct SnapshotSource {
    path: PathBuf,
    nodes: Vec<Node>,
    workloads: Vec<WorkloadSample>,
}

impl SnapshotSource {
    /// Read and decode a snapshot file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| EstimatorError::Io {
                path: path.clone(),
                source,
            })?;

        let mut snapshot = Self::from_json(&raw)?;
        snapshot.path = path;
        Ok(snapshot)
    }

    /// Decode a snapshot document held in memory
    pub fn from_json(raw: &str) -> Result<Self> {
        let document: SnapshotDocument =
            serde_json::from_str(raw).map_err(|source| EstimatorError::Json {
                what: "metrics snapshot".to_string(),
                source,
            })?;
        Self::from_document(document)
    }

    pub fn from_document(document: SnapshotDocument) -> Result<Self> {
        let workloads = document
            .workloads
            .iter()
            .map(SnapshotWorkload::to_sample)
            .collect::<Result<Vec<_>>>()?;

        debug!(
            nodes = document.nodes.len(),
            workloads = workloads.len(),
            "Loaded metrics snapshot"
        );

        Ok(Self {
            path: PathBuf::new(),
            nodes: document.nodes,
            workloads,
        })
    }

    /// File the snapshot was read from, empty for in-memory documents
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl MetricsSource for SnapshotSource {
    async fn nodes(&self) -> Result<Vec<Node>> {
        Ok(self.nodes.clone())
    }

    async fn workloads(&self) -> Result<Vec<WorkloadSample>> {
        Ok(self.workloads.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SNAPSHOT: &str = r#"{
        "nodes": [
            {"name": "gk3-pool-1", "instance_type": "e2-standard-4", "region": "us-central1", "spot": false},
            {"name": "gk3-spot-1", "instance_type": "t2a-standard-4", "region": "us-central1", "spot": true}
        ],
        "workloads": [
            {
                "name": "frontend-7d9f",
                "namespace": "shop",
                "node_name": "gk3-pool-1",
                "containers": [
                    {"name": "app", "cpu": "250m", "memory": "128Mi", "ephemeral_storage": "1Gi"},
                    {"name": "proxy", "cpu": "12345678n", "memory": "64Mi"}
                ]
            }
        ]
    }"#;

    #[tokio::test]
    async fn test_load_snapshot_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SNAPSHOT.as_bytes()).unwrap();

        let source = SnapshotSource::load(file.path()).await.unwrap();
        assert_eq!(source.path(), file.path());

        let nodes = source.nodes().await.unwrap();
        assert_eq!(nodes.len(), 2);
        assert!(nodes[1].spot);

        let workloads = source.workloads().await.unwrap();
        assert_eq!(workloads.len(), 1);
        assert_eq!(workloads[0].namespace, "shop");

        let total = workloads[0].total_usage();
        assert_eq!(total.cpu_milli, 250 + 13);
        assert_eq!(total.memory_mib, 134 + 67);
        assert_eq!(total.storage_mib, 1073);
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = SnapshotSource::load(dir.path().join("absent.json")).await;
        assert!(matches!(result, Err(EstimatorError::Io { .. })));
    }

    #[test]
    fn test_bad_quantity_is_rejected() {
        let raw = r#"{"workloads": [{"name": "w", "node_name": "n",
            "containers": [{"cpu": "lots", "memory": "1Gi"}]}]}"#;
        assert!(matches!(
            SnapshotSource::from_json(raw),
            Err(EstimatorError::InvalidQuantity { .. })
        ));
    }

    #[tokio::test]
    async fn test_oversized_containers_saturate() {
        let raw = r#"{
            "nodes": [{"name": "n", "instance_type": "e2-standard-4", "region": "us-central1"}],
            "workloads": [{"name": "w", "node_name": "n",
                "containers": [{"cpu": "10P", "memory": "1Gi"}, {"cpu": "10P", "memory": "1Gi"}]}]
        }"#;
        let source = SnapshotSource::from_json(raw).unwrap();
        let samples = source.workloads().await.unwrap();
        assert_eq!(samples[0].total_usage().cpu_milli, u64::MAX);

        let pricing = crate::pricing::RegionPricing::new("us-central1");
        let nodes = crate::sources::collect_nodes(&source).await.unwrap();
        let report = crate::Estimator::new(&pricing).estimate(nodes, &samples);
        assert_eq!(report.workloads().next().unwrap().usage.as_tuple().0, u64::MAX);
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        assert!(matches!(
            SnapshotSource::from_json("{nodes:"),
            Err(EstimatorError::Json { .. })
        ));
    }
}
