//! Inputs of an estimation run
//!
//! Usage metrics and catalog prices come from collaborators behind two
//! traits, so the same pipeline runs against a live cluster, a recorded
//! snapshot, or test doubles.

mod catalog_file;
mod snapshot;

pub use catalog_file::CatalogFile;
pub use snapshot::{SnapshotContainer, SnapshotDocument, SnapshotSource, SnapshotWorkload};

use std::collections::BTreeMap;

use crate::error::Result;
use crate::models::{Node, WorkloadSample};
use crate::pricing::{RegionPricing, Sku};

pub use async_trait::async_trait;

/// Source of cluster nodes and per-workload usage
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// List nodes with their instance type, region and spot flag
    async fn nodes(&self) -> Result<Vec<Node>>;

    /// List workloads with per-container usage in billing units
    async fn workloads(&self) -> Result<Vec<WorkloadSample>>;
}

/// Source of price catalog SKUs
#[async_trait]
pub trait PriceCatalog: Send + Sync {
    async fn skus(&self) -> Result<Vec<Sku>>;
}

/// Nodes keyed by name, last one wins on duplicates
pub async fn collect_nodes(source: &dyn MetricsSource) -> Result<BTreeMap<String, Node>> {
    let nodes = source.nodes().await?;
    Ok(nodes.into_iter().map(|n| (n.name.clone(), n)).collect())
}

/// Fetch the catalog and build the price table of `region`
pub async fn load_pricing(catalog: &dyn PriceCatalog, region: &str) -> Result<RegionPricing> {
    let skus = catalog.skus().await?;
    RegionPricing::from_skus(region, &skus)
}
