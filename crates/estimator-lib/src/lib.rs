//! Autopilot migration cost estimator
//!
//! This crate provides the core functionality for:
//! - Raising measured usage to Autopilot's billing minimums
//! - Selecting the compute class each workload would run on
//! - Pricing workloads from the regional price catalog
//! - Aggregating node and cluster totals with commitment discounts
//! - Loading usage snapshots and catalog files, and run observability

pub mod classifier;
pub mod context;
pub mod error;
pub mod estimate;
pub mod limits;
pub mod models;
pub mod observability;
pub mod pricing;
pub mod quantity;
pub mod sources;

#[cfg(test)]
mod test_logs;

pub use classifier::classify;
pub use context::ClusterContext;
pub use error::{EstimatorError, Result};
pub use estimate::{
    aggregate, ClusterCostSummary, CostPolicy, CostReport, Estimator, ARM_TYPE_MARKER,
    CLUSTER_FEE, ONE_YEAR_DISCOUNT, THREE_YEAR_DISCOUNT,
};
pub use limits::{normalize, BillableUsage};
pub use models::*;
pub use observability::{EstimatorMetrics, StructuredLogger};
pub use pricing::{price, BillingMode, PriceKey, RegionPricing, UnitPrices};
pub use sources::{CatalogFile, MetricsSource, PriceCatalog, SnapshotSource};
