//! Workload estimation and cluster aggregation
//!
//! Each workload is estimated independently (normalize, classify, price);
//! a single fold then attaches the results to their nodes and derives the
//! cluster totals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::classifier::classify;
use crate::limits::normalize;
use crate::models::{Node, Workload, WorkloadSample};
use crate::pricing::{price, RegionPricing};

/// Flat Autopilot cluster management fee per hour
pub const CLUSTER_FEE: f64 = 0.10;

/// Share of the on-demand price paid with a one-year commitment
pub const ONE_YEAR_DISCOUNT: f64 = 0.8;

/// Share of the on-demand price paid with a three-year commitment
pub const THREE_YEAR_DISCOUNT: f64 = 0.55;

/// Instance type fragment identifying Arm (Tau T2A) nodes
pub const ARM_TYPE_MARKER: &str = "t2a-";

/// Fee and commitment factors applied to cluster totals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostPolicy {
    pub cluster_fee: f64,
    pub one_year_factor: f64,
    pub three_year_factor: f64,
}

impl Default for CostPolicy {
    fn default() -> Self {
        Self {
            cluster_fee: CLUSTER_FEE,
            one_year_factor: ONE_YEAR_DISCOUNT,
            three_year_factor: THREE_YEAR_DISCOUNT,
        }
    }
}

/// Cluster-wide hourly totals
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClusterCostSummary {
    /// Cluster fee plus every workload on a non-spot node
    pub on_demand_hourly: f64,
    /// Workloads on spot nodes, never discounted
    pub spot_hourly: f64,
    pub total_hourly: f64,
    pub one_year_hourly: f64,
    pub three_year_hourly: f64,
}

impl ClusterCostSummary {
    /// Derive totals from the two accumulators
    ///
    /// `on_demand_hourly` must already include the cluster fee.
    pub fn new(on_demand_hourly: f64, spot_hourly: f64, policy: &CostPolicy) -> Self {
        Self {
            on_demand_hourly,
            spot_hourly,
            total_hourly: on_demand_hourly + spot_hourly,
            one_year_hourly: spot_hourly + on_demand_hourly * policy.one_year_factor,
            three_year_hourly: spot_hourly + on_demand_hourly * policy.three_year_factor,
        }
    }

    /// Fold node totals into the cluster accumulators
    pub fn from_nodes<'a>(nodes: impl IntoIterator<Item = &'a Node>, policy: &CostPolicy) -> Self {
        let (on_demand, spot) = nodes.into_iter().fold(
            (policy.cluster_fee, 0.0),
            |(on_demand, spot), node| {
                if node.spot {
                    (on_demand, spot + node.cost)
                } else {
                    (on_demand + node.cost, spot)
                }
            },
        );
        Self::new(on_demand, spot, policy)
    }
}

/// Result of one estimation run
#[derive(Debug, Clone, Serialize)]
pub struct CostReport {
    pub region: String,
    pub generated_at: DateTime<Utc>,
    /// Nodes keyed by name, each with its hosted workloads
    pub nodes: BTreeMap<String, Node>,
    /// Workloads whose node was not reported by the metrics source
    pub unassigned: Vec<Workload>,
    pub summary: ClusterCostSummary,
}

impl CostReport {
    /// Every estimated workload, node by node, then unassigned ones
    pub fn workloads(&self) -> impl Iterator<Item = &Workload> {
        self.nodes
            .values()
            .flat_map(|n| n.workloads.iter())
            .chain(self.unassigned.iter())
    }

    pub fn workload_count(&self) -> usize {
        self.nodes.values().map(|n| n.workloads.len()).sum::<usize>() + self.unassigned.len()
    }
}

/// Runs the per-workload pipeline against one region's prices
pub struct Estimator<'a> {
    pricing: &'a RegionPricing,
    policy: CostPolicy,
    arm_type_marker: String,
}

impl<'a> Estimator<'a> {
    pub fn new(pricing: &'a RegionPricing) -> Self {
        Self {
            pricing,
            policy: CostPolicy::default(),
            arm_type_marker: ARM_TYPE_MARKER.to_string(),
        }
    }

    pub fn with_policy(mut self, policy: CostPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_arm_type_marker(mut self, marker: impl Into<String>) -> Self {
        self.arm_type_marker = marker.into();
        self
    }

    /// Normalize, classify and price a single workload
    ///
    /// A workload without a known node is treated as x86 on-demand.
    pub fn estimate_workload(&self, sample: &WorkloadSample, node: Option<&Node>) -> Workload {
        let total = sample.total_usage();
        let usage = normalize(total.cpu_milli, total.memory_mib, total.storage_mib);

        let requests_arm = node.is_some_and(|n| n.is_arm(&self.arm_type_marker));
        let spot = node.is_some_and(|n| n.spot);

        let compute_class = classify(&sample.name, &usage, requests_arm);
        let cost = price(&usage, self.pricing, compute_class, spot);

        debug!(
            workload = %sample.name,
            node = %sample.node_name,
            compute_class = %compute_class,
            cost = cost,
            "Estimated workload"
        );

        Workload {
            name: sample.name.clone(),
            namespace: sample.namespace.clone(),
            node_name: sample.node_name.clone(),
            containers: sample.containers.len(),
            usage,
            compute_class,
            cost,
        }
    }

    /// Estimate every sample and aggregate into a report
    pub fn estimate(&self, nodes: BTreeMap<String, Node>, samples: &[WorkloadSample]) -> CostReport {
        let workloads: Vec<Workload> = samples
            .iter()
            .map(|s| self.estimate_workload(s, nodes.get(&s.node_name)))
            .collect();

        aggregate(self.pricing.region(), nodes, workloads, &self.policy)
    }
}

/// Attach workloads to their nodes and compute cluster totals
pub fn aggregate(
    region: &str,
    mut nodes: BTreeMap<String, Node>,
    workloads: Vec<Workload>,
    policy: &CostPolicy,
) -> CostReport {
    let mut unassigned = Vec::new();

    for workload in workloads {
        match nodes.get_mut(&workload.node_name) {
            Some(node) => node.host(workload),
            None => {
                warn!(
                    event = "workload_node_unknown",
                    workload = %workload.name,
                    node = %workload.node_name,
                    "Workload runs on an unknown node, excluded from cluster totals"
                );
                unassigned.push(workload);
            }
        }
    }

    let summary = ClusterCostSummary::from_nodes(nodes.values(), policy);

    CostReport {
        region: region.to_string(),
        generated_at: Utc::now(),
        nodes,
        unassigned,
        summary,
    }
}
