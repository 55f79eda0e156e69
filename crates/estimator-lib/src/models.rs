//! Core data models for the estimator

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::limits::BillableUsage;

/// Autopilot billing class a workload lands in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComputeClass {
    Regular,
    Balanced,
    ScaleOut,
    ScaleOutArm,
}

impl ComputeClass {
    pub const ALL: [ComputeClass; 4] = [
        ComputeClass::Regular,
        ComputeClass::Balanced,
        ComputeClass::ScaleOut,
        ComputeClass::ScaleOutArm,
    ];

    /// Display name used in tables and SKU descriptions
    pub fn as_str(&self) -> &'static str {
        match self {
            ComputeClass::Regular => "Regular",
            ComputeClass::Balanced => "Balanced",
            ComputeClass::ScaleOut => "Scale-Out",
            ComputeClass::ScaleOutArm => "Scale-Out Arm",
        }
    }
}

impl fmt::Display for ComputeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Usage of a single container, already converted to billing units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerUsage {
    pub cpu_milli: u64,
    pub memory_mib: u64,
    pub storage_mib: u64,
}

/// Raw per-workload record handed over by a metrics source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadSample {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    pub node_name: String,
    pub containers: Vec<ContainerUsage>,
}

impl WorkloadSample {
    /// Sum usage over every container of the workload, saturating at `u64::MAX`
    pub fn total_usage(&self) -> ContainerUsage {
        self.containers
            .iter()
            .fold(ContainerUsage::default(), |acc, c| ContainerUsage {
                cpu_milli: acc.cpu_milli.saturating_add(c.cpu_milli),
                memory_mib: acc.memory_mib.saturating_add(c.memory_mib),
                storage_mib: acc.storage_mib.saturating_add(c.storage_mib),
            })
    }
}

/// A workload after classification and pricing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Workload {
    pub name: String,
    pub namespace: String,
    pub node_name: String,
    pub containers: usize,
    #[serde(flatten)]
    pub usage: BillableUsage,
    pub compute_class: ComputeClass,
    /// Estimated cost in currency per hour
    pub cost: f64,
}

/// Cluster node and the workloads it hosts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub instance_type: String,
    pub region: String,
    #[serde(default)]
    pub spot: bool,
    #[serde(default, skip_deserializing)]
    pub workloads: Vec<Workload>,
    /// Sum of hosted workload costs per hour
    #[serde(default, skip_deserializing)]
    pub cost: f64,
}

impl Node {
    pub fn new(
        name: impl Into<String>,
        instance_type: impl Into<String>,
        region: impl Into<String>,
        spot: bool,
    ) -> Self {
        Self {
            name: name.into(),
            instance_type: instance_type.into(),
            region: region.into(),
            spot,
            workloads: Vec::new(),
            cost: 0.0,
        }
    }

    /// Whether the node runs on an Arm machine family
    pub fn is_arm(&self, arm_type_marker: &str) -> bool {
        !arm_type_marker.is_empty() && self.instance_type.contains(arm_type_marker)
    }

    /// Append an estimated workload and add its cost to the running total
    pub fn host(&mut self, workload: Workload) {
        self.cost += workload.cost;
        self.workloads.push(workload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_usage_sums_containers() {
        let sample = WorkloadSample {
            name: "web-0".to_string(),
            namespace: "default".to_string(),
            node_name: "node-a".to_string(),
            containers: vec![
                ContainerUsage { cpu_milli: 100, memory_mib: 200, storage_mib: 1 },
                ContainerUsage { cpu_milli: 50, memory_mib: 64, storage_mib: 4 },
            ],
        };

        let total = sample.total_usage();
        assert_eq!(total.cpu_milli, 150);
        assert_eq!(total.memory_mib, 264);
        assert_eq!(total.storage_mib, 5);
    }

    #[test]
    fn test_total_usage_saturates() {
        let big = ContainerUsage { cpu_milli: u64::MAX - 1, memory_mib: 10, storage_mib: 0 };
        let sample = WorkloadSample {
            name: "huge".to_string(),
            namespace: "default".to_string(),
            node_name: "node-a".to_string(),
            containers: vec![big, big],
        };

        let total = sample.total_usage();
        assert_eq!(total.cpu_milli, u64::MAX);
        assert_eq!(total.memory_mib, 20);
    }

    #[test]
    fn test_arm_detection_uses_marker() {
        let arm = Node::new("n1", "t2a-standard-4", "us-central1", false);
        let x86 = Node::new("n2", "e2-standard-4", "us-central1", false);

        assert!(arm.is_arm("t2a-"));
        assert!(!x86.is_arm("t2a-"));
        assert!(!arm.is_arm(""));
    }

    #[test]
    fn test_node_deserialize_ignores_computed_fields() {
        let node: Node = serde_json::from_str(
            r#"{"name":"n1","instance_type":"e2-medium","region":"europe-west1","cost":9.5}"#,
        )
        .unwrap();

        assert!(!node.spot);
        assert!(node.workloads.is_empty());
        assert_eq!(node.cost, 0.0);
    }

    #[test]
    fn test_compute_class_names() {
        assert_eq!(ComputeClass::ScaleOutArm.to_string(), "Scale-Out Arm");
        assert_eq!(
            serde_json::to_string(&ComputeClass::ScaleOut).unwrap(),
            "\"scale-out\""
        );
    }
}
