//! Lower-limit normalization
//!
//! Autopilot bills at least a minimum request per pod, so measured usage
//! below the floor is raised to it before classification and pricing.

use serde::Serialize;

/// Minimum billable CPU request in millicores
pub const MIN_CPU_MILLI: u64 = 250;

/// Minimum billable memory request in MiB
pub const MIN_MEMORY_MIB: u64 = 500;

/// Minimum billable ephemeral storage request in MiB
pub const MIN_STORAGE_MIB: u64 = 10;

/// Usage clamped to the billing floor
///
/// Only [`normalize`] can build one, so every value reaching the
/// classifier has a non-zero CPU component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BillableUsage {
    #[serde(rename = "cpu")]
    cpu_milli: u64,
    #[serde(rename = "memory")]
    memory_mib: u64,
    #[serde(rename = "storage")]
    storage_mib: u64,
}

impl BillableUsage {
    pub fn cpu_milli(&self) -> u64 {
        self.cpu_milli
    }

    pub fn memory_mib(&self) -> u64 {
        self.memory_mib
    }

    pub fn storage_mib(&self) -> u64 {
        self.storage_mib
    }

    pub fn as_tuple(&self) -> (u64, u64, u64) {
        (self.cpu_milli, self.memory_mib, self.storage_mib)
    }
}

/// Raise each dimension to its platform minimum
pub fn normalize(cpu_milli: u64, memory_mib: u64, storage_mib: u64) -> BillableUsage {
    BillableUsage {
        cpu_milli: cpu_milli.max(MIN_CPU_MILLI),
        memory_mib: memory_mib.max(MIN_MEMORY_MIB),
        storage_mib: storage_mib.max(MIN_STORAGE_MIB),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_above_floor_pass_through() {
        assert_eq!(normalize(1000, 1000, 1000).as_tuple(), (1000, 1000, 1000));
    }

    #[test]
    fn test_values_below_floor_are_raised() {
        assert_eq!(normalize(249, 499, 9).as_tuple(), (250, 500, 10));
    }

    #[test]
    fn test_only_low_dimension_changes() {
        let usage = normalize(100, 2048, 50);
        assert_eq!(usage.cpu_milli(), MIN_CPU_MILLI);
        assert_eq!(usage.memory_mib(), 2048);
        assert_eq!(usage.storage_mib(), 50);
    }

    #[test]
    fn test_exact_floor_is_kept() {
        assert_eq!(normalize(250, 500, 10).as_tuple(), (250, 500, 10));
        assert_eq!(normalize(0, 0, 0).as_tuple(), (250, 500, 10));
    }
}
