//! Compute-class selection
//!
//! Picks the Autopilot compute class a workload would be scheduled on from
//! its memory-to-CPU ratio and absolute size. Rules are evaluated in order
//! and the first match wins; anything unmatched falls back to Regular.

use tracing::warn;

use crate::limits::BillableUsage;
use crate::models::ComputeClass;

/// Largest mCPU the general-purpose class accepts
pub const REGULAR_MAX_CPU_MILLI: u64 = 30_000;
/// Largest memory (MiB) the general-purpose class accepts
pub const REGULAR_MAX_MEMORY_MIB: u64 = 110_000;
/// Memory-to-CPU ratio bounds for the general-purpose class
pub const REGULAR_RATIO_RANGE: (f64, f64) = (1.0, 6.5);

pub const SCALE_OUT_RATIO: f64 = 4.0;
pub const SCALE_OUT_MAX_CPU_MILLI: u64 = 54_000;
pub const SCALE_OUT_MAX_MEMORY_MIB: u64 = 216_000;

pub const SCALE_OUT_ARM_MAX_CPU_MILLI: u64 = 43_000;
pub const SCALE_OUT_ARM_MAX_MEMORY_MIB: u64 = 172_000;

pub const BALANCED_RATIO_RANGE: (f64, f64) = (1.0, 8.0);

/// Memory-to-CPU ratio (MiB per mCPU), rounded up
pub fn memory_cpu_ratio(usage: &BillableUsage) -> f64 {
    (usage.memory_mib() as f64 / usage.cpu_milli() as f64).ceil()
}

/// Decide the compute class for a normalized workload
///
/// `requests_arm` forces Scale-Out Arm; usage outside the Arm envelope is
/// reported but does not change the result.
pub fn classify(workload: &str, usage: &BillableUsage, requests_arm: bool) -> ComputeClass {
    let cpu = usage.cpu_milli();
    let memory = usage.memory_mib();
    let ratio = memory_cpu_ratio(usage);

    if requests_arm {
        if ratio != SCALE_OUT_RATIO
            || cpu > SCALE_OUT_ARM_MAX_CPU_MILLI
            || memory > SCALE_OUT_ARM_MAX_MEMORY_MIB
        {
            warn!(
                event = "arm_envelope_exceeded",
                workload = %workload,
                cpu_milli = cpu,
                memory_mib = memory,
                ratio = ratio,
                "Workload requests arm64 but its mCPU, memory or ratio is outside the accepted range"
            );
        }
        return ComputeClass::ScaleOutArm;
    }

    let exceeds_regular = cpu > REGULAR_MAX_CPU_MILLI || memory > REGULAR_MAX_MEMORY_MIB;

    if in_range(ratio, REGULAR_RATIO_RANGE) && !exceeds_regular {
        return ComputeClass::Regular;
    }

    if ratio == SCALE_OUT_RATIO
        && cpu <= SCALE_OUT_MAX_CPU_MILLI
        && memory <= SCALE_OUT_MAX_MEMORY_MIB
    {
        return ComputeClass::ScaleOut;
    }

    if in_range(ratio, BALANCED_RATIO_RANGE) && exceeds_regular {
        return ComputeClass::Balanced;
    }

    warn!(
        event = "compute_class_unmatched",
        workload = %workload,
        cpu_milli = cpu,
        memory_mib = memory,
        ratio = ratio,
        "No matching compute class, defaulting to Regular; please check manually"
    );

    ComputeClass::Regular
}

fn in_range(value: f64, (low, high): (f64, f64)) -> bool {
    value >= low && value <= high
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::normalize;
    use crate::test_logs::capture_warnings;

    fn class_of(cpu: u64, memory: u64, arm: bool) -> ComputeClass {
        classify("test-pod", &normalize(cpu, memory, 10), arm)
    }

    #[test]
    fn test_small_workload_is_regular() {
        assert_eq!(class_of(10_000, 10_000, false), ComputeClass::Regular);
    }

    #[test]
    fn test_cpu_above_regular_limit_is_balanced() {
        assert_eq!(class_of(35_000, 100_000, false), ComputeClass::Balanced);
    }

    #[test]
    fn test_arm_flag_forces_scale_out_arm() {
        // ratio 4 inside the envelope
        assert_eq!(class_of(20_000, 80_000, true), ComputeClass::ScaleOutArm);
        // ratio 1, outside the envelope: still Arm
        assert_eq!(class_of(1_000, 1_000, true), ComputeClass::ScaleOutArm);
        assert_eq!(class_of(60_000, 240_000, true), ComputeClass::ScaleOutArm);
    }

    #[test]
    fn test_ratio_four_beyond_regular_is_scale_out() {
        // 40 vCPU with 4 MiB per mCPU exceeds Regular but fits Scale-Out
        assert_eq!(class_of(40_000, 160_000, false), ComputeClass::ScaleOut);
        assert_eq!(class_of(54_000, 216_000, false), ComputeClass::ScaleOut);
    }

    #[test]
    fn test_ratio_four_beyond_scale_out_is_balanced() {
        assert_eq!(class_of(55_000, 220_000, false), ComputeClass::Balanced);
    }

    #[test]
    fn test_memory_above_regular_limit_is_balanced() {
        // ratio 6, memory above 110000 MiB
        assert_eq!(class_of(20_000, 120_000, false), ComputeClass::Balanced);
    }

    #[test]
    fn test_regular_boundaries_are_inclusive() {
        assert_eq!(class_of(30_000, 110_000, false), ComputeClass::Regular);
        assert_eq!(class_of(10_000, 60_000, false), ComputeClass::Regular);
        assert_eq!(class_of(30_001, 60_000, false), ComputeClass::Balanced);
    }

    #[test]
    fn test_unmatched_falls_back_to_regular() {
        // ratio 10 matches nothing
        assert_eq!(class_of(1_000, 10_000, false), ComputeClass::Regular);
        // ceil(3250 / 500) = 7 is past Regular's ratio bound but not Balanced-sized
        assert_eq!(class_of(500, 3_250, false), ComputeClass::Regular);
        // ratio 9 on a large workload is past Balanced's bound too
        assert_eq!(class_of(31_000, 270_000, false), ComputeClass::Regular);
    }

    #[test]
    fn test_arm_outside_envelope_warns() {
        let (class, logs) = capture_warnings(|| class_of(60_000, 240_000, true));
        assert_eq!(class, ComputeClass::ScaleOutArm);
        assert!(logs.contains("event=\"arm_envelope_exceeded\""), "{}", logs);

        let (_, logs) = capture_warnings(|| class_of(1_000, 1_000, true));
        assert!(logs.contains("arm_envelope_exceeded"), "{}", logs);
    }

    #[test]
    fn test_arm_inside_envelope_is_silent() {
        let (class, logs) = capture_warnings(|| class_of(20_000, 80_000, true));
        assert_eq!(class, ComputeClass::ScaleOutArm);
        assert!(logs.is_empty(), "{}", logs);
    }

    #[test]
    fn test_unmatched_class_warns() {
        let (class, logs) = capture_warnings(|| class_of(1_000, 10_000, false));
        assert_eq!(class, ComputeClass::Regular);
        assert!(logs.contains("event=\"compute_class_unmatched\""), "{}", logs);
        assert!(logs.contains("test-pod"), "{}", logs);

        let (_, logs) = capture_warnings(|| class_of(4_000, 16_000, false));
        assert!(logs.is_empty(), "{}", logs);
    }

    #[test]
    fn test_ratio_rounds_up() {
        assert_eq!(memory_cpu_ratio(&normalize(1_000, 4_001, 10)), 5.0);
        assert_eq!(memory_cpu_ratio(&normalize(1_000, 4_000, 10)), 4.0);
        // memory floor of 500 against 1000 mCPU rounds up to 1
        assert_eq!(memory_cpu_ratio(&normalize(1_000, 0, 10)), 1.0);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let usage = normalize(12_345, 67_890, 100);
        let first = classify("a", &usage, false);
        for _ in 0..10 {
            assert_eq!(classify("a", &usage, false), first);
        }
    }
}
