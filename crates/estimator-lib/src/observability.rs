//! Observability for estimation runs
//!
//! Provides:
//! - Prometheus metrics describing a finished report, in a run-local registry
//! - Structured run events with tracing

use prometheus::{
    Encoder, GaugeVec, Histogram, HistogramOpts, IntGauge, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use tracing::{info, warn};

use crate::error::Result;
use crate::estimate::CostReport;
use crate::pricing::RegionPricing;

/// Histogram buckets for run durations (in seconds)
const DURATION_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Metrics of one estimation run
///
/// Each instance owns its registry so runs never collide on names.
#[derive(Clone)]
pub struct EstimatorMetrics {
    registry: Registry,
    workloads: IntGaugeVec,
    unpriced_workloads: IntGauge,
    unassigned_workloads: IntGauge,
    nodes: IntGauge,
    cluster_cost: GaugeVec,
    run_duration_seconds: Histogram,
}

impl EstimatorMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let workloads = IntGaugeVec::new(
            Opts::new(
                "ap_estimate_workloads",
                "Workloads estimated, by compute class and billing mode",
            ),
            &["compute_class", "spot"],
        )?;
        let unpriced_workloads = IntGauge::new(
            "ap_estimate_unpriced_workloads",
            "Workloads whose compute class has no unit price in the region",
        )?;
        let unassigned_workloads = IntGauge::new(
            "ap_estimate_unassigned_workloads",
            "Workloads running on a node missing from the node list",
        )?;
        let nodes = IntGauge::new("ap_estimate_nodes", "Nodes in the estimated cluster")?;
        let cluster_cost = GaugeVec::new(
            Opts::new(
                "ap_estimate_cluster_cost_hourly",
                "Estimated cluster cost per hour by commitment term",
            ),
            &["term"],
        )?;
        let run_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "ap_estimate_run_duration_seconds",
                "Time spent collecting inputs and estimating costs",
            )
            .buckets(DURATION_BUCKETS.to_vec()),
        )?;

        registry.register(Box::new(workloads.clone()))?;
        registry.register(Box::new(unpriced_workloads.clone()))?;
        registry.register(Box::new(unassigned_workloads.clone()))?;
        registry.register(Box::new(nodes.clone()))?;
        registry.register(Box::new(cluster_cost.clone()))?;
        registry.register(Box::new(run_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            workloads,
            unpriced_workloads,
            unassigned_workloads,
            nodes,
            cluster_cost,
            run_duration_seconds,
        })
    }

    /// Update every gauge from a finished report
    pub fn record_report(&self, report: &CostReport, pricing: &RegionPricing) {
        self.workloads.reset();
        let mut unpriced = 0;

        let hosted = report
            .nodes
            .values()
            .flat_map(|n| n.workloads.iter().map(move |w| (w, n.spot)));
        let orphaned = report.unassigned.iter().map(|w| (w, false));

        for (workload, spot) in hosted.chain(orphaned) {
            let spot_label = if spot { "true" } else { "false" };
            self.workloads
                .with_label_values(&[workload.compute_class.as_str(), spot_label])
                .inc();
            if pricing.is_unpriced(workload.compute_class, spot) {
                unpriced += 1;
            }
        }

        self.unpriced_workloads.set(unpriced);
        self.unassigned_workloads.set(report.unassigned.len() as i64);
        self.nodes.set(report.nodes.len() as i64);

        let summary = &report.summary;
        for (term, value) in [
            ("on_demand", summary.on_demand_hourly),
            ("spot", summary.spot_hourly),
            ("total", summary.total_hourly),
            ("one_year", summary.one_year_hourly),
            ("three_year", summary.three_year_hourly),
        ] {
            self.cluster_cost.with_label_values(&[term]).set(value);
        }
    }

    pub fn observe_run_duration(&self, duration_secs: f64) {
        self.run_duration_seconds.observe(duration_secs);
    }

    pub fn unpriced_workloads(&self) -> i64 {
        self.unpriced_workloads.get()
    }

    /// Render the registry in Prometheus text exposition format
    pub fn encode_text(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Structured logger for run-level events
#[derive(Clone)]
pub struct StructuredLogger {
    cluster: String,
}

impl StructuredLogger {
    pub fn new(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
        }
    }

    /// Log the start of an estimation run
    pub fn log_run_started(&self, version: &str, source: &str, region: &str) {
        info!(
            event = "estimate_started",
            cluster = %self.cluster,
            version = %version,
            source = %source,
            region = %region,
            "Starting cost estimate"
        );
    }

    /// Log the price table built for the region
    pub fn log_pricing_loaded(&self, pricing: &RegionPricing) {
        if pricing.priced_keys() == 0 {
            warn!(
                event = "pricing_loaded",
                cluster = %self.cluster,
                region = %pricing.region(),
                priced_keys = 0,
                "No Autopilot prices found for region, every cost will be understated"
            );
        } else {
            info!(
                event = "pricing_loaded",
                cluster = %self.cluster,
                region = %pricing.region(),
                priced_keys = pricing.priced_keys(),
                storage_priced = pricing.storage() > 0.0,
                "Loaded regional prices"
            );
        }
    }

    /// Log the totals of a finished report
    pub fn log_report(&self, report: &CostReport) {
        info!(
            event = "estimate_completed",
            cluster = %self.cluster,
            region = %report.region,
            nodes = report.nodes.len(),
            workloads = report.workload_count(),
            unassigned = report.unassigned.len(),
            total_hourly = report.summary.total_hourly,
            one_year_hourly = report.summary.one_year_hourly,
            three_year_hourly = report.summary.three_year_hourly,
            "Cost estimate completed"
        );
    }

    /// Log a report or metrics file written to disk
    pub fn log_output_written(&self, kind: &str, path: &str) {
        info!(
            event = "output_written",
            cluster = %self.cluster,
            kind = %kind,
            path = %path,
            "Wrote output file"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimate::Estimator;
    use crate::models::{ContainerUsage, Node, WorkloadSample};
    use crate::pricing::tests::fixture_pricing;
    use std::collections::BTreeMap;

    fn report(pricing: &RegionPricing) -> CostReport {
        let nodes: BTreeMap<String, Node> = [
            Node::new("x86", "e2-standard-4", "test-region-1", false),
            Node::new("arm", "t2a-standard-4", "test-region-1", true),
        ]
        .into_iter()
        .map(|n| (n.name.clone(), n))
        .collect();

        let sample = |name: &str, node: &str| WorkloadSample {
            name: name.to_string(),
            namespace: "default".to_string(),
            node_name: node.to_string(),
            containers: vec![ContainerUsage {
                cpu_milli: 1000,
                memory_mib: 4000,
                storage_mib: 100,
            }],
        };

        Estimator::new(pricing).estimate(
            nodes,
            &[sample("a", "x86"), sample("b", "arm"), sample("c", "missing")],
        )
    }

    #[test]
    fn test_record_report() {
        let pricing = fixture_pricing();
        let metrics = EstimatorMetrics::new().unwrap();
        metrics.record_report(&report(&pricing), &pricing);
        metrics.observe_run_duration(0.2);

        // the Arm workload has no price in the fixture region
        assert_eq!(metrics.unpriced_workloads(), 1);

        let text = metrics.encode_text().unwrap();
        assert!(text.contains("ap_estimate_nodes 2"));
        assert!(text.contains("ap_estimate_unassigned_workloads 1"));
        assert!(text.contains(r#"ap_estimate_workloads{compute_class="Regular",spot="false"} 2"#));
        assert!(text.contains(r#"ap_estimate_workloads{compute_class="Scale-Out Arm",spot="true"} 1"#));
        assert!(text.contains(r#"ap_estimate_cluster_cost_hourly{term="total"}"#));
        assert!(text.contains("ap_estimate_run_duration_seconds_count 1"));
    }

    #[test]
    fn test_registries_are_independent() {
        let first = EstimatorMetrics::new().unwrap();
        let second = EstimatorMetrics::new().unwrap();
        first.nodes.set(3);
        assert_eq!(second.nodes.get(), 0);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("gke_p_us-central1_prod");
        assert_eq!(logger.cluster, "gke_p_us-central1_prod");
        logger.log_pricing_loaded(&fixture_pricing());
    }
}
