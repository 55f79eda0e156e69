//! Cost estimate command

use anyhow::{Context, Result};
use estimator_lib::sources::{collect_nodes, load_pricing};
use estimator_lib::{
    CatalogFile, ClusterContext, CostReport, Estimator, EstimatorMetrics, MetricsSource, Node,
    PriceCatalog, SnapshotSource, StructuredLogger,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::client::BillingClient;
use crate::cluster::KubeSource;
use crate::config::Settings;
use crate::output::{print_report, print_success, OutputFormat};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Inputs and outputs of one estimate run
pub struct EstimateOptions {
    pub kubeconfig: Option<PathBuf>,
    pub context: Option<String>,
    pub snapshot: Option<PathBuf>,
    pub catalog: Option<PathBuf>,
    pub region: Option<String>,
    pub format: OutputFormat,
    pub quiet: bool,
    pub json_file: Option<PathBuf>,
    pub metrics_file: Option<PathBuf>,
}

/// Collect usage and prices, estimate, and report
pub async fn run_estimate(options: &EstimateOptions, settings: &Settings) -> Result<()> {
    let started = Instant::now();

    let (source, cluster): (Box<dyn MetricsSource>, String) = match &options.snapshot {
        Some(path) => {
            let snapshot = SnapshotSource::load(path)
                .await
                .with_context(|| format!("Failed to load snapshot {}", path.display()))?;
            (Box::new(snapshot), path.display().to_string())
        }
        None => {
            let kube = KubeSource::connect(
                options.kubeconfig.as_deref(),
                options.context.as_deref(),
                settings.excluded_namespaces.clone(),
            )
            .await?;
            let context = kube.context().to_string();
            (Box::new(kube), context)
        }
    };

    let nodes = collect_nodes(source.as_ref())
        .await
        .context("Failed to list nodes")?;
    let samples = source
        .workloads()
        .await
        .context("Failed to collect workload usage")?;

    let region = resolve_region(options.region.as_deref(), &cluster, &nodes)?;
    let logger = StructuredLogger::new(&cluster);
    let source_kind = if options.snapshot.is_some() { "snapshot" } else { "cluster" };
    logger.log_run_started(VERSION, source_kind, &region);

    let catalog: Box<dyn PriceCatalog> = match &options.catalog {
        Some(path) => Box::new(
            CatalogFile::load(path)
                .await
                .with_context(|| format!("Failed to load price catalog {}", path.display()))?,
        ),
        None => Box::new(BillingClient::new(&settings.billing)?),
    };
    let pricing = load_pricing(catalog.as_ref(), &region)
        .await
        .context("Failed to load regional prices")?;
    logger.log_pricing_loaded(&pricing);

    let report = Estimator::new(&pricing)
        .with_policy(settings.policy())
        .with_arm_type_marker(settings.arm_type_marker.clone())
        .estimate(nodes, &samples);
    logger.log_report(&report);

    if let Some(path) = &options.metrics_file {
        let metrics = EstimatorMetrics::new()?;
        metrics.record_report(&report, &pricing);
        metrics.observe_run_duration(started.elapsed().as_secs_f64());
        std::fs::write(path, metrics.encode_text()?)
            .with_context(|| format!("Failed to write metrics to {}", path.display()))?;
        logger.log_output_written("metrics", &path.display().to_string());
    }

    if let Some(path) = &options.json_file {
        write_node_json(&report, path)?;
        logger.log_output_written("nodes", &path.display().to_string());
        if !options.quiet && options.format == OutputFormat::Table {
            print_success(&format!("Node costs written to {}", path.display()));
        }
    }

    if !options.quiet {
        match options.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            OutputFormat::Table => print_report(&report, &cluster),
        }
    }

    Ok(())
}

/// Pick the pricing region
///
/// An explicit region wins, then the region encoded in a GKE context
/// name, then the region label of the nodes.
fn resolve_region(
    explicit: Option<&str>,
    cluster: &str,
    nodes: &BTreeMap<String, Node>,
) -> Result<String> {
    if let Some(region) = explicit {
        return Ok(region.to_string());
    }
    if let Ok(context) = cluster.parse::<ClusterContext>() {
        return Ok(context.region());
    }
    nodes
        .values()
        .map(|n| n.region.as_str())
        .find(|r| !r.is_empty())
        .map(str::to_string)
        .with_context(|| {
            format!(
                "Could not determine the region of {}, pass --region",
                cluster
            )
        })
}

/// Write the node map, keyed by node name, as JSON
fn write_node_json(report: &CostReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&report.nodes)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write node costs to {}", path.display()))
}
