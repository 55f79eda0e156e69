//! Autopilot cost estimator CLI
//!
//! Estimates what the workloads of a GKE Standard cluster would cost on
//! Autopilot, from live cluster metrics or a recorded snapshot.

mod client;
mod cluster;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use commands::estimate::{run_estimate, EstimateOptions};
use commands::snapshot::capture_snapshot;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Autopilot cost estimator
#[derive(Parser)]
#[command(name = "ap-estimate")]
#[command(author, version, about = "Estimate the cost of running a GKE cluster on Autopilot", long_about = None)]
pub struct Cli {
    /// Path to kubeconfig file (uses default if not specified)
    #[arg(long, env = "KUBECONFIG", global = true)]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context (uses the current context if not specified)
    #[arg(long, global = true)]
    pub context: Option<String>,

    /// Configuration file (defaults to ~/.config/ap-estimate/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Log line format on stderr
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Estimate hourly Autopilot cost of the cluster's workloads
    Estimate(EstimateArgs),

    /// Capture current workload usage into a snapshot file
    Snapshot {
        /// Output file path
        #[arg(long, short, default_value = "snapshot.json")]
        output: PathBuf,
    },
}

#[derive(Args)]
pub struct EstimateArgs {
    /// Read usage from a snapshot file instead of the cluster
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Read prices from a saved SKU list instead of the Cloud Billing API
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Pricing region (derived from the context name or node labels if not specified)
    #[arg(long)]
    pub region: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Suppress output on stdout
    #[arg(long, short)]
    pub quiet: bool,

    /// Write node costs as JSON to --json-file
    #[arg(long)]
    pub json: bool,

    /// Destination of the JSON node costs
    #[arg(long, default_value = "output.json")]
    pub json_file: PathBuf,

    /// Write Prometheus metrics of the run to this file
    #[arg(long)]
    pub metrics_file: Option<PathBuf>,
}

fn init_tracing(verbose: bool, format: LogFormat) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = config::Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Estimate(args) => {
            let options = EstimateOptions {
                kubeconfig: cli.kubeconfig,
                context: cli.context,
                snapshot: args.snapshot,
                catalog: args.catalog,
                region: args.region,
                format: args.format,
                quiet: args.quiet,
                json_file: args.json.then_some(args.json_file),
                metrics_file: args.metrics_file,
            };
            run_estimate(&options, &settings).await
        }
        Commands::Snapshot { output } => {
            capture_snapshot(
                cli.kubeconfig.as_deref(),
                cli.context.as_deref(),
                &output,
                &settings,
            )
            .await
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
