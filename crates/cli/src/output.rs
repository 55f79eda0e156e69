//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use estimator_lib::{CostReport, Node, Workload};
use tabled::{builder::Builder, settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Row of the node table
#[derive(Tabled)]
struct NodeRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    instance_type: String,
    #[tabled(rename = "Region")]
    region: String,
    #[tabled(rename = "Spot")]
    spot: bool,
}

impl From<&Node> for NodeRow {
    fn from(node: &Node) -> Self {
        Self {
            name: node.name.clone(),
            instance_type: node.instance_type.clone(),
            region: node.region.clone(),
            spot: node.spot,
        }
    }
}

const WORKLOAD_HEADER: [&str; 9] = [
    "Node",
    "Workload",
    "Containers",
    "Spot",
    "mCPU",
    "Memory MiB",
    "Storage MiB",
    "Compute Class",
    "Price $/H",
];

fn workload_record(workload: &Workload, node: &str, spot: bool) -> Vec<String> {
    vec![
        node.to_string(),
        workload.name.clone(),
        workload.containers.to_string(),
        spot.to_string(),
        workload.usage.cpu_milli().to_string(),
        workload.usage.memory_mib().to_string(),
        workload.usage.storage_mib().to_string(),
        workload.compute_class.to_string(),
        format_workload_price(workload.cost),
    ]
}

fn total_record(label: &str, amount: f64) -> Vec<String> {
    let mut record = vec![String::new(); WORKLOAD_HEADER.len() - 2];
    record.push(label.to_string());
    record.push(format_price(amount));
    record
}

/// Render the node table
pub fn node_table(report: &CostReport) -> String {
    let rows: Vec<NodeRow> = report.nodes.values().map(NodeRow::from).collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Render the workload table followed by the cluster totals
pub fn workload_table(report: &CostReport) -> String {
    let mut builder = Builder::default();
    builder.push_record(WORKLOAD_HEADER);

    for node in report.nodes.values() {
        for workload in &node.workloads {
            builder.push_record(workload_record(workload, &node.name, node.spot));
        }
    }
    for workload in &report.unassigned {
        let node = format!("{} (unknown)", workload.node_name);
        builder.push_record(workload_record(workload, &node, false));
    }

    let summary = &report.summary;
    builder.push_record(total_record("Total Price:", summary.total_hourly));
    builder.push_record(total_record("1-Year Commit:", summary.one_year_hourly));
    builder.push_record(total_record("3-Year Commit:", summary.three_year_hourly));

    builder.build().with(Style::rounded()).to_string()
}

/// Print the full human-readable report
pub fn print_report(report: &CostReport, cluster: &str) {
    println!("{}", "Autopilot Cost Estimate".bold());
    println!("{}", "=".repeat(50));
    println!("Cluster:                {}", cluster.cyan());
    println!("Region:                 {}", report.region.cyan());
    println!(
        "Generated:              {}",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!();

    if report.nodes.is_empty() {
        print_warning("No nodes found");
    } else {
        println!("{}", "Nodes".bold());
        println!("{}", node_table(report));
        println!();
    }

    println!("{}", "Workloads".bold());
    println!("{}", workload_table(report));

    if !report.unassigned.is_empty() {
        print_warning(&format!(
            "{} workload(s) run on unknown nodes and are not counted in the totals",
            report.unassigned.len()
        ));
    }

    println!();
    println!(
        "{} {}/h, {} with a 1-year commitment, {} with a 3-year commitment",
        "Estimated cost:".bold(),
        format_price(report.summary.total_hourly).green(),
        format_price(report.summary.one_year_hourly).green(),
        format_price(report.summary.three_year_hourly).green()
    );
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Format an hourly amount in dollars
pub fn format_price(amount: f64) -> String {
    format!("${:.4}", amount)
}

const WORKLOAD_PRICE_DIGITS: i32 = 7;

/// Format a per-workload hourly amount with seven significant digits
pub fn format_workload_price(amount: f64) -> String {
    if amount == 0.0 || !amount.is_finite() {
        return format!("${}", amount);
    }

    let magnitude = amount.abs().log10().floor() as i32;
    let decimals = (WORKLOAD_PRICE_DIGITS - 1 - magnitude).max(0) as usize;
    let digits = format!("{:.*}", decimals, amount);
    let digits = if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.')
    } else {
        digits.as_str()
    };
    format!("${}", digits)
}
