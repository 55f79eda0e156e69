//! CLI integration tests

use std::io::Write;
use std::process::{Command, Output};
use tempfile::NamedTempFile;

const SNAPSHOT: &str = r#"{
    "nodes": [
        {"name": "gk3-pool-1", "instance_type": "e2-standard-8", "region": "test-region-1", "spot": false},
        {"name": "gk3-spot-1", "instance_type": "e2-standard-8", "region": "test-region-1", "spot": true}
    ],
    "workloads": [
        {"name": "api", "namespace": "shop", "node_name": "gk3-pool-1",
         "containers": [{"cpu": "4", "memory": "16G", "ephemeral_storage": "10G"}]},
        {"name": "batch", "namespace": "shop", "node_name": "gk3-spot-1",
         "containers": [{"cpu": "25", "memory": "100G", "ephemeral_storage": "10G"}]}
    ]
}"#;

fn sku(description: &str, nanos: u64) -> String {
    format!(
        r#"{{"description": "{} (test-region-1)", "serviceRegions": ["test-region-1"],
            "pricingInfo": [{{"pricingExpression": {{"usageUnit": "h", "displayQuantity": 1,
            "tieredRates": [{{"startUsageAmount": 0, "unitPrice": {{"currencyCode": "USD", "units": "0", "nanos": {}}}}}]}}}}]}}"#,
        description, nanos
    )
}

fn catalog() -> String {
    let skus = [
        sku("Autopilot Pod Ephemeral Storage Requests", 70_600),
        sku("Autopilot Pod mCPU Requests", 57_300_000),
        sku("Autopilot Pod Memory Requests", 6_342_100),
        sku("Autopilot Spot Pod mCPU Requests", 17_200_000),
        sku("Autopilot Spot Pod Memory Requests", 1_902_600),
    ];
    format!(r#"{{"skus": [{}], "nextPageToken": ""}}"#, skus.join(","))
}

fn temp_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(contents.as_bytes())
        .expect("Failed to write temp file");
    file
}

fn run(args: &[&str]) -> Output {
    Command::new("cargo")
        .args(["run", "-q", "-p", "ap-estimate-cli", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = run(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("Autopilot"), "Should describe the tool");
    assert!(stdout.contains("estimate"), "Should show estimate command");
    assert!(stdout.contains("snapshot"), "Should show snapshot command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = run(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("ap-estimate"), "Should show binary name");
}

/// Test estimate subcommand help
#[test]
fn test_estimate_help() {
    let output = run(&["estimate", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Estimate help should succeed");
    for flag in ["--snapshot", "--catalog", "--region", "--quiet", "--json-file", "--metrics-file"] {
        assert!(stdout.contains(flag), "Should show {} option", flag);
    }
}

/// Test an offline estimate with JSON output
#[test]
fn test_estimate_from_snapshot_json() {
    let snapshot = temp_file(SNAPSHOT);
    let catalog = temp_file(&catalog());

    let output = run(&[
        "estimate",
        "--snapshot",
        snapshot.path().to_str().unwrap(),
        "--catalog",
        catalog.path().to_str().unwrap(),
        "--format",
        "json",
    ]);
    assert!(
        output.status.success(),
        "Estimate should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Output should be JSON");
    assert_eq!(report["region"], "test-region-1");

    let api = &report["nodes"]["gk3-pool-1"]["workloads"][0];
    assert_eq!(api["compute_class"], "regular");
    assert_eq!(api["cpu"], 4000);
    assert_eq!(api["memory"], 16000);

    let summary = &report["summary"];
    let total = summary["total_hourly"].as_f64().unwrap();
    let spot = summary["spot_hourly"].as_f64().unwrap();
    assert!((total - (0.1 + 0.3313796 + 0.620966)).abs() < 1e-9);
    assert!((spot - 0.620966).abs() < 1e-9);
}

/// Test node JSON file and metrics file outputs
#[test]
fn test_estimate_writes_files_quietly() {
    let snapshot = temp_file(SNAPSHOT);
    let catalog = temp_file(&catalog());
    let dir = tempfile::tempdir().unwrap();
    let json_file = dir.path().join("nodes.json");
    let metrics_file = dir.path().join("estimate.prom");

    let output = run(&[
        "estimate",
        "--snapshot",
        snapshot.path().to_str().unwrap(),
        "--catalog",
        catalog.path().to_str().unwrap(),
        "--quiet",
        "--json",
        "--json-file",
        json_file.to_str().unwrap(),
        "--metrics-file",
        metrics_file.to_str().unwrap(),
    ]);

    assert!(output.status.success(), "Estimate should succeed");
    assert!(output.stdout.is_empty(), "Quiet mode should print nothing");

    let nodes: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_file).unwrap()).unwrap();
    assert!(nodes["gk3-spot-1"]["spot"].as_bool().unwrap());

    let metrics = std::fs::read_to_string(&metrics_file).unwrap();
    assert!(metrics.contains("ap_estimate_nodes 2"));
}

/// Test table output
#[test]
fn test_estimate_table_output() {
    let snapshot = temp_file(SNAPSHOT);
    let catalog = temp_file(&catalog());

    let output = run(&[
        "estimate",
        "--snapshot",
        snapshot.path().to_str().unwrap(),
        "--catalog",
        catalog.path().to_str().unwrap(),
        "--region",
        "test-region-1",
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Estimate should succeed");
    assert!(stdout.contains("gk3-pool-1"));
    assert!(stdout.contains("Compute Class"));
    assert!(stdout.contains("1-Year Commit:"));
}

/// Test missing snapshot file
#[test]
fn test_missing_snapshot_fails() {
    let output = run(&["estimate", "--snapshot", "/nonexistent/snapshot.json"]);
    assert!(!output.status.success(), "Missing snapshot should fail");
}

/// Test invalid command
#[test]
fn test_invalid_command() {
    let output = run(&["invalid-command"]);
    assert!(!output.status.success(), "Invalid command should fail");
}
