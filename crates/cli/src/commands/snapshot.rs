//! Usage snapshot command

use anyhow::{Context, Result};
use std::path::Path;

use crate::cluster::KubeSource;
use crate::config::Settings;
use crate::output::print_success;

/// Capture current cluster usage into a snapshot file
pub async fn capture_snapshot(
    kubeconfig: Option<&Path>,
    context: Option<&str>,
    output: &Path,
    settings: &Settings,
) -> Result<()> {
    let kube = KubeSource::connect(kubeconfig, context, settings.excluded_namespaces.clone()).await?;
    let document = kube.capture().await?;

    let json = serde_json::to_string_pretty(&document)?;
    std::fs::write(output, json)
        .with_context(|| format!("Failed to write snapshot to {}", output.display()))?;

    print_success(&format!(
        "Captured {} nodes and {} workloads from {} into {}",
        document.nodes.len(),
        document.workloads.len(),
        kube.context(),
        output.display()
    ));
    Ok(())
}
