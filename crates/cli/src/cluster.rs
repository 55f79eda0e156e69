//! Live cluster discovery through the Kubernetes API
//!
//! Nodes come from the core API, per-container usage from
//! `metrics.k8s.io/v1beta1` PodMetrics, and each pod's node from its spec.

use anyhow::{Context, Result};
use async_trait::async_trait;
use estimator_lib::sources::{SnapshotContainer, SnapshotDocument, SnapshotWorkload};
use estimator_lib::{EstimatorError, MetricsSource, Node, WorkloadSample};
use k8s_openapi::api::core::v1::{Node as KubeNode, Pod};
use kube::api::{Api, ApiResource, DynamicObject, GroupVersionKind, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, ResourceExt};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, warn};

const INSTANCE_TYPE_LABEL: &str = "node.kubernetes.io/instance-type";
const REGION_LABEL: &str = "topology.kubernetes.io/region";
const SPOT_LABELS: [&str; 2] = ["cloud.google.com/gke-spot", "cloud.google.com/gke-preemptible"];

/// Container entry of a PodMetrics object
#[derive(Debug, Deserialize)]
struct ContainerMetrics {
    name: String,
    #[serde(default)]
    usage: BTreeMap<String, String>,
}

/// Metrics source reading the cluster selected by a kubeconfig context
pub struct KubeSource {
    client: Client,
    context: String,
    excluded_namespaces: Vec<String>,
}

impl KubeSource {
    /// Connect using `context`, or the kubeconfig's current context
    pub async fn connect(
        kubeconfig: Option<&Path>,
        context: Option<&str>,
        excluded_namespaces: Vec<String>,
    ) -> Result<Self> {
        let kubeconfig = match kubeconfig {
            Some(path) => Kubeconfig::read_from(path)
                .with_context(|| format!("Failed to read kubeconfig {}", path.display()))?,
            None => Kubeconfig::read().context("Failed to read kubeconfig")?,
        };

        let context = context
            .map(str::to_string)
            .or_else(|| kubeconfig.current_context.clone())
            .context("Kubeconfig has no current context, pass --context")?;

        let options = KubeConfigOptions {
            context: Some(context.clone()),
            ..KubeConfigOptions::default()
        };
        let config = kube::Config::from_custom_kubeconfig(kubeconfig, &options)
            .await
            .with_context(|| format!("Failed to load kubeconfig context {}", context))?;
        let client = Client::try_from(config).context("Failed to create Kubernetes client")?;

        Ok(Self {
            client,
            context,
            excluded_namespaces,
        })
    }

    /// Name of the kubeconfig context in use
    pub fn context(&self) -> &str {
        &self.context
    }

    async fn list_nodes(&self) -> Result<Vec<Node>> {
        let api: Api<KubeNode> = Api::all(self.client.clone());
        let nodes = api
            .list(&ListParams::default())
            .await
            .context("Failed to list nodes")?;

        Ok(nodes.into_iter().map(|node| convert_node(&node)).collect())
    }

    /// Pod name to node name, keyed by `namespace/name`
    async fn pod_nodes(&self) -> Result<HashMap<String, String>> {
        let api: Api<Pod> = Api::all(self.client.clone());
        let pods = api
            .list(&ListParams::default())
            .await
            .context("Failed to list pods")?;

        Ok(pods
            .into_iter()
            .filter_map(|pod| {
                let key = format!("{}/{}", pod.namespace().unwrap_or_default(), pod.name_any());
                let node = pod.spec.and_then(|spec| spec.node_name)?;
                Some((key, node))
            })
            .collect())
    }

    /// Per-container usage of every scheduled pod outside excluded namespaces
    async fn pod_workloads(&self) -> Result<Vec<SnapshotWorkload>> {
        let gvk = GroupVersionKind::gvk("metrics.k8s.io", "v1beta1", "PodMetrics");
        let resource = ApiResource::from_gvk_with_plural(&gvk, "pods");
        let api: Api<DynamicObject> = Api::all_with(self.client.clone(), &resource);

        let metrics = api
            .list(&ListParams::default())
            .await
            .context("Failed to list pod metrics, is metrics-server running?")?;
        let pod_nodes = self.pod_nodes().await?;

        Ok(convert_pod_metrics(metrics, &pod_nodes, &self.excluded_namespaces))
    }

    /// Read current usage as a snapshot document
    pub async fn capture(&self) -> Result<SnapshotDocument> {
        Ok(SnapshotDocument {
            nodes: self.list_nodes().await?,
            workloads: self.pod_workloads().await?,
        })
    }
}

fn convert_pod_metrics(
    metrics: impl IntoIterator<Item = DynamicObject>,
    pod_nodes: &HashMap<String, String>,
    excluded_namespaces: &[String],
) -> Vec<SnapshotWorkload> {
    let mut workloads = Vec::new();
    for pod in metrics {
        let namespace = pod.namespace().unwrap_or_default();
        if excluded_namespaces.iter().any(|ns| *ns == namespace) {
            continue;
        }
        let name = pod.name_any();
        let key = format!("{}/{}", namespace, name);

        let Some(node_name) = pod_nodes.get(&key).cloned() else {
            warn!(
                event = "pod_node_unknown",
                pod = %key,
                "Pod has metrics but no scheduled node, skipping"
            );
            continue;
        };

        let containers: Vec<ContainerMetrics> =
            serde_json::from_value(pod.data.get("containers").cloned().unwrap_or_default())
                .unwrap_or_else(|e| {
                    warn!(pod = %key, error = %e, "Malformed pod metrics containers");
                    Vec::new()
                });

        debug!(pod = %key, node = %node_name, containers = containers.len(), "Discovered pod");

        workloads.push(SnapshotWorkload {
            name,
            namespace,
            node_name,
            containers: containers.into_iter().map(convert_container).collect(),
        });
    }
    workloads
}

fn convert_node(node: &KubeNode) -> Node {
    let labels = node.labels();
    let label = |key: &str| labels.get(key).cloned().unwrap_or_default();
    let spot = SPOT_LABELS
        .iter()
        .any(|key| labels.get(*key).is_some_and(|v| v == "true"));

    Node::new(node.name_any(), label(INSTANCE_TYPE_LABEL), label(REGION_LABEL), spot)
}

fn convert_container(container: ContainerMetrics) -> SnapshotContainer {
    let usage = |key: &str| container.usage.get(key).cloned();
    SnapshotContainer {
        cpu: usage("cpu").unwrap_or_else(|| "0".to_string()),
        memory: usage("memory").unwrap_or_else(|| "0".to_string()),
        ephemeral_storage: usage("ephemeral-storage"),
        name: Some(container.name),
    }
}

fn source_error(err: anyhow::Error) -> EstimatorError {
    EstimatorError::Source(format!("{:#}", err))
}

#[async_trait]
impl MetricsSource for KubeSource {
    async fn nodes(&self) -> estimator_lib::Result<Vec<Node>> {
        self.list_nodes().await.map_err(source_error)
    }

    async fn workloads(&self) -> estimator_lib::Result<Vec<WorkloadSample>> {
        let workloads = self.pod_workloads().await.map_err(source_error)?;
        workloads.iter().map(SnapshotWorkload::to_sample).collect()
    }
}
