//! Cluster resource probes: pod status, container usage, PVC usage and node placement.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, Pod};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use super::{Probe, ProbeContext, ProbeError};
use crate::cluster::{bytes, cpu_millicores, ClusterApi, ClusterError};
use crate::metric::{
    ActiveNodesValue, ConfigFamily, Configuration, CpuUsageValue, MemoryUsageValue, MetricValue,
    NodeCondition, NodeDetail, PodConfig, PodDetail, PodStatusValue, PvcUsageValue,
};

/// Run a cluster call under the probe deadline.
async fn within<T, F>(ctx: &ProbeContext, fut: F) -> Result<T, ProbeError>
where
    F: Future<Output = Result<T, ClusterError>>,
{
    tokio::time::timeout(ctx.remaining(), fut)
        .await
        .map_err(|_| ProbeError::Timeout(ctx.timeout))?
        .map_err(ProbeError::from)
}

fn pod_config(config: &Configuration) -> Result<&PodConfig, ProbeError> {
    match config {
        Configuration::Pod(c) => Ok(c),
        other => Err(ProbeError::wrong_family(ConfigFamily::Pod, other)),
    }
}

fn pod_name(pod: &Pod) -> String {
    pod.metadata.name.clone().unwrap_or_default()
}

fn pod_phase(pod: &Pod) -> &str {
    pod.status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .unwrap_or("Unknown")
}

fn node_name(pod: &Pod) -> Option<&str> {
    pod.spec
        .as_ref()
        .and_then(|s| s.node_name.as_deref())
        .filter(|n| !n.is_empty())
}

/// Aggregate readiness and restarts over every matching pod.
///
/// `container` picks which container status counts for each pod; the first
/// one is used when it is empty.
pub fn summarize_pods(pods: &[Pod], container: &str) -> PodStatusValue {
    if pods.is_empty() {
        return PodStatusValue {
            pod_phase: "NotFound".to_string(),
            ..Default::default()
        };
    }

    let mut summary = PodStatusValue {
        total_pods: pods.len(),
        ..Default::default()
    };
    let mut has_failed = false;
    let mut has_pending = false;

    for pod in pods {
        let phase = pod_phase(pod);
        match phase {
            "Failed" => has_failed = true,
            "Pending" => has_pending = true,
            _ => {}
        }

        let statuses = pod
            .status
            .as_ref()
            .and_then(|s| s.container_statuses.as_deref())
            .unwrap_or_default();
        let status = if container.is_empty() {
            statuses.first()
        } else {
            statuses.iter().find(|s| s.name == container)
        };

        let (ready, restarts) = status.map(|s| (s.ready, s.restart_count)).unwrap_or((false, 0));
        if ready {
            summary.ready_pods += 1;
        }
        summary.restart_count += restarts;

        summary.pods.push(PodDetail {
            name: pod_name(pod),
            phase: phase.to_string(),
            ready,
            restart_count: restarts,
            node_name: node_name(pod).unwrap_or_default().to_string(),
            ip: pod
                .status
                .as_ref()
                .and_then(|s| s.pod_ip.clone())
                .unwrap_or_default(),
        });
    }

    let (phase, ready) = if has_failed {
        ("Degraded", false)
    } else if summary.ready_pods < summary.total_pods {
        ("Running", false)
    } else if has_pending {
        ("Pending", false)
    } else {
        ("Running", true)
    };
    summary.pod_phase = phase.to_string();
    summary.pod_ready = ready;
    summary
}

pub struct PodStatusProbe {
    cluster: Arc<dyn ClusterApi>,
}

impl PodStatusProbe {
    pub fn new(cluster: Arc<dyn ClusterApi>) -> Self {
        Self { cluster }
    }
}

#[async_trait]
impl Probe for PodStatusProbe {
    async fn run(
        &self,
        ctx: &ProbeContext,
        config: &Configuration,
    ) -> Result<MetricValue, ProbeError> {
        let cfg = pod_config(config)?;
        let pods = within(
            ctx,
            self.cluster
                .list_pods(&ctx.application.namespace, cfg.pod_label_selector()),
        )
        .await?;
        Ok(summarize_pods(&pods, cfg.container_name()).into())
    }
}

/// Usage and limit of one resource for the first matching pod's container.
///
/// The limit comes from the spec container at the same position as the
/// matched metrics container.
async fn container_usage(
    cluster: &dyn ClusterApi,
    ctx: &ProbeContext,
    cfg: &PodConfig,
    resource: &str,
    convert: fn(&k8s_openapi::apimachinery::pkg::api::resource::Quantity) -> Option<i64>,
) -> Result<(i64, i64), ProbeError> {
    let namespace = &ctx.application.namespace;
    let pods = within(ctx, cluster.list_pods(namespace, cfg.pod_label_selector())).await?;
    let Some(pod) = pods.first() else {
        return Ok((0, 0));
    };

    let metrics = within(ctx, cluster.pod_metrics(namespace, &pod_name(pod))).await?;
    let spec_containers = pod.spec.as_ref().map(|s| s.containers.as_slice()).unwrap_or_default();

    for (i, container) in metrics.containers.iter().enumerate() {
        if !cfg.container_name().is_empty() && container.name != cfg.container_name() {
            continue;
        }
        let usage = container.usage.get(resource).and_then(convert).unwrap_or(0);
        let limit = spec_containers
            .get(i)
            .and_then(|c| c.resources.as_ref())
            .and_then(|r| r.limits.as_ref())
            .and_then(|l| l.get(resource))
            .and_then(convert)
            .unwrap_or(0);
        return Ok((usage, limit));
    }

    Ok((0, 0))
}

fn percent_of(used: i64, limit: i64) -> f64 {
    if limit > 0 {
        used as f64 / limit as f64 * 100.0
    } else {
        0.0
    }
}

pub struct MemoryUsageProbe {
    cluster: Arc<dyn ClusterApi>,
}

impl MemoryUsageProbe {
    pub fn new(cluster: Arc<dyn ClusterApi>) -> Self {
        Self { cluster }
    }
}

#[async_trait]
impl Probe for MemoryUsageProbe {
    async fn run(
        &self,
        ctx: &ProbeContext,
        config: &Configuration,
    ) -> Result<MetricValue, ProbeError> {
        let cfg = pod_config(config)?;
        let (usage, limit) = container_usage(self.cluster.as_ref(), ctx, cfg, "memory", bytes).await?;
        Ok(MemoryUsageValue {
            memory_usage_bytes: usage,
            memory_limit_bytes: limit,
            memory_percent: percent_of(usage, limit),
        }
        .into())
    }
}

pub struct CpuUsageProbe {
    cluster: Arc<dyn ClusterApi>,
}

impl CpuUsageProbe {
    pub fn new(cluster: Arc<dyn ClusterApi>) -> Self {
        Self { cluster }
    }
}

#[async_trait]
impl Probe for CpuUsageProbe {
    async fn run(
        &self,
        ctx: &ProbeContext,
        config: &Configuration,
    ) -> Result<MetricValue, ProbeError> {
        let cfg = pod_config(config)?;
        let (usage, limit) =
            container_usage(self.cluster.as_ref(), ctx, cfg, "cpu", cpu_millicores).await?;
        Ok(CpuUsageValue {
            cpu_usage_millicores: usage,
            cpu_limit_millicores: limit,
            cpu_percent: percent_of(usage, limit),
        }
        .into())
    }
}

/// Parse `df -B1` output into (used, available) bytes.
pub fn parse_df_output(output: &str) -> Result<(i64, i64), ProbeError> {
    let lines: Vec<&str> = output.trim().lines().collect();
    if lines.len() < 2 {
        return Err(ProbeError::Command(format!(
            "invalid df output: expected at least 2 lines, got {}",
            lines.len()
        )));
    }

    let fields: Vec<&str> = lines[1].split_whitespace().collect();
    if fields.len() < 4 {
        return Err(ProbeError::Command(format!(
            "invalid df output: expected at least 4 fields, got {}",
            fields.len()
        )));
    }

    let used = fields[2]
        .parse()
        .map_err(|e| ProbeError::Command(format!("failed to parse used bytes: {}", e)))?;
    let available = fields[3]
        .parse()
        .map_err(|e| ProbeError::Command(format!("failed to parse available bytes: {}", e)))?;
    Ok((used, available))
}

/// Find where `claim` is mounted by walking pod volumes to container mounts.
pub fn discover_mount_path(pods: &[Pod], claim: &str) -> Option<String> {
    for spec in pods.iter().filter_map(|p| p.spec.as_ref()) {
        let volumes = spec.volumes.as_deref().unwrap_or_default();
        for volume in volumes {
            let uses_claim = volume
                .persistent_volume_claim
                .as_ref()
                .map(|p| p.claim_name == claim)
                .unwrap_or(false);
            if !uses_claim {
                continue;
            }
            for container in &spec.containers {
                let mounts = container.volume_mounts.as_deref().unwrap_or_default();
                if let Some(mount) = mounts.iter().find(|m| m.name == volume.name) {
                    return Some(mount.mount_path.clone());
                }
            }
        }
    }
    None
}

pub struct PvcUsageProbe {
    cluster: Arc<dyn ClusterApi>,
}

impl PvcUsageProbe {
    pub fn new(cluster: Arc<dyn ClusterApi>) -> Self {
        Self { cluster }
    }
}

#[async_trait]
impl Probe for PvcUsageProbe {
    async fn run(
        &self,
        ctx: &ProbeContext,
        config: &Configuration,
    ) -> Result<MetricValue, ProbeError> {
        let Configuration::Pvc(cfg) = config else {
            return Err(ProbeError::wrong_family(ConfigFamily::Pvc, config));
        };
        let namespace = &ctx.application.namespace;

        let pvc = within(ctx, self.cluster.get_pvc(namespace, cfg.pvc_name())).await?;
        let capacity = pvc
            .status
            .as_ref()
            .and_then(|s| s.capacity.as_ref())
            .and_then(|c| c.get("storage"))
            .and_then(bytes)
            .unwrap_or(0);

        let pods = within(ctx, self.cluster.list_pods(namespace, cfg.pod_label_selector())).await?;
        if pods.is_empty() {
            return Err(ProbeError::Failed(format!(
                "no pods found with label selector: {}",
                cfg.pod_label_selector()
            )));
        }

        let mount_path = if cfg.pvc_mount_path().is_empty() {
            discover_mount_path(&pods, cfg.pvc_name()).ok_or_else(|| {
                ProbeError::Failed(format!(
                    "could not find mount path for PVC {} in pods with selector {}",
                    cfg.pvc_name(), cfg.pod_label_selector()
                ))
            })?
        } else {
            cfg.pvc_mount_path().to_string()
        };

        let pod = pods
            .iter()
            .find(|p| pod_phase(p) == "Running")
            .ok_or_else(|| ProbeError::Failed("no running pods found".to_string()))?;

        let container = if cfg.container_name().is_empty() {
            pod.spec
                .as_ref()
                .and_then(|s| s.containers.first())
                .map(|c| c.name.clone())
        } else {
            Some(cfg.container_name().to_string())
        };

        let output = within(
            ctx,
            self.cluster.exec(
                namespace,
                &pod_name(pod),
                container.as_deref(),
                &["df", "-B1", mount_path.as_str()],
            ),
        )
        .await?;
        let (used, available) = parse_df_output(&output)?;

        Ok(PvcUsageValue {
            pvc_capacity_bytes: capacity,
            pvc_used_bytes: used,
            pvc_available_bytes: available,
            pvc_percent: percent_of(used, capacity),
            pvc_mount_path: mount_path,
        }
        .into())
    }
}

/// Readiness summary for one node.
pub fn describe_node(name: &str, node: &Node, pod_count: usize) -> NodeDetail {
    let raw = node
        .status
        .as_ref()
        .and_then(|s| s.conditions.as_deref())
        .unwrap_or_default();

    let mut ready = false;
    let mut status = "Unknown".to_string();
    for condition in raw.iter().filter(|c| c.type_ == "Ready") {
        match condition.status.as_str() {
            "True" => {
                ready = true;
                status = "Ready".to_string();
            }
            "False" => status = "NotReady".to_string(),
            _ => status = "Unknown".to_string(),
        }
    }

    if ready {
        if let Some(pressure) = raw.iter().find(|c| c.type_ != "Ready" && c.status == "True") {
            status = format!("Ready (with {})", pressure.type_);
        }
    }

    NodeDetail {
        name: name.to_string(),
        ready,
        status,
        conditions: raw
            .iter()
            .map(|c| NodeCondition {
                kind: c.type_.clone(),
                status: c.status.clone(),
                reason: c.reason.clone().unwrap_or_default(),
                message: c.message.clone().unwrap_or_default(),
            })
            .collect(),
        labels: node.metadata.labels.clone().unwrap_or_default(),
        pod_count,
    }
}

pub struct ActiveNodesProbe {
    cluster: Arc<dyn ClusterApi>,
}

impl ActiveNodesProbe {
    pub fn new(cluster: Arc<dyn ClusterApi>) -> Self {
        Self { cluster }
    }
}

#[async_trait]
impl Probe for ActiveNodesProbe {
    async fn run(
        &self,
        ctx: &ProbeContext,
        config: &Configuration,
    ) -> Result<MetricValue, ProbeError> {
        let cfg = pod_config(config)?;
        let pods = within(
            ctx,
            self.cluster
                .list_pods(&ctx.application.namespace, cfg.pod_label_selector()),
        )
        .await?;

        let mut pods_per_node: BTreeMap<String, usize> = BTreeMap::new();
        for name in pods.iter().filter_map(node_name) {
            *pods_per_node.entry(name.to_string()).or_default() += 1;
        }

        let mut nodes = Vec::with_capacity(pods_per_node.len());
        for (name, count) in &pods_per_node {
            match within(ctx, self.cluster.get_node(name)).await {
                Ok(node) => nodes.push(describe_node(name, &node, *count)),
                Err(ProbeError::Timeout(t)) => return Err(ProbeError::Timeout(t)),
                Err(e) => {
                    tracing::debug!("Node lookup failed for {}: {}", name, e);
                    nodes.push(NodeDetail {
                        name: name.clone(),
                        status: "Unknown".to_string(),
                        pod_count: *count,
                        ..Default::default()
                    });
                }
            }
        }

        Ok(ActiveNodesValue {
            active_nodes_count: pods_per_node.len(),
            node_names: pods_per_node.into_keys().collect(),
            nodes,
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::fake::FakeCluster;
    use crate::cluster::{ContainerMetrics, PodMetrics};
    use crate::metric::ProbeType;
    use crate::probe::tests::app;
    use crate::probe::ProbeSettings;
    use k8s_openapi::api::core::v1::{
        Container, ContainerStatus, NodeCondition as K8sNodeCondition, NodeStatus,
        PersistentVolumeClaim, PersistentVolumeClaimStatus, PersistentVolumeClaimVolumeSource,
        PodSpec, PodStatus, ResourceRequirements, Volume, VolumeMount,
    };
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn pod(name: &str, phase: &str, ready: bool, restarts: i32, node: &str) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                labels: Some(BTreeMap::from([("app".to_string(), "web".to_string())])),
                ..Default::default()
            },
            spec: Some(PodSpec {
                node_name: Some(node.to_string()),
                containers: vec![Container {
                    name: "web".to_string(),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            status: Some(PodStatus {
                phase: Some(phase.to_string()),
                pod_ip: Some("10.0.0.7".to_string()),
                container_statuses: Some(vec![ContainerStatus {
                    name: "web".to_string(),
                    ready,
                    restart_count: restarts,
                    ..Default::default()
                }]),
                ..Default::default()
            }),
        }
    }

    fn ctx_for(probe_type: ProbeType, raw: &str) -> (ProbeContext, Configuration) {
        let config = Configuration::parse(probe_type, raw).unwrap();
        (ProbeContext::new(app(), &config, ProbeSettings::default()), config)
    }

    #[test]
    fn test_summarize_all_ready() {
        let pods = vec![
            pod("web-1", "Running", true, 1, "n1"),
            pod("web-2", "Running", true, 2, "n2"),
        ];
        let s = summarize_pods(&pods, "");
        assert_eq!(s.pod_phase, "Running");
        assert!(s.pod_ready);
        assert_eq!(s.restart_count, 3);
        assert_eq!(s.ready_pods, 2);
        assert_eq!(s.pods[1].node_name, "n2");
    }

    #[test]
    fn test_summarize_phase_precedence() {
        let degraded = summarize_pods(
            &[pod("a", "Failed", false, 0, "n1"), pod("b", "Pending", false, 0, "n1")],
            "",
        );
        assert_eq!(degraded.pod_phase, "Degraded");

        let not_ready = summarize_pods(
            &[pod("a", "Running", true, 0, "n1"), pod("b", "Running", false, 0, "n1")],
            "",
        );
        assert_eq!(not_ready.pod_phase, "Running");
        assert!(!not_ready.pod_ready);

        let pending = summarize_pods(&[pod("a", "Pending", true, 0, "n1")], "");
        assert_eq!(pending.pod_phase, "Pending");

        assert_eq!(summarize_pods(&[], "").pod_phase, "NotFound");
    }

    #[test]
    fn test_summarize_named_container() {
        let s = summarize_pods(&[pod("a", "Running", true, 4, "n1")], "sidecar");
        assert_eq!(s.ready_pods, 0);
        assert_eq!(s.restart_count, 0);
    }

    #[test]
    fn test_parse_df_output() {
        let out = "Filesystem 1B-blocks Used Available Use% Mounted\n/dev/sda1 10737418240 5368709120 5368709120 50% /data";
        assert_eq!(parse_df_output(out).unwrap(), (5368709120, 5368709120));

        assert!(parse_df_output("Filesystem 1B-blocks Used").is_err());
        assert!(parse_df_output("h\n/dev/sda1 10 x 5").is_err());
    }

    #[tokio::test]
    async fn test_memory_usage_against_limit() {
        let mut web = pod("web-1", "Running", true, 0, "n1");
        web.spec.as_mut().unwrap().containers[0].resources = Some(ResourceRequirements {
            limits: Some(BTreeMap::from([("memory".to_string(), Quantity("256Mi".into()))])),
            ..Default::default()
        });
        let cluster = FakeCluster {
            pods: vec![web],
            metrics: std::collections::HashMap::from([(
                "web-1".to_string(),
                PodMetrics {
                    containers: vec![ContainerMetrics {
                        name: "web".to_string(),
                        usage: BTreeMap::from([
                            ("memory".to_string(), Quantity("64Mi".into())),
                            ("cpu".to_string(), Quantity("120m".into())),
                        ]),
                    }],
                },
            )]),
            ..Default::default()
        };
        let cluster: Arc<dyn ClusterApi> = Arc::new(cluster);

        let (ctx, config) = ctx_for(ProbeType::PodMemoryUsage, r#"{"pod_label_selector":"app=web"}"#);
        match MemoryUsageProbe::new(cluster.clone()).run(&ctx, &config).await.unwrap() {
            MetricValue::MemoryUsage(v) => {
                assert_eq!(v.memory_usage_bytes, 64 * 1024 * 1024);
                assert_eq!(v.memory_limit_bytes, 256 * 1024 * 1024);
                assert_eq!(v.memory_percent, 25.0);
            }
            other => panic!("unexpected value: {:?}", other),
        }

        let (ctx, config) = ctx_for(ProbeType::PodCpuUsage, r#"{"pod_label_selector":"app=web"}"#);
        match CpuUsageProbe::new(cluster).run(&ctx, &config).await.unwrap() {
            MetricValue::CpuUsage(v) => {
                assert_eq!(v.cpu_usage_millicores, 120);
                assert_eq!(v.cpu_limit_millicores, 0);
                assert_eq!(v.cpu_percent, 0.0);
            }
            other => panic!("unexpected value: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_pvc_usage_discovers_mount_path() {
        let mut db = pod("db-0", "Running", true, 0, "n1");
        {
            let spec = db.spec.as_mut().unwrap();
            spec.volumes = Some(vec![Volume {
                name: "data".to_string(),
                persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                    claim_name: "db-data".to_string(),
                    ..Default::default()
                }),
                ..Default::default()
            }]);
            spec.containers[0].volume_mounts = Some(vec![VolumeMount {
                name: "data".to_string(),
                mount_path: "/var/lib/data".to_string(),
                ..Default::default()
            }]);
        }
        let pvc = PersistentVolumeClaim {
            status: Some(PersistentVolumeClaimStatus {
                capacity: Some(BTreeMap::from([("storage".to_string(), Quantity("10Gi".into()))])),
                ..Default::default()
            }),
            ..Default::default()
        };
        let cluster = Arc::new(FakeCluster {
            pods: vec![db],
            pvcs: std::collections::HashMap::from([("db-data".to_string(), pvc)]),
            exec_output: Some(
                "Filesystem 1B-blocks Used Available Use% Mounted\n/dev/sda1 10737418240 5368709120 5368709120 50% /var/lib/data\n"
                    .to_string(),
            ),
            ..Default::default()
        });

        let (ctx, config) = ctx_for(
            ProbeType::PvcUsage,
            r#"{"pod_label_selector":"app=web","pvc_name":"db-data"}"#,
        );
        let value = PvcUsageProbe::new(cluster.clone()).run(&ctx, &config).await.unwrap();
        match value {
            MetricValue::PvcUsage(v) => {
                assert_eq!(v.pvc_capacity_bytes, 10_737_418_240);
                assert_eq!(v.pvc_used_bytes, 5_368_709_120);
                assert_eq!(v.pvc_percent, 50.0);
                assert_eq!(v.pvc_mount_path, "/var/lib/data");
            }
            other => panic!("unexpected value: {:?}", other),
        }

        let calls = cluster.exec_calls.lock().unwrap();
        assert_eq!(calls[0].0, "db-0");
        assert_eq!(calls[0].1, vec!["df", "-B1", "/var/lib/data"]);
    }

    #[tokio::test]
    async fn test_pvc_usage_without_running_pod() {
        let cluster = Arc::new(FakeCluster {
            pods: vec![pod("db-0", "Pending", false, 0, "n1")],
            pvcs: std::collections::HashMap::from([(
                "db-data".to_string(),
                PersistentVolumeClaim::default(),
            )]),
            ..Default::default()
        });
        let (ctx, config) = ctx_for(
            ProbeType::PvcUsage,
            r#"{"pod_label_selector":"app=web","pvc_name":"db-data","pvc_mount_path":"/data"}"#,
        );
        let err = PvcUsageProbe::new(cluster).run(&ctx, &config).await.unwrap_err();
        assert_eq!(err.to_string(), "no running pods found");
    }

    #[tokio::test]
    async fn test_active_nodes() {
        let ready_node = Node {
            metadata: ObjectMeta {
                name: Some("n1".to_string()),
                ..Default::default()
            },
            status: Some(NodeStatus {
                conditions: Some(vec![
                    K8sNodeCondition {
                        type_: "Ready".to_string(),
                        status: "True".to_string(),
                        ..Default::default()
                    },
                    K8sNodeCondition {
                        type_: "DiskPressure".to_string(),
                        status: "True".to_string(),
                        ..Default::default()
                    },
                ]),
                ..Default::default()
            }),
            ..Default::default()
        };
        let cluster = Arc::new(FakeCluster {
            pods: vec![
                pod("web-1", "Running", true, 0, "n1"),
                pod("web-2", "Running", true, 0, "n1"),
                pod("web-3", "Running", true, 0, "n2"),
            ],
            nodes: std::collections::HashMap::from([("n1".to_string(), ready_node)]),
            ..Default::default()
        });

        let (ctx, config) = ctx_for(ProbeType::PodActiveNodes, r#"{"pod_label_selector":"app=web"}"#);
        match ActiveNodesProbe::new(cluster).run(&ctx, &config).await.unwrap() {
            MetricValue::ActiveNodes(v) => {
                assert_eq!(v.active_nodes_count, 2);
                assert_eq!(v.node_names, vec!["n1", "n2"]);
                assert_eq!(v.nodes[0].status, "Ready (with DiskPressure)");
                assert_eq!(v.nodes[0].pod_count, 2);
                assert!(v.nodes[0].ready);
                assert_eq!(v.nodes[1].status, "Unknown");
                assert_eq!(v.nodes[1].pod_count, 1);
            }
            other => panic!("unexpected value: {:?}", other),
        }
    }
}
