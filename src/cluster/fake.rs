//! In-memory [`ClusterApi`] for tests.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, PersistentVolumeClaim, Pod, Secret};
use k8s_openapi::api::networking::v1::Ingress;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{ClusterApi, ClusterError, PodMetrics};

#[derive(Default)]
pub struct FakeCluster {
    pub pods: Vec<Pod>,
    pub metrics: HashMap<String, PodMetrics>,
    pub nodes: HashMap<String, Node>,
    pub pvcs: HashMap<String, PersistentVolumeClaim>,
    pub ingresses: HashMap<String, Ingress>,
    pub secrets: HashMap<String, Secret>,
    pub exec_output: Option<String>,
    pub exec_calls: Mutex<Vec<(String, Vec<String>)>>,
}

fn not_found(kind: &'static str, name: &str) -> ClusterError {
    ClusterError::NotFound {
        kind,
        name: name.to_string(),
    }
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn list_pods(&self, _namespace: &str, selector: &str) -> Result<Vec<Pod>, ClusterError> {
        let (key, value) = selector.split_once('=').unwrap_or((selector, ""));
        Ok(self
            .pods
            .iter()
            .filter(|p| {
                p.metadata
                    .labels
                    .as_ref()
                    .and_then(|l| l.get(key))
                    .map(|v| v == value)
                    .unwrap_or(false)
            })
            .cloned()
            .collect())
    }

    async fn pod_metrics(&self, _namespace: &str, name: &str) -> Result<PodMetrics, ClusterError> {
        self.metrics
            .get(name)
            .cloned()
            .ok_or_else(|| not_found("pod metrics", name))
    }

    async fn get_node(&self, name: &str) -> Result<Node, ClusterError> {
        self.nodes.get(name).cloned().ok_or_else(|| not_found("node", name))
    }

    async fn get_pvc(
        &self,
        _namespace: &str,
        name: &str,
    ) -> Result<PersistentVolumeClaim, ClusterError> {
        self.pvcs.get(name).cloned().ok_or_else(|| not_found("pvc", name))
    }

    async fn exec(
        &self,
        _namespace: &str,
        pod: &str,
        _container: Option<&str>,
        command: &[&str],
    ) -> Result<String, ClusterError> {
        self.exec_calls
            .lock()
            .unwrap()
            .push((pod.to_string(), command.iter().map(|s| s.to_string()).collect()));
        self.exec_output
            .clone()
            .ok_or_else(|| ClusterError::Exec("command terminated with exit code 1".into()))
    }

    async fn get_ingress(&self, _namespace: &str, name: &str) -> Result<Ingress, ClusterError> {
        self.ingresses
            .get(name)
            .cloned()
            .ok_or_else(|| not_found("ingress", name))
    }

    async fn get_secret(&self, _namespace: &str, name: &str) -> Result<Secret, ClusterError> {
        self.secrets
            .get(name)
            .cloned()
            .ok_or_else(|| not_found("secret", name))
    }
}
