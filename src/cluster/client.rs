//! `kube`-backed implementation of [`ClusterApi`].

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, PersistentVolumeClaim, Pod, Secret};
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{Api, ApiResource, AttachParams, DynamicObject, ListParams};
use kube::core::GroupVersionKind;
use kube::Client;
use tokio::io::AsyncReadExt;

use super::{ClusterApi, ClusterError, PodMetrics};

/// Cluster client configured from `KUBECONFIG`, `~/.kube/config` or the
/// in-cluster service account, in that order.
#[derive(Clone)]
pub struct KubeClient {
    client: Client,
    metrics: ApiResource,
}

impl KubeClient {
    pub async fn new() -> Result<Self, ClusterError> {
        let client = Client::try_default()
            .await
            .map_err(|e| ClusterError::Client(e.to_string()))?;
        Ok(Self::from_client(client))
    }

    pub fn from_client(client: Client) -> Self {
        let gvk = GroupVersionKind::gvk("metrics.k8s.io", "v1beta1", "PodMetrics");
        Self {
            client,
            metrics: ApiResource::from_gvk_with_plural(&gvk, "pods"),
        }
    }
}

fn api_error(kind: &'static str, name: &str, err: kube::Error) -> ClusterError {
    match err {
        kube::Error::Api(resp) if resp.code == 404 => ClusterError::NotFound {
            kind,
            name: name.to_string(),
        },
        other => ClusterError::Api(other.to_string()),
    }
}

#[async_trait]
impl ClusterApi for KubeClient {
    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<Pod>, ClusterError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pods = api
            .list(&ListParams::default().labels(selector))
            .await
            .map_err(|e| api_error("pods", selector, e))?;
        Ok(pods.items)
    }

    async fn pod_metrics(&self, namespace: &str, name: &str) -> Result<PodMetrics, ClusterError> {
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), namespace, &self.metrics);
        let obj = api
            .get(name)
            .await
            .map_err(|e| api_error("pod metrics", name, e))?;
        serde_json::from_value(obj.data)
            .map_err(|e| ClusterError::Decode(format!("pod metrics for {}: {}", name, e)))
    }

    async fn get_node(&self, name: &str) -> Result<Node, ClusterError> {
        let api: Api<Node> = Api::all(self.client.clone());
        api.get(name).await.map_err(|e| api_error("node", name, e))
    }

    async fn get_pvc(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<PersistentVolumeClaim, ClusterError> {
        let api: Api<PersistentVolumeClaim> = Api::namespaced(self.client.clone(), namespace);
        api.get(name).await.map_err(|e| api_error("pvc", name, e))
    }

    async fn exec(
        &self,
        namespace: &str,
        pod: &str,
        container: Option<&str>,
        command: &[&str],
    ) -> Result<String, ClusterError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let mut params = AttachParams::default().stdin(false).stdout(true).stderr(true);
        if let Some(container) = container {
            params = params.container(container);
        }

        let mut attached = api
            .exec(pod, command.iter().copied(), &params)
            .await
            .map_err(|e| ClusterError::Exec(e.to_string()))?;

        let mut stdout = attached
            .stdout()
            .ok_or_else(|| ClusterError::Exec("no stdout stream".to_string()))?;
        let stderr = attached.stderr();
        let status = attached.take_status();

        let mut out = String::new();
        let mut err_out = String::new();
        let read_stderr = async {
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut err_out).await;
            }
        };
        let (read, _) = tokio::join!(stdout.read_to_string(&mut out), read_stderr);
        read.map_err(|e| ClusterError::Exec(format!("reading stdout: {}", e)))?;

        if let Some(status) = status {
            if let Some(status) = status.await {
                if status.status.as_deref() == Some("Failure") {
                    let message = status
                        .message
                        .filter(|m| !m.is_empty())
                        .unwrap_or_else(|| err_out.trim().to_string());
                    return Err(ClusterError::Exec(message));
                }
            }
        }

        attached
            .join()
            .await
            .map_err(|e| ClusterError::Exec(e.to_string()))?;

        Ok(out)
    }

    async fn get_ingress(&self, namespace: &str, name: &str) -> Result<Ingress, ClusterError> {
        let api: Api<Ingress> = Api::namespaced(self.client.clone(), namespace);
        api.get(name).await.map_err(|e| api_error("ingress", name, e))
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, ClusterError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        api.get(name).await.map_err(|e| api_error("secret", name, e))
    }
}
