//! Kubernetes API collaborator.
//!
//! Probes talk to the cluster only through [`ClusterApi`], so they can be
//! exercised against an in-memory fake.

mod client;
mod quantity;

#[cfg(test)]
pub mod fake;

pub use client::*;
pub use quantity::*;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, PersistentVolumeClaim, Pod, Secret};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Cluster API error types.
#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("{kind} {name} not found")]
    NotFound { kind: &'static str, name: String },
    #[error("kubernetes API error: {0}")]
    Api(String),
    #[error("exec failed: {0}")]
    Exec(String),
    #[error("failed to decode {0}")]
    Decode(String),
    #[error("failed to build cluster client: {0}")]
    Client(String),
}

/// Current usage of one pod, from `metrics.k8s.io`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PodMetrics {
    #[serde(default)]
    pub containers: Vec<ContainerMetrics>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContainerMetrics {
    pub name: String,
    #[serde(default)]
    pub usage: BTreeMap<String, Quantity>,
}

/// The cluster operations the probe set needs.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<Pod>, ClusterError>;
    async fn pod_metrics(&self, namespace: &str, name: &str) -> Result<PodMetrics, ClusterError>;
    async fn get_node(&self, name: &str) -> Result<Node, ClusterError>;
    async fn get_pvc(&self, namespace: &str, name: &str)
        -> Result<PersistentVolumeClaim, ClusterError>;

    /// Run `command` inside a container and capture its stdout.
    async fn exec(
        &self,
        namespace: &str,
        pod: &str,
        container: Option<&str>,
        command: &[&str],
    ) -> Result<String, ClusterError>;

    async fn get_ingress(&self, namespace: &str, name: &str) -> Result<Ingress, ClusterError>;
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, ClusterError>;
}
