//! Probe result records.
//!
//! Each probe family produces its own struct. [`MetricValue`] wraps them and
//! serializes to the flat JSON object stored in history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ProbeType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    #[default]
    Down,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthCheckValue {
    pub status: HealthStatus,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PodDetail {
    pub name: String,
    pub phase: String,
    pub ready: bool,
    pub restart_count: i32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub node_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ip: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PodStatusValue {
    pub pod_phase: String,
    pub pod_ready: bool,
    pub restart_count: i32,
    pub total_pods: usize,
    pub ready_pods: usize,
    pub pods: Vec<PodDetail>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryUsageValue {
    pub memory_usage_bytes: i64,
    pub memory_limit_bytes: i64,
    pub memory_percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuUsageValue {
    pub cpu_usage_millicores: i64,
    pub cpu_limit_millicores: i64,
    pub cpu_percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PvcUsageValue {
    pub pvc_capacity_bytes: i64,
    pub pvc_used_bytes: i64,
    pub pvc_available_bytes: i64,
    pub pvc_percent: f64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pvc_mount_path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeCondition {
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub reason: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeDetail {
    pub name: String,
    pub ready: bool,
    pub status: String,
    pub conditions: Vec<NodeCondition>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    pub pod_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActiveNodesValue {
    pub active_nodes_count: usize,
    pub node_names: Vec<String>,
    pub nodes: Vec<NodeDetail>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected,
    #[default]
    Failed,
    Timeout,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Failed => "failed",
            ConnectionStatus::Timeout => "timeout",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionValue {
    pub connection_status: ConnectionStatus,
    pub connection_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_ping_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_info: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateStatus {
    Valid,
    ExpiringSoon,
    Expired,
    NotFound,
    #[default]
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificateValue {
    pub certificate_status: CertificateStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_expiration: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_days_to_expire: Option<i64>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub certificate_issuer: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub certificate_subject: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub certificate_domains: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LagStatus {
    Ok,
    Warning,
    Critical,
    #[default]
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionLag {
    pub partition: i32,
    pub current_offset: i64,
    pub log_end_offset: i64,
    pub lag: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicLag {
    pub topic: String,
    pub total_lag: i64,
    pub partition_lags: Vec<PartitionLag>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupLag {
    pub group: String,
    pub total_lag: i64,
    pub topic_lags: Vec<TopicLag>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KafkaLagValue {
    pub kafka_lag_status: LagStatus,
    pub kafka_total_lag: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub kafka_consumer_group: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub kafka_topic: String,
    pub kafka_lag_threshold: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub kafka_group_lags: Vec<GroupLag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kafka_error: Option<String>,
}

/// A single probe result, as written to history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    HealthCheck(HealthCheckValue),
    PodStatus(PodStatusValue),
    MemoryUsage(MemoryUsageValue),
    CpuUsage(CpuUsageValue),
    PvcUsage(PvcUsageValue),
    ActiveNodes(ActiveNodesValue),
    Connection(ConnectionValue),
    Certificate(CertificateValue),
    KafkaLag(KafkaLagValue),
}

impl MetricValue {
    /// Decode a stored JSON snapshot using the producing probe type.
    ///
    /// The flat JSON shape carries no tag, so the caller supplies it.
    pub fn decode(probe_type: ProbeType, raw: &str) -> Result<Self, serde_json::Error> {
        Ok(match probe_type {
            ProbeType::HealthCheck => MetricValue::HealthCheck(serde_json::from_str(raw)?),
            ProbeType::PodStatus => MetricValue::PodStatus(serde_json::from_str(raw)?),
            ProbeType::PodMemoryUsage => MetricValue::MemoryUsage(serde_json::from_str(raw)?),
            ProbeType::PodCpuUsage => MetricValue::CpuUsage(serde_json::from_str(raw)?),
            ProbeType::PvcUsage => MetricValue::PvcUsage(serde_json::from_str(raw)?),
            ProbeType::PodActiveNodes => MetricValue::ActiveNodes(serde_json::from_str(raw)?),
            ProbeType::RedisConnection
            | ProbeType::PostgreSQLConnection
            | ProbeType::MySQLConnection
            | ProbeType::MongoDBConnection
            | ProbeType::KongConnection => MetricValue::Connection(serde_json::from_str(raw)?),
            ProbeType::IngressCertificate => MetricValue::Certificate(serde_json::from_str(raw)?),
            ProbeType::KafkaConsumerLag => MetricValue::KafkaLag(serde_json::from_str(raw)?),
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

macro_rules! impl_from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for MetricValue {
                fn from(v: $ty) -> Self {
                    MetricValue::$variant(v)
                }
            }
        )*
    };
}

impl_from_value! {
    HealthCheckValue => HealthCheck,
    PodStatusValue => PodStatus,
    MemoryUsageValue => MemoryUsage,
    CpuUsageValue => CpuUsage,
    PvcUsageValue => PvcUsage,
    ActiveNodesValue => ActiveNodes,
    ConnectionValue => Connection,
    CertificateValue => Certificate,
    KafkaLagValue => KafkaLag,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_shape() {
        let value = MetricValue::from(ConnectionValue {
            connection_status: ConnectionStatus::Timeout,
            connection_time_ms: 5001,
            connection_error: Some("deadline exceeded".into()),
            ..Default::default()
        });
        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            json!({
                "connection_status": "timeout",
                "connection_time_ms": 5001,
                "connection_error": "deadline exceeded"
            })
        );
    }

    #[test]
    fn test_decode_by_probe_type() {
        let raw = r#"{"status":"down","response_time_ms":12,"status_code":503}"#;
        match MetricValue::decode(ProbeType::HealthCheck, raw).unwrap() {
            MetricValue::HealthCheck(h) => {
                assert_eq!(h.status, HealthStatus::Down);
                assert_eq!(h.status_code, Some(503));
                assert_eq!(h.error_message, None);
            }
            other => panic!("unexpected value: {:?}", other),
        }
    }

    #[test]
    fn test_certificate_status_names() {
        let value = CertificateValue {
            certificate_status: CertificateStatus::ExpiringSoon,
            certificate_days_to_expire: Some(12),
            ..Default::default()
        };
        let encoded = serde_json::to_value(&value).unwrap();
        assert_eq!(encoded["certificate_status"], "expiring_soon");
        assert_eq!(encoded["certificate_days_to_expire"], 12);
    }

    #[test]
    fn test_node_condition_type_field() {
        let node = NodeDetail {
            name: "worker-1".into(),
            ready: true,
            status: "Ready".into(),
            conditions: vec![NodeCondition {
                kind: "Ready".into(),
                status: "True".into(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let encoded = serde_json::to_value(&node).unwrap();
        assert_eq!(encoded["conditions"][0]["type"], "Ready");
        assert!(encoded.get("labels").is_none());
    }
}
