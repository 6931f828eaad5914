//! Metric types, their configuration payloads and their result records.

mod configuration;
mod value;

pub use configuration::*;
pub use value::*;

use std::fmt;
use std::str::FromStr;

/// The fixed catalog of probe types a target can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeType {
    HealthCheck,
    PodStatus,
    PodMemoryUsage,
    PodCpuUsage,
    PvcUsage,
    PodActiveNodes,
    RedisConnection,
    PostgreSQLConnection,
    MySQLConnection,
    MongoDBConnection,
    KongConnection,
    IngressCertificate,
    KafkaConsumerLag,
}

impl ProbeType {
    pub const ALL: [ProbeType; 13] = [
        ProbeType::HealthCheck,
        ProbeType::PodStatus,
        ProbeType::PodMemoryUsage,
        ProbeType::PodCpuUsage,
        ProbeType::PvcUsage,
        ProbeType::PodActiveNodes,
        ProbeType::RedisConnection,
        ProbeType::PostgreSQLConnection,
        ProbeType::MySQLConnection,
        ProbeType::MongoDBConnection,
        ProbeType::KongConnection,
        ProbeType::IngressCertificate,
        ProbeType::KafkaConsumerLag,
    ];

    /// Catalog name, as stored in the `metric_types` table.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeType::HealthCheck => "HealthCheck",
            ProbeType::PodStatus => "PodStatus",
            ProbeType::PodMemoryUsage => "PodMemoryUsage",
            ProbeType::PodCpuUsage => "PodCpuUsage",
            ProbeType::PvcUsage => "PvcUsage",
            ProbeType::PodActiveNodes => "PodActiveNodes",
            ProbeType::RedisConnection => "RedisConnection",
            ProbeType::PostgreSQLConnection => "PostgreSQLConnection",
            ProbeType::MySQLConnection => "MySQLConnection",
            ProbeType::MongoDBConnection => "MongoDBConnection",
            ProbeType::KongConnection => "KongConnection",
            ProbeType::IngressCertificate => "IngressCertificate",
            ProbeType::KafkaConsumerLag => "KafkaConsumerLag",
        }
    }

    /// Which configuration family this probe type reads.
    pub fn family(&self) -> ConfigFamily {
        match self {
            ProbeType::HealthCheck => ConfigFamily::HealthCheck,
            ProbeType::PodStatus
            | ProbeType::PodMemoryUsage
            | ProbeType::PodCpuUsage
            | ProbeType::PodActiveNodes => ConfigFamily::Pod,
            ProbeType::PvcUsage => ConfigFamily::Pvc,
            ProbeType::RedisConnection
            | ProbeType::PostgreSQLConnection
            | ProbeType::MySQLConnection
            | ProbeType::MongoDBConnection
            | ProbeType::KongConnection => ConfigFamily::Connection,
            ProbeType::IngressCertificate => ConfigFamily::Certificate,
            ProbeType::KafkaConsumerLag => ConfigFamily::Kafka,
        }
    }
}

impl fmt::Display for ProbeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProbeType {
    type Err = UnknownProbeType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "MessageQueueConsumerLag" {
            return Ok(ProbeType::KafkaConsumerLag);
        }
        ProbeType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownProbeType(s.to_string()))
    }
}

/// Returned when a catalog name does not match any known probe type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown metric type: {0}")]
pub struct UnknownProbeType(pub String);
