//! Probe module for workload monitoring.
//!
//! Every probe implements [`Probe`]; the [`ProbeRegistry`] maps each catalog
//! type to its implementation so the scheduler never matches on type names.

mod certificate;
mod cluster;
mod connection;
mod http;
pub mod kafka;

pub use certificate::*;
pub use cluster::*;
pub use connection::*;
pub use http::*;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use crate::cluster::{ClusterApi, ClusterError};
use crate::config::ServerConfig;
use crate::db::Application;
use crate::metric::{ConfigFamily, Configuration, ConfigurationError, MetricValue, ProbeType};
use kafka::{KafkaLagProbe, OffsetSourceFactory};

/// Probe error types.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigurationError),
    #[error(transparent)]
    Cluster(#[from] ClusterError),
    #[error("command failed: {0}")]
    Command(String),
    #[error("{0}")]
    Failed(String),
}

impl ProbeError {
    pub(crate) fn wrong_family(expected: ConfigFamily, got: &Configuration) -> Self {
        ProbeError::Config(ConfigurationError::Invalid(format!(
            "expected {:?} configuration, got {:?}",
            expected,
            got.family()
        )))
    }
}

/// Engine-wide probe defaults.
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub default_timeout: Duration,
    pub certificate_warning_days: i64,
    pub kafka_lag_threshold: i64,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(5),
            certificate_warning_days: 30,
            kafka_lag_threshold: 1000,
        }
    }
}

impl From<&ServerConfig> for ProbeSettings {
    fn from(cfg: &ServerConfig) -> Self {
        Self {
            default_timeout: cfg.default_probe_timeout(),
            certificate_warning_days: cfg.certificate_warning_days,
            kafka_lag_threshold: cfg.kafka_lag_threshold,
        }
    }
}

/// Execution context handed to a probe: who it runs for and how long it may take.
#[derive(Debug, Clone)]
pub struct ProbeContext {
    pub application: Application,
    pub timeout: Duration,
    pub deadline: Instant,
    pub settings: ProbeSettings,
}

impl ProbeContext {
    /// Start the clock for one probe run.
    ///
    /// The configuration's own timeout wins over the engine default.
    pub fn new(application: Application, config: &Configuration, settings: ProbeSettings) -> Self {
        let timeout = config.timeout().unwrap_or(settings.default_timeout);
        Self {
            application,
            timeout,
            deadline: Instant::now() + timeout,
            settings,
        }
    }

    /// Time left before the deadline, never negative.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn expired(&self) -> bool {
        self.remaining().is_zero()
    }
}

/// A single kind of check.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn run(&self, ctx: &ProbeContext, config: &Configuration)
        -> Result<MetricValue, ProbeError>;
}

/// Maps probe types to their implementations.
#[derive(Default, Clone)]
pub struct ProbeRegistry {
    probes: HashMap<ProbeType, Arc<dyn Probe>>,
}

impl ProbeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in probe.
    pub fn standard(cluster: Arc<dyn ClusterApi>, offsets: Arc<dyn OffsetSourceFactory>) -> Self {
        let mut registry = Self::new();
        registry.register(ProbeType::HealthCheck, HealthCheckProbe::new());
        registry.register(ProbeType::PodStatus, PodStatusProbe::new(cluster.clone()));
        registry.register(ProbeType::PodMemoryUsage, MemoryUsageProbe::new(cluster.clone()));
        registry.register(ProbeType::PodCpuUsage, CpuUsageProbe::new(cluster.clone()));
        registry.register(ProbeType::PvcUsage, PvcUsageProbe::new(cluster.clone()));
        registry.register(ProbeType::PodActiveNodes, ActiveNodesProbe::new(cluster.clone()));
        registry.register(ProbeType::RedisConnection, RedisProbe);
        registry.register(ProbeType::PostgreSQLConnection, PostgresProbe);
        registry.register(ProbeType::MySQLConnection, MySqlProbe);
        registry.register(ProbeType::MongoDBConnection, MongoProbe);
        registry.register(ProbeType::KongConnection, KongProbe::new());
        registry.register(ProbeType::IngressCertificate, CertificateProbe::new(cluster));
        registry.register(ProbeType::KafkaConsumerLag, KafkaLagProbe::new(offsets));
        registry
    }

    pub fn register<P: Probe + 'static>(&mut self, probe_type: ProbeType, probe: P) {
        self.probes.insert(probe_type, Arc::new(probe));
    }

    pub fn get(&self, probe_type: ProbeType) -> Option<Arc<dyn Probe>> {
        self.probes.get(&probe_type).cloned()
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }
}

/// Elapsed milliseconds since `start`.
pub(crate) fn elapsed_ms(start: std::time::Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
