//! Consumer-group lag probe.
//!
//! Offsets are read through the blocking [`OffsetSource`] trait so the lag
//! arithmetic can be tested without a broker.

mod client;

pub use client::*;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::{Probe, ProbeContext, ProbeError};
use crate::metric::{
    ConfigFamily, Configuration, GroupLag, KafkaConfig, KafkaLagValue, LagStatus, MetricValue,
    PartitionLag, TopicLag,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OffsetError {
    #[error("failed to connect to Kafka: {0}")]
    Connect(String),
    #[error("failed to read metadata: {0}")]
    Metadata(String),
    #[error("failed to list consumer groups: {0}")]
    Groups(String),
    #[error("failed to fetch offsets: {0}")]
    Offsets(String),
}

/// Broker view needed to compute lag. Every call may block.
pub trait OffsetSource: Send {
    /// Every topic visible on the cluster.
    fn topics(&self) -> Result<Vec<String>, OffsetError>;
    /// Every consumer group known to the cluster.
    fn groups(&self) -> Result<Vec<String>, OffsetError>;
    fn partitions(&self, topic: &str) -> Result<Vec<i32>, OffsetError>;
    /// Committed offsets of `group`. Partitions without a commit are absent.
    fn committed_offsets(
        &self,
        group: &str,
        topic: &str,
        partitions: &[i32],
    ) -> Result<HashMap<i32, i64>, OffsetError>;
    fn log_end_offset(&self, topic: &str, partition: i32) -> Result<i64, OffsetError>;
}

/// Opens an [`OffsetSource`] for one probe run.
pub trait OffsetSourceFactory: Send + Sync {
    fn connect(
        &self,
        config: &KafkaConfig,
        timeout: Duration,
    ) -> Result<Box<dyn OffsetSource>, OffsetError>;
}

/// Overall status for a total lag against `threshold`.
pub fn classify_lag(total_lag: i64, threshold: i64) -> LagStatus {
    if total_lag >= threshold.saturating_mul(10) {
        LagStatus::Critical
    } else if total_lag >= threshold {
        LagStatus::Warning
    } else {
        LagStatus::Ok
    }
}

fn topic_lag(
    source: &dyn OffsetSource,
    group: &str,
    topic: &str,
) -> Result<TopicLag, OffsetError> {
    let partitions = source.partitions(topic)?;
    let committed = source.committed_offsets(group, topic, &partitions)?;

    let mut lag = TopicLag {
        topic: topic.to_string(),
        ..Default::default()
    };
    for partition in partitions {
        let Some(&current) = committed.get(&partition) else {
            continue;
        };
        if current < 0 {
            continue;
        }
        let end = match source.log_end_offset(topic, partition) {
            Ok(end) => end,
            Err(e) => {
                tracing::warn!(
                    "Skipping partition {}/{} for group {}: {}",
                    topic,
                    partition,
                    group,
                    e
                );
                continue;
            }
        };
        let partition_lag = (end - current).max(0);
        lag.total_lag += partition_lag;
        lag.partition_lags.push(PartitionLag {
            partition,
            current_offset: current,
            log_end_offset: end,
            lag: partition_lag,
        });
    }
    Ok(lag)
}

/// Walk every (group, topic) pair and aggregate lag.
///
/// Failures are reported inside the value with an `error` status.
pub fn collect_lag(source: &dyn OffsetSource, cfg: &KafkaConfig, threshold: i64) -> KafkaLagValue {
    let mut value = KafkaLagValue {
        kafka_consumer_group: cfg.kafka_consumer_group().to_string(),
        kafka_topic: cfg.kafka_topic().to_string(),
        kafka_lag_threshold: threshold,
        ..Default::default()
    };

    let topics = if cfg.kafka_topic().is_empty() {
        match source.topics() {
            Ok(t) => t,
            Err(e) => {
                value.kafka_error = Some(e.to_string());
                return value;
            }
        }
    } else {
        vec![cfg.kafka_topic().to_string()]
    };

    let groups = if cfg.kafka_consumer_group().is_empty() {
        match source.groups() {
            Ok(g) if g.is_empty() => {
                value.kafka_error = Some("no consumer groups found".to_string());
                return value;
            }
            Ok(g) => g,
            Err(e) => {
                value.kafka_error = Some(e.to_string());
                return value;
            }
        }
    } else {
        vec![cfg.kafka_consumer_group().to_string()]
    };

    for group in &groups {
        let mut group_lag = GroupLag {
            group: group.clone(),
            ..Default::default()
        };
        for topic in &topics {
            match topic_lag(source, group, topic) {
                Ok(lag) if lag.partition_lags.is_empty() => {}
                Ok(lag) => {
                    group_lag.total_lag += lag.total_lag;
                    group_lag.topic_lags.push(lag);
                }
                Err(e) => {
                    tracing::warn!("Failed to collect lag for {} on {}: {}", group, topic, e);
                }
            }
        }
        if !group_lag.topic_lags.is_empty() {
            value.kafka_total_lag += group_lag.total_lag;
            value.kafka_group_lags.push(group_lag);
        }
    }

    if value.kafka_group_lags.is_empty() {
        value.kafka_error = Some("no topics/groups found or unable to collect lag".to_string());
        return value;
    }

    value.kafka_lag_status = classify_lag(value.kafka_total_lag, threshold);
    value
}

pub struct KafkaLagProbe {
    factory: Arc<dyn OffsetSourceFactory>,
}

impl KafkaLagProbe {
    pub fn new(factory: Arc<dyn OffsetSourceFactory>) -> Self {
        Self { factory }
    }
}

#[async_trait]
impl Probe for KafkaLagProbe {
    async fn run(
        &self,
        ctx: &ProbeContext,
        config: &Configuration,
    ) -> Result<MetricValue, ProbeError> {
        let Configuration::Kafka(cfg) = config else {
            return Err(ProbeError::wrong_family(ConfigFamily::Kafka, config));
        };
        let cfg = cfg.clone();
        let threshold = cfg
            .kafka_lag_threshold
            .filter(|t| *t > 0)
            .unwrap_or(ctx.settings.kafka_lag_threshold);
        let factory = self.factory.clone();
        let budget = ctx.remaining();

        let task = tokio::task::spawn_blocking(move || match factory.connect(&cfg, budget) {
            Ok(source) => collect_lag(source.as_ref(), &cfg, threshold),
            Err(e) => KafkaLagValue {
                kafka_consumer_group: cfg.kafka_consumer_group().to_string(),
                kafka_topic: cfg.kafka_topic().to_string(),
                kafka_lag_threshold: threshold,
                kafka_error: Some(e.to_string()),
                ..Default::default()
            },
        });

        match tokio::time::timeout(budget, task).await {
            Ok(Ok(value)) => Ok(value.into()),
            Ok(Err(e)) => Err(ProbeError::Failed(format!("lag collection panicked: {}", e))),
            Err(_) => Err(ProbeError::Timeout(ctx.timeout)),
        }
    }
}
