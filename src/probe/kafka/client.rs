//! `rdkafka`-backed offset source.

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{BaseConsumer, Consumer};
use rdkafka::{Offset, TopicPartitionList};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::{OffsetError, OffsetSource, OffsetSourceFactory};
use crate::metric::KafkaConfig;

const CLIENT_ID: &str = "k8s-monitor";

/// Opens a real broker connection per probe run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RdKafkaFactory;

impl OffsetSourceFactory for RdKafkaFactory {
    fn connect(
        &self,
        config: &KafkaConfig,
        timeout: Duration,
    ) -> Result<Box<dyn OffsetSource>, OffsetError> {
        let source = RdKafkaSource::new(config, timeout)?;
        Ok(Box::new(source))
    }
}

pub struct RdKafkaSource {
    base: ClientConfig,
    metadata: BaseConsumer,
    deadline: Instant,
}

/// Client settings shared by every consumer of one run.
fn client_config(cfg: &KafkaConfig) -> ClientConfig {
    let mut config = ClientConfig::new();
    config
        .set("bootstrap.servers", cfg.kafka_bootstrap_servers())
        .set("client.id", CLIENT_ID)
        .set("enable.auto.commit", "false");
    if !cfg.kafka_security_protocol().is_empty() {
        config.set("security.protocol", cfg.kafka_security_protocol());
    }
    if cfg.uses_sasl() {
        config
            .set("sasl.mechanism", cfg.kafka_sasl_mechanism())
            .set("sasl.username", cfg.kafka_sasl_username())
            .set("sasl.password", cfg.kafka_sasl_password());
    }
    config
}

impl RdKafkaSource {
    pub fn new(cfg: &KafkaConfig, timeout: Duration) -> Result<Self, OffsetError> {
        let base = client_config(cfg);
        let metadata = base
            .create::<BaseConsumer>()
            .map_err(|e| OffsetError::Connect(e.to_string()))?;
        Ok(Self {
            base,
            metadata,
            deadline: Instant::now() + timeout,
        })
    }

    fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

impl OffsetSource for RdKafkaSource {
    fn topics(&self) -> Result<Vec<String>, OffsetError> {
        let metadata = self
            .metadata
            .fetch_metadata(None, self.remaining())
            .map_err(|e| OffsetError::Metadata(e.to_string()))?;
        Ok(metadata
            .topics()
            .iter()
            .map(|t| t.name().to_string())
            .filter(|name| !name.starts_with("__"))
            .collect())
    }

    fn groups(&self) -> Result<Vec<String>, OffsetError> {
        let list = self
            .metadata
            .fetch_group_list(None, self.remaining())
            .map_err(|e| OffsetError::Groups(e.to_string()))?;
        Ok(list
            .groups()
            .iter()
            .map(|g| g.name().to_string())
            .filter(|name| !name.is_empty())
            .collect())
    }

    fn partitions(&self, topic: &str) -> Result<Vec<i32>, OffsetError> {
        let metadata = self
            .metadata
            .fetch_metadata(Some(topic), self.remaining())
            .map_err(|e| OffsetError::Metadata(e.to_string()))?;
        let Some(meta) = metadata.topics().iter().find(|t| t.name() == topic) else {
            return Err(OffsetError::Metadata(format!("topic not found: {}", topic)));
        };
        if let Some(err) = meta.error() {
            return Err(OffsetError::Metadata(format!("{:?}", err)));
        }
        Ok(meta.partitions().iter().map(|p| p.id()).collect())
    }

    fn committed_offsets(
        &self,
        group: &str,
        topic: &str,
        partitions: &[i32],
    ) -> Result<HashMap<i32, i64>, OffsetError> {
        // Committed offsets are always read for the consumer's own group.
        let consumer = self
            .base
            .clone()
            .set("group.id", group)
            .create::<BaseConsumer>()
            .map_err(|e| OffsetError::Connect(e.to_string()))?;

        let mut tpl = TopicPartitionList::new();
        for &partition in partitions {
            tpl.add_partition(topic, partition);
        }
        let committed = consumer
            .committed_offsets(tpl, self.remaining())
            .map_err(|e| OffsetError::Offsets(e.to_string()))?;

        Ok(committed
            .elements()
            .iter()
            .filter_map(|elem| match elem.offset() {
                Offset::Offset(offset) => Some((elem.partition(), offset)),
                _ => None,
            })
            .collect())
    }

    fn log_end_offset(&self, topic: &str, partition: i32) -> Result<i64, OffsetError> {
        let (_, high) = self
            .metadata
            .fetch_watermarks(topic, partition, self.remaining())
            .map_err(|e| OffsetError::Offsets(e.to_string()))?;
        Ok(high)
    }
}
