//! k8s-monitor - Kubernetes workload monitoring
//!
//! Periodically probes configured targets, stores results in SQLite and
//! posts deduplicated Slack alerts on failure.

mod alert;
mod cluster;
mod config;
mod db;
mod metric;
mod probe;
mod scheduler;

use alert::{AlertEngine, AlertSettings, SlackNotifier};
use cluster::KubeClient;
use config::ServerConfig;
use db::Store;
use probe::kafka::RdKafkaFactory;
use probe::{ProbeRegistry, ProbeSettings};
use scheduler::{Collector, RetentionReaper, Scheduler};

use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("k8s_monitor=info".parse()?),
        )
        .init();

    let cfg = ServerConfig::load();
    tracing::info!("Using database at {}", cfg.db_path);

    if let Some(dir) = Path::new(&cfg.db_path).parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    let store = Arc::new(Store::new(&cfg.db_path)?);
    tracing::info!("Database initialized successfully");

    let cluster = Arc::new(KubeClient::new().await?);
    tracing::info!("Kubernetes client initialized");

    if cfg.alerts_active() {
        tracing::info!(
            "Slack alerts enabled (dedup {} minutes, health check threshold {})",
            cfg.alert_dedup_minutes,
            cfg.healthcheck_failure_threshold
        );
    }
    let alerts = AlertEngine::new(
        AlertSettings::from(&cfg),
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(SlackNotifier::new(cfg.slack_webhook_url.clone())),
    );

    let collector = Arc::new(Collector::new(
        store.clone(),
        store.clone(),
        ProbeRegistry::standard(cluster, Arc::new(RdKafkaFactory)),
        alerts,
        ProbeSettings::from(&cfg),
    ));
    let reaper = Arc::new(RetentionReaper::new(store.clone(), cfg.retention_days));

    let mut scheduler = Scheduler::new(
        collector,
        reaper,
        cfg.collection_interval(),
        &cfg.cleanup_interval,
    )?;
    scheduler.start();
    tracing::info!(
        "Monitoring service started (interval {}s, retention {} days, cleanup {:?})",
        cfg.collection_interval_secs,
        cfg.retention_days,
        cfg.cleanup_interval
    );

    signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");
    scheduler.stop().await;

    Ok(())
}
