//! Configuration module for the monitor.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::time::Duration;

/// Lowest collection interval accepted, in seconds.
pub const MIN_COLLECTION_INTERVAL_SECS: u64 = 10;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path to the SQLite database file (default: "./data/k8s_monitoring.db")
    pub db_path: String,
    /// Seconds between collection passes (default: 60, minimum 10)
    pub collection_interval_secs: u64,
    /// Days of history kept by the retention reaper (default: 30)
    pub retention_days: u32,
    /// Trigger spec for the retention reaper (default: "0 2 * * *")
    pub cleanup_interval: String,
    /// Whether failure alerts are posted to Slack (default: false)
    pub alerts_enabled: bool,
    /// Slack incoming webhook URL
    pub slack_webhook_url: String,
    /// Alert deduplication window in minutes (default: 10, minimum 1)
    pub alert_dedup_minutes: u32,
    /// Consecutive HealthCheck failures required before alerting (default: 3)
    pub healthcheck_failure_threshold: u32,
    /// Probe timeout used when a target does not declare one (default: 5)
    pub default_probe_timeout_secs: u64,
    /// Certificate expiry warning threshold in days (default: 30)
    pub certificate_warning_days: i64,
    /// Kafka consumer lag warning threshold (default: 1000)
    pub kafka_lag_threshold: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: "./data/k8s_monitoring.db".to_string(),
            collection_interval_secs: 60,
            retention_days: 30,
            cleanup_interval: "0 2 * * *".to_string(),
            alerts_enabled: false,
            slack_webhook_url: String::new(),
            alert_dedup_minutes: 10,
            healthcheck_failure_threshold: 3,
            default_probe_timeout_secs: 5,
            certificate_warning_days: 30,
            kafka_lag_threshold: 1000,
        }
    }
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// Outside of staging/production a `.env` file is read first, if present.
    ///
    /// Environment variables:
    /// - `DB_PATH`: Database file path
    /// - `METRICS_COLLECTION_INTERVAL`: collection interval in seconds
    /// - `METRICS_RETENTION_DAYS`: history retention in days
    /// - `METRICS_CLEANUP_INTERVAL`: cron or `@every` spec for the reaper
    /// - `SLACK_ALERTS_ENABLED`, `SLACK_WEBHOOK_URL`, `SLACK_ALERTS_DEDUP_MINUTES`
    /// - `HEALTHCHECK_FAILURE_THRESHOLD`
    /// - `PROBE_DEFAULT_TIMEOUT_SECONDS`
    /// - `CERTIFICATE_WARNING_DAYS`
    /// - `KAFKA_LAG_THRESHOLD`
    pub fn load() -> Self {
        let deployed = matches!(
            env::var("ENV").as_deref(),
            Ok("staging") | Ok("production")
        );
        if !deployed {
            if let Ok(path) = dotenvy::dotenv() {
                tracing::debug!("Loaded environment from {}", path.display());
            }
        }

        Self::load_from(|key| env::var(key).ok())
    }

    /// Load configuration using an arbitrary key lookup.
    pub fn load_from<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(db_path) = lookup("DB_PATH").filter(|v| !v.is_empty()) {
            cfg.db_path = db_path;
        }

        if let Some(secs) = parse_var::<u64, _>(&lookup, "METRICS_COLLECTION_INTERVAL") {
            cfg.collection_interval_secs = secs.max(MIN_COLLECTION_INTERVAL_SECS);
        }

        if let Some(days) = parse_var::<i64, _>(&lookup, "METRICS_RETENTION_DAYS") {
            cfg.retention_days = days.clamp(0, u32::MAX as i64) as u32;
        }

        if let Some(spec) = lookup("METRICS_CLEANUP_INTERVAL").filter(|v| !v.trim().is_empty()) {
            cfg.cleanup_interval = spec.trim().to_string();
        }

        if let Some(flag) = lookup("SLACK_ALERTS_ENABLED") {
            cfg.alerts_enabled = flag == "1" || flag.eq_ignore_ascii_case("true");
        }

        if let Some(url) = lookup("SLACK_WEBHOOK_URL") {
            cfg.slack_webhook_url = url.trim().to_string();
        }

        if let Some(minutes) = parse_var::<i64, _>(&lookup, "SLACK_ALERTS_DEDUP_MINUTES") {
            cfg.alert_dedup_minutes = minutes.clamp(1, u32::MAX as i64) as u32;
        }

        if let Some(n) = parse_var::<i64, _>(&lookup, "HEALTHCHECK_FAILURE_THRESHOLD") {
            cfg.healthcheck_failure_threshold = n.clamp(1, u32::MAX as i64) as u32;
        }

        if let Some(secs) = parse_var::<u64, _>(&lookup, "PROBE_DEFAULT_TIMEOUT_SECONDS") {
            cfg.default_probe_timeout_secs = secs.max(1);
        }

        if let Some(days) = parse_var::<i64, _>(&lookup, "CERTIFICATE_WARNING_DAYS") {
            cfg.certificate_warning_days = days.max(1);
        }

        if let Some(threshold) = parse_var::<i64, _>(&lookup, "KAFKA_LAG_THRESHOLD") {
            cfg.kafka_lag_threshold = threshold.max(1);
        }

        cfg
    }

    /// True when alerts are switched on and have somewhere to go.
    pub fn alerts_active(&self) -> bool {
        self.alerts_enabled && !self.slack_webhook_url.is_empty()
    }

    pub fn collection_interval(&self) -> Duration {
        Duration::from_secs(self.collection_interval_secs)
    }

    pub fn default_probe_timeout(&self) -> Duration {
        Duration::from_secs(self.default_probe_timeout_secs)
    }

    pub fn alert_dedup_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.alert_dedup_minutes as i64)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring invalid value for {}: {:?}", key, raw);
            None
        }
    }
}
