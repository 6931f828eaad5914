//! Failure classification, the persistent-failure gate and alert delivery.
//!
//! Only an explicit allow-list of probe types can raise alerts; everything
//! else is recorded to history and nothing more.

mod slack;

#[cfg(test)]
pub mod fake;

pub use slack::*;

use chrono::Utc;
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::db::{Application, Catalog, DedupStore, HistoryRecord, HistoryStore, Target};
use crate::metric::{ConnectionStatus, HealthStatus, MetricValue, ProbeType};

const FAILURE_TITLE: &str = "Metric failure detected";
const COLLECTION_ERROR_TITLE: &str = "Metric collection error";

fn health_failed(value: &MetricValue) -> bool {
    match value {
        MetricValue::HealthCheck(v) => {
            v.status == HealthStatus::Down || v.status_code.is_some_and(|c| c >= 400)
        }
        _ => false,
    }
}

/// Reason string when `value` is an alertable failure for `probe_type`.
pub fn should_alert(probe_type: ProbeType, value: &MetricValue) -> Option<String> {
    match (probe_type, value) {
        (ProbeType::HealthCheck, MetricValue::HealthCheck(v)) if health_failed(value) => {
            let mut reason = match v.status_code {
                Some(code) => format!("status {}", code),
                None => "healthcheck down".to_string(),
            };
            if let Some(msg) = v.error_message.as_deref().filter(|m| !m.is_empty()) {
                reason = format!("{} - {}", reason, msg);
            }
            Some(reason)
        }
        (
            ProbeType::RedisConnection
            | ProbeType::PostgreSQLConnection
            | ProbeType::MongoDBConnection,
            MetricValue::Connection(v),
        ) if v.connection_status != ConnectionStatus::Connected => {
            let mut reason = v.connection_status.as_str().to_string();
            if let Some(err) = v.connection_error.as_deref().filter(|e| !e.is_empty()) {
                reason = format!("{} - {}", reason, err);
            }
            Some(reason)
        }
        _ => None,
    }
}

/// Types whose collection errors are worth a notification.
pub fn is_collection_alert_eligible(probe_type: ProbeType) -> bool {
    matches!(
        probe_type,
        ProbeType::HealthCheck
            | ProbeType::RedisConnection
            | ProbeType::PostgreSQLConnection
            | ProbeType::MongoDBConnection
    )
}

/// Whether `current` extends a run of at least `threshold` health-check
/// failures. `previous` is most-recent-first and excludes `current`.
///
/// Too little history, or a record that no longer decodes, never counts as
/// persistence.
pub fn is_persistent_failure(
    current: &MetricValue,
    previous: &[HistoryRecord],
    threshold: u32,
) -> bool {
    if !health_failed(current) {
        return false;
    }
    if threshold <= 1 {
        return true;
    }

    let needed = (threshold - 1) as usize;
    if previous.len() < needed {
        return false;
    }

    let mut consecutive: u32 = 1;
    for record in previous.iter().take(needed) {
        match MetricValue::decode(ProbeType::HealthCheck, &record.value) {
            Ok(value) if health_failed(&value) => consecutive += 1,
            Ok(_) => break,
            Err(e) => {
                tracing::warn!(
                    "Error parsing previous HealthCheck value {} for target {}: {}",
                    record.id,
                    record.target_id,
                    e
                );
                return false;
            }
        }
    }
    consecutive >= threshold
}

#[derive(Debug, Clone)]
pub struct AlertSettings {
    pub enabled: bool,
    pub dedup_window: chrono::Duration,
    pub failure_threshold: u32,
}

impl From<&ServerConfig> for AlertSettings {
    fn from(cfg: &ServerConfig) -> Self {
        Self {
            enabled: cfg.alerts_active(),
            dedup_window: cfg.alert_dedup_window(),
            failure_threshold: cfg.healthcheck_failure_threshold,
        }
    }
}

/// What the engine decided for one result.
#[derive(Debug)]
pub enum AlertOutcome {
    Disabled,
    /// Not a failure, or not a type that alerts.
    NotAlertable,
    /// Failing, but the persistent-failure gate is not met yet.
    BelowThreshold,
    /// Already alerted within the dedup window.
    Suppressed,
    Sent,
    Failed(DeliveryError),
}

/// Everything an alert needs to know about the target it fires for.
pub struct AlertSubject<'a> {
    pub target: &'a Target,
    pub application: &'a Application,
    pub probe_type: ProbeType,
}

pub struct AlertEngine {
    settings: AlertSettings,
    catalog: Arc<dyn Catalog>,
    history: Arc<dyn HistoryStore>,
    dedup: Arc<dyn DedupStore>,
    notifier: Arc<dyn Notifier>,
}

impl AlertEngine {
    pub fn new(
        settings: AlertSettings,
        catalog: Arc<dyn Catalog>,
        history: Arc<dyn HistoryStore>,
        dedup: Arc<dyn DedupStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            settings,
            catalog,
            history,
            dedup,
            notifier,
        }
    }

    /// Evaluate a fresh probe result. Must run before the result is appended
    /// to history so the gate only sees earlier records.
    pub async fn on_result(&self, subject: &AlertSubject<'_>, value: &MetricValue) -> AlertOutcome {
        if !self.settings.enabled {
            return AlertOutcome::Disabled;
        }
        let Some(reason) = should_alert(subject.probe_type, value) else {
            return AlertOutcome::NotAlertable;
        };

        if subject.probe_type == ProbeType::HealthCheck && !self.persistent(subject, value) {
            tracing::debug!(
                "Skipping alert for {} {}: fewer than {} consecutive failures",
                subject.application.name,
                subject.probe_type,
                self.settings.failure_threshold
            );
            return AlertOutcome::BelowThreshold;
        }

        self.deliver(
            subject,
            FAILURE_TITLE,
            reason,
            format!("failure:{}", subject.probe_type),
        )
        .await
    }

    /// Alert on a target whose probe could not run at all.
    pub async fn on_collection_error(&self, subject: &AlertSubject<'_>, error: &str) -> AlertOutcome {
        if !self.settings.enabled {
            return AlertOutcome::Disabled;
        }
        if !is_collection_alert_eligible(subject.probe_type) {
            return AlertOutcome::NotAlertable;
        }
        self.deliver(
            subject,
            COLLECTION_ERROR_TITLE,
            error.to_string(),
            format!("collection_error:{}", subject.probe_type),
        )
        .await
    }

    fn persistent(&self, subject: &AlertSubject<'_>, value: &MetricValue) -> bool {
        let threshold = self.settings.failure_threshold;
        let previous = if threshold > 1 {
            match self
                .history
                .list_recent_history(subject.target.id, (threshold - 1) as usize)
            {
                Ok(records) => records,
                Err(e) => {
                    tracing::warn!(
                        "Error fetching previous values for target {}: {}",
                        subject.target.id,
                        e
                    );
                    return false;
                }
            }
        } else {
            Vec::new()
        };
        is_persistent_failure(value, &previous, threshold)
    }

    fn project_name(&self, application: &Application) -> String {
        application
            .project_id
            .and_then(|id| self.catalog.get_project(id).ok())
            .map(|p| p.name)
            .unwrap_or_else(|| "N/A".to_string())
    }

    async fn deliver(
        &self,
        subject: &AlertSubject<'_>,
        title: &str,
        reason: String,
        dedup_reason: String,
    ) -> AlertOutcome {
        let target_id = subject.target.id;
        match self
            .dedup
            .has_alerted_within(target_id, self.settings.dedup_window)
        {
            Ok(true) => {
                tracing::debug!(
                    "Skipping alert for {} {}: already notified within window",
                    subject.application.name,
                    subject.probe_type
                );
                return AlertOutcome::Suppressed;
            }
            Ok(false) => {}
            Err(e) => tracing::warn!("Failed to check alert dedup for target {}: {}", target_id, e),
        }

        let alert = Alert {
            title: title.to_string(),
            project: self.project_name(subject.application),
            application: subject.application.name.clone(),
            namespace: subject.application.namespace.clone(),
            metric: subject.probe_type.to_string(),
            reason,
        };

        if let Err(e) = self.notifier.notify(&alert).await {
            let err = DeliveryError::from(e);
            tracing::warn!("{} for target {}", err, target_id);
            return AlertOutcome::Failed(err);
        }

        tracing::info!(
            "Alert sent for {} {} ({})",
            subject.application.name,
            subject.probe_type,
            dedup_reason
        );
        if let Err(e) = self
            .dedup
            .mark_alerted(target_id, Utc::now().date_naive(), &dedup_reason)
        {
            tracing::warn!("Failed to record alert for target {}: {}", target_id, e);
        }
        AlertOutcome::Sent
    }
}
