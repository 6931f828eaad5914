//! Database model types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Owner of a group of applications; only its name is used, to label alerts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
}

/// A deployed workload, resolved to a cluster namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: i64,
    pub project_id: Option<i64>,
    pub name: String,
    pub namespace: String,
}

/// One monitored aspect of one application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub id: i64,
    pub application_id: i64,
    /// Catalog name of the probe type; parsed at collection time.
    pub metric_type: String,
    /// Raw JSON configuration payload.
    pub configuration: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored probe result snapshot.
#[derive(Debug, Clone)]
pub struct HistoryRecord {
    pub id: i64,
    pub target_id: i64,
    /// JSON-encoded `MetricValue`.
    pub value: String,
    pub created_at: DateTime<Utc>,
}

/// Dedup marker for alerts sent on a given day.
#[derive(Debug, Clone)]
pub struct AlertRecord {
    pub target_id: i64,
    pub alert_date: NaiveDate,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}
