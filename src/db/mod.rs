//! Database module for the monitor.
//!
//! Provides SQLite storage with embedded migrations, and the narrow
//! collaborator traits the collection engine consumes.

mod models;
mod store;

pub use models::*;
pub use store::*;

use chrono::{DateTime, NaiveDate, Utc};

use crate::metric::MetricValue;

/// Read access to configured targets and their owners.
pub trait Catalog: Send + Sync {
    fn list_targets(&self) -> Result<Vec<Target>, DbError>;
    fn get_application(&self, id: i64) -> Result<Application, DbError>;
    fn get_project(&self, id: i64) -> Result<Project, DbError>;
}

/// Append-only probe history.
pub trait HistoryStore: Send + Sync {
    fn append_history(&self, target_id: i64, value: &MetricValue) -> Result<i64, DbError>;

    /// Most recent records first.
    fn list_recent_history(&self, target_id: i64, limit: usize)
        -> Result<Vec<HistoryRecord>, DbError>;

    fn delete_history_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, DbError>;
}

/// Per-target, per-day record of delivered alerts.
pub trait DedupStore: Send + Sync {
    fn has_alerted_within(&self, target_id: i64, window: chrono::Duration)
        -> Result<bool, DbError>;

    fn mark_alerted(&self, target_id: i64, day: NaiveDate, reason: &str) -> Result<(), DbError>;
}
