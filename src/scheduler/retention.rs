//! Retention reaper for deleting expired history.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;

use crate::db::{DbError, HistoryStore};

/// Deletes history older than the retention horizon in one bulk statement.
pub struct RetentionReaper {
    history: Arc<dyn HistoryStore>,
    retention_days: u32,
}

impl RetentionReaper {
    pub fn new(history: Arc<dyn HistoryStore>, retention_days: u32) -> Self {
        Self {
            history,
            retention_days,
        }
    }

    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - ChronoDuration::days(self.retention_days as i64)
    }

    /// Run one cleanup relative to `now`, returning the rows deleted.
    pub fn run_at(&self, now: DateTime<Utc>) -> Result<usize, DbError> {
        let cutoff = self.cutoff(now);
        tracing::info!(
            "Starting metrics cleanup (retention {} days, cutoff {})",
            self.retention_days,
            cutoff
        );
        let deleted = self.history.delete_history_older_than(cutoff)?;
        tracing::info!("Metrics cleanup completed: {} records deleted", deleted);
        Ok(deleted)
    }

    pub fn run(&self) {
        if let Err(e) = self.run_at(Utc::now()) {
            tracing::error!("RetentionReaper: Failed to cleanup old metrics: {}", e);
        }
    }
}
