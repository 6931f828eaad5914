//! SQLite database store implementation.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

use super::models::*;
use super::{Catalog, DedupStore, HistoryStore};
use crate::metric::{Configuration, ConfigurationError, MetricValue, ProbeType};

mod embedded {
    refinery::embed_migrations!("migrations");
}

const DB_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.9f";

/// Database error types.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Migration error: {0}")]
    Migration(#[from] refinery::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigurationError),
    #[error("unknown metric type: {0}")]
    UnknownMetricType(String),
    #[error("Database lock poisoned")]
    Poisoned,
    #[error("Not found")]
    NotFound,
}

/// Thread-safe database store.
///
/// A single connection serializes every writer; readers in other processes
/// are absorbed by WAL mode and the busy timeout.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Create a new store with the given database path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let mut conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let report = embedded::migrations::runner().run(&mut conn)?;
        for migration in report.applied_migrations() {
            tracing::info!("Applied migration {}", migration);
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DbError> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }

    // --- Catalog writes ---

    pub fn add_project(&self, name: &str) -> Result<Project, DbError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO projects (name, created_at) VALUES (?1, ?2)",
            params![name, format_db_time(Utc::now())],
        )?;
        Ok(Project {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    pub fn add_application(
        &self,
        project_id: Option<i64>,
        name: &str,
        namespace: &str,
    ) -> Result<Application, DbError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO applications (project_id, name, namespace, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![project_id, name, namespace, format_db_time(Utc::now())],
        )?;
        Ok(Application {
            id: conn.last_insert_rowid(),
            project_id,
            name: name.to_string(),
            namespace: namespace.to_string(),
        })
    }

    /// Add a target after validating its configuration for `metric_type`.
    pub fn add_target(
        &self,
        application_id: i64,
        metric_type: ProbeType,
        configuration: &str,
    ) -> Result<Target, DbError> {
        Configuration::parse(metric_type, configuration)?;

        let conn = self.conn()?;
        let type_id = metric_type_id(&conn, metric_type.as_str())?;
        let now = Utc::now();
        conn.execute(
            "INSERT INTO application_metrics (application_id, type_id, configuration, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![application_id, type_id, configuration, format_db_time(now)],
        )?;

        Ok(Target {
            id: conn.last_insert_rowid(),
            application_id,
            metric_type: metric_type.as_str().to_string(),
            configuration: configuration.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Replace a target's configuration, validating it against the target's type.
    pub fn update_target_configuration(&self, id: i64, configuration: &str) -> Result<(), DbError> {
        let target = self.get_target(id)?;
        let metric_type: ProbeType = target
            .metric_type
            .parse()
            .map_err(|_| DbError::UnknownMetricType(target.metric_type.clone()))?;
        Configuration::parse(metric_type, configuration)?;

        let conn = self.conn()?;
        conn.execute(
            "UPDATE application_metrics SET configuration = ?1, updated_at = ?2 WHERE id = ?3",
            params![configuration, format_db_time(Utc::now()), id],
        )?;
        Ok(())
    }

    /// Delete a target along with its history and alert markers.
    pub fn delete_target(&self, id: i64) -> Result<(), DbError> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        tx.execute("DELETE FROM application_metric_values WHERE application_metric_id = ?1", params![id])?;
        tx.execute("DELETE FROM alerts_sent_daily WHERE application_metric_id = ?1", params![id])?;
        let deleted = tx.execute("DELETE FROM application_metrics WHERE id = ?1", params![id])?;
        tx.commit()?;
        if deleted == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    pub fn get_target(&self, id: i64) -> Result<Target, DbError> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("{} WHERE am.id = ?1", TARGET_SELECT),
            params![id],
            target_from_row,
        )
        .optional()?
        .ok_or(DbError::NotFound)
    }

    /// Names seeded into the metric type catalog.
    pub fn metric_type_names(&self) -> Result<Vec<String>, DbError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT name FROM metric_types ORDER BY id")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<SqlResult<Vec<String>>>()?;
        Ok(names)
    }

    /// Alert markers for a target, newest day first.
    pub fn alert_records(&self, target_id: i64) -> Result<Vec<AlertRecord>, DbError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT application_metric_id, alert_date, alert_reason, created_at
             FROM alerts_sent_daily WHERE application_metric_id = ?1 ORDER BY alert_date DESC",
        )?;
        let records = stmt
            .query_map(params![target_id], |row| {
                let date: String = row.get(1)?;
                let created: String = row.get(3)?;
                Ok(AlertRecord {
                    target_id: row.get(0)?,
                    alert_date: NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                        .unwrap_or_default(),
                    reason: row.get(2)?,
                    created_at: parse_db_time(&created).unwrap_or_else(Utc::now),
                })
            })?
            .collect::<SqlResult<Vec<_>>>()?;
        Ok(records)
    }
}

const TARGET_SELECT: &str = "SELECT am.id, am.application_id, mt.name, am.configuration, am.created_at, am.updated_at
     FROM application_metrics am
     JOIN metric_types mt ON mt.id = am.type_id";

fn target_from_row(row: &Row<'_>) -> SqlResult<Target> {
    let created: String = row.get(4)?;
    let updated: String = row.get(5)?;
    Ok(Target {
        id: row.get(0)?,
        application_id: row.get(1)?,
        metric_type: row.get(2)?,
        configuration: row.get(3)?,
        created_at: parse_db_time(&created).unwrap_or_else(Utc::now),
        updated_at: parse_db_time(&updated).unwrap_or_else(Utc::now),
    })
}

fn metric_type_id(conn: &Connection, name: &str) -> Result<i64, DbError> {
    conn.query_row(
        "SELECT id FROM metric_types WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| DbError::UnknownMetricType(name.to_string()))
}

impl Catalog for Store {
    fn list_targets(&self) -> Result<Vec<Target>, DbError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("{} ORDER BY am.id", TARGET_SELECT))?;
        let targets = stmt
            .query_map([], target_from_row)?
            .collect::<SqlResult<Vec<_>>>()?;
        Ok(targets)
    }

    fn get_application(&self, id: i64) -> Result<Application, DbError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, project_id, name, namespace FROM applications WHERE id = ?1",
            params![id],
            |row| {
                Ok(Application {
                    id: row.get(0)?,
                    project_id: row.get(1)?,
                    name: row.get(2)?,
                    namespace: row.get(3)?,
                })
            },
        )
        .optional()?
        .ok_or(DbError::NotFound)
    }

    fn get_project(&self, id: i64) -> Result<Project, DbError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, name FROM projects WHERE id = ?1",
            params![id],
            |row| {
                Ok(Project {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )
        .optional()?
        .ok_or(DbError::NotFound)
    }
}

impl HistoryStore for Store {
    fn append_history(&self, target_id: i64, value: &MetricValue) -> Result<i64, DbError> {
        let json = value.to_json()?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO application_metric_values (application_metric_id, value, created_at) VALUES (?1, ?2, ?3)",
            params![target_id, json, format_db_time(Utc::now())],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn list_recent_history(
        &self,
        target_id: i64,
        limit: usize,
    ) -> Result<Vec<HistoryRecord>, DbError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, application_metric_id, value, created_at
             FROM application_metric_values
             WHERE application_metric_id = ?1
             ORDER BY id DESC LIMIT ?2",
        )?;
        let records = stmt
            .query_map(params![target_id, limit as i64], |row| {
                let created: String = row.get(3)?;
                Ok(HistoryRecord {
                    id: row.get(0)?,
                    target_id: row.get(1)?,
                    value: row.get(2)?,
                    created_at: parse_db_time(&created).unwrap_or_else(Utc::now),
                })
            })?
            .collect::<SqlResult<Vec<_>>>()?;
        Ok(records)
    }

    fn delete_history_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, DbError> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM application_metric_values WHERE created_at < ?1",
            params![format_db_time(cutoff)],
        )?;
        Ok(deleted)
    }
}

impl DedupStore for Store {
    fn has_alerted_within(&self, target_id: i64, window: chrono::Duration) -> Result<bool, DbError> {
        let cutoff = Utc::now() - window;
        let conn = self.conn()?;
        let recent: bool = conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM alerts_sent_daily
                WHERE application_metric_id = ?1 AND created_at >= ?2
             )",
            params![target_id, format_db_time(cutoff)],
            |row| row.get(0),
        )?;
        Ok(recent)
    }

    fn mark_alerted(&self, target_id: i64, day: NaiveDate, reason: &str) -> Result<(), DbError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO alerts_sent_daily (application_metric_id, alert_date, alert_reason, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(application_metric_id, alert_date) DO UPDATE SET
             created_at=excluded.created_at, alert_reason=excluded.alert_reason",
            params![
                target_id,
                day.format("%Y-%m-%d").to_string(),
                reason,
                format_db_time(Utc::now()),
            ],
        )?;
        Ok(())
    }
}

fn format_db_time(t: DateTime<Utc>) -> String {
    t.format(DB_TIME_FORMAT).to_string()
}

/// Inverse of [`format_db_time`]; every timestamp column is written through it.
fn parse_db_time(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, DB_TIME_FORMAT)
        .ok()
        .map(|dt| dt.and_utc())
}
