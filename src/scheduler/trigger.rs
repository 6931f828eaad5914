//! Trigger specs: cron expressions, `@daily`-style descriptors and `@every`.

use chrono::{DateTime, Utc};
use cron::Schedule;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("invalid trigger spec {spec:?}: {reason}")]
    InvalidSpec { spec: String, reason: String },
}

fn invalid(spec: &str, reason: impl Into<String>) -> SchedulerError {
    SchedulerError::InvalidSpec {
        spec: spec.to_string(),
        reason: reason.into(),
    }
}

/// When a periodic job fires. Cron schedules are evaluated in UTC.
#[derive(Debug, Clone)]
pub enum Trigger {
    Every(Duration),
    Cron(Box<Schedule>),
}

impl Trigger {
    pub fn parse(spec: &str) -> Result<Self, SchedulerError> {
        let spec = spec.trim();
        if let Some(rest) = spec.strip_prefix("@every") {
            let period = parse_period(rest.trim()).ok_or_else(|| invalid(spec, "bad duration"))?;
            if period.is_zero() {
                return Err(invalid(spec, "duration must be positive"));
            }
            return Ok(Trigger::Every(period));
        }

        let expr = match spec {
            "@yearly" | "@annually" => "0 0 0 1 1 *".to_string(),
            "@monthly" => "0 0 0 1 * *".to_string(),
            "@weekly" => "0 0 0 * * Sun".to_string(),
            "@daily" | "@midnight" => "0 0 0 * * *".to_string(),
            "@hourly" => "0 0 * * * *".to_string(),
            other if other.starts_with('@') => return Err(invalid(spec, "unknown descriptor")),
            other => match other.split_whitespace().count() {
                // Classic five-field cron has no seconds column.
                5 => format!("0 {}", other),
                6 | 7 => other.to_string(),
                n => return Err(invalid(spec, format!("expected 5 to 7 fields, got {}", n))),
            },
        };

        let schedule = Schedule::from_str(&expr).map_err(|e| invalid(spec, e.to_string()))?;
        Ok(Trigger::Cron(Box::new(schedule)))
    }

    /// Next fire time strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Trigger::Every(period) => chrono::Duration::from_std(*period).ok().map(|d| now + d),
            Trigger::Cron(schedule) => schedule.after(&now).next(),
        }
    }

    /// How long to sleep from `now` until the next fire.
    pub fn delay_from(&self, now: DateTime<Utc>) -> Option<Duration> {
        let next = self.next_after(now)?;
        (next - now).to_std().ok()
    }
}

/// `90s`, `5m`, `1h30m`.
fn parse_period(s: &str) -> Option<Duration> {
    if s.is_empty() {
        return None;
    }
    let mut total = 0u64;
    let mut digits = String::new();
    for c in s.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let n: u64 = digits.parse().ok()?;
        digits.clear();
        let unit = match c {
            'h' => 3600,
            'm' => 60,
            's' => 1,
            _ => return None,
        };
        total = total.checked_add(n.checked_mul(unit)?)?;
    }
    if !digits.is_empty() {
        return None;
    }
    Some(Duration::from_secs(total))
}
