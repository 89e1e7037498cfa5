//! SQLite-based session storage and statistics.
//!
//! One row per work interval. A row is created when the interval starts and
//! closed by setting `completed_at`; rows left open are either still running
//! or were abandoned by a process that went away.
//!
//! Timestamps are stored as RFC 3339 UTC strings with second precision, so
//! string comparison in SQL matches chronological order.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Local, SecondsFormat, TimeDelta, Timelike, Utc};
use indexmap::IndexMap;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{data_dir, migrations};
use crate::error::{DatabaseError, Result, ValidationError};

/// Number of hour-of-day buckets reported by [`SessionStore::aggregate`].
pub const TOP_HOURS: usize = 3;
/// Number of task buckets reported by [`SessionStore::aggregate`].
pub const TOP_TASKS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    pub task: String,
    /// Planned length of the work interval. Breaks are never recorded.
    pub duration_secs: u64,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
    pub fn is_open(&self) -> bool {
        self.completed_at.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountByHour {
    pub hour: u32,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountByTask {
    pub task: String,
    pub count: u64,
}

/// Summary statistics over a lookback window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SessionStats {
    pub since_days: u32,
    pub total_count: u64,
    pub completed_count: u64,
    pub incomplete_count: u64,
    /// Percentage of completed sessions, one decimal place.
    pub completion_rate: f64,
    pub total_completed_duration_secs: u64,
    pub focus_minutes: u64,
    /// Local hour of day, completed sessions only.
    pub counts_by_hour_of_day: Vec<CountByHour>,
    pub counts_by_task: Vec<CountByTask>,
}

/// Named lookback windows for statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StatsPeriod {
    Day,
    #[default]
    Week,
    Month,
    Year,
}

impl StatsPeriod {
    pub fn lookback_days(self) -> u32 {
        match self {
            StatsPeriod::Day => 1,
            StatsPeriod::Week => 7,
            StatsPeriod::Month => 30,
            StatsPeriod::Year => 365,
        }
    }
}

impl fmt::Display for StatsPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatsPeriod::Day => "day",
            StatsPeriod::Week => "week",
            StatsPeriod::Month => "month",
            StatsPeriod::Year => "year",
        };
        f.write_str(s)
    }
}

impl FromStr for StatsPeriod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "day" => Ok(StatsPeriod::Day),
            "week" => Ok(StatsPeriod::Week),
            "month" => Ok(StatsPeriod::Month),
            "year" => Ok(StatsPeriod::Year),
            other => Err(ValidationError::invalid(
                "period",
                format!("expected day, week, month or year, got '{other}'"),
            )),
        }
    }
}

/// Durable session log as seen by the coordinator.
///
/// The store does not enforce the single-open-session rule; callers check
/// [`SessionStore::current_open`] before calling [`SessionStore::create`].
pub trait SessionStore {
    /// Insert an open record started now. Returns the new id.
    fn create(&self, task: &str, duration_secs: u64) -> Result<i64>;

    /// Close a record. Returns `false` when the id is unknown or the record
    /// was already closed; the stored `completed_at` is left untouched then.
    fn complete(&self, id: i64) -> Result<bool>;

    /// The open record with the latest `started_at`, if any.
    fn current_open(&self) -> Result<Option<SessionRecord>>;

    /// Records started within the last `since_days`, newest first.
    fn history(&self, since_days: u32, limit: usize) -> Result<Vec<SessionRecord>>;

    fn aggregate(&self, since_days: u32) -> Result<SessionStats>;
}

/// SQLite database for session storage.
pub struct Database {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Database {
    /// Open the database at `<data_dir>/pomodoro.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable or the database
    /// cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("pomodoro.db");
        Self::open_at(path)
    }

    /// Open (or create) the database at an explicit path.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path).map_err(|source| DatabaseError::OpenFailed {
            path: path.clone(),
            source,
        })?;
        let db = Self {
            conn,
            path: Some(path),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    #[cfg(test)]
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn, path: None };
        db.migrate()?;
        Ok(db)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn migrate(&self) -> Result<()> {
        migrations::migrate(&self.conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(())
    }

    /// Insert a record with explicit timestamps.
    ///
    /// Used for imports and for seeding fixtures; regular runs go through
    /// [`SessionStore::create`].
    pub fn insert_at(
        &self,
        task: &str,
        duration_secs: u64,
        started_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO sessions (task, duration_secs, started_at, completed_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                task,
                duration_secs,
                format_ts(started_at),
                completed_at.map(format_ts),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Fetch a single record by id.
    pub fn get(&self, id: i64) -> Result<Option<SessionRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT id, task, duration_secs, started_at, completed_at
                 FROM sessions WHERE id = ?1",
                params![id],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    fn records_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<SessionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, task, duration_secs, started_at, completed_at
             FROM sessions
             WHERE started_at >= ?1
             ORDER BY started_at ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![format_ts(cutoff)], row_to_record)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}

impl SessionStore for Database {
    fn create(&self, task: &str, duration_secs: u64) -> Result<i64> {
        let id = self.insert_at(task, duration_secs, Utc::now(), None)?;
        debug!(id, task, duration_secs, "session record created");
        Ok(id)
    }

    fn complete(&self, id: i64) -> Result<bool> {
        // MAX keeps completed_at from landing before started_at on clock skew.
        let changed = self.conn.execute(
            "UPDATE sessions
             SET completed_at = MAX(?1, started_at)
             WHERE id = ?2 AND completed_at IS NULL",
            params![format_ts(Utc::now()), id],
        )?;
        if changed == 0 {
            warn!(id, "complete was a no-op: record unknown or already closed");
        } else {
            debug!(id, "session record completed");
        }
        Ok(changed > 0)
    }

    fn current_open(&self) -> Result<Option<SessionRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT id, task, duration_secs, started_at, completed_at
                 FROM sessions
                 WHERE completed_at IS NULL
                 ORDER BY started_at DESC, id DESC
                 LIMIT 1",
                [],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    fn history(&self, since_days: u32, limit: usize) -> Result<Vec<SessionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, task, duration_secs, started_at, completed_at
             FROM sessions
             WHERE started_at >= ?1
             ORDER BY started_at DESC, id DESC
             LIMIT ?2",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(
            params![format_ts(window_start(since_days)), limit],
            row_to_record,
        )?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    fn aggregate(&self, since_days: u32) -> Result<SessionStats> {
        let records = self.records_since(window_start(since_days))?;
        Ok(summarize(since_days, &records))
    }
}

/// Build statistics from records in scan order (oldest first).
///
/// Breakdowns keep first-encountered order among equal counts.
pub fn summarize(since_days: u32, records: &[SessionRecord]) -> SessionStats {
    let mut stats = SessionStats {
        since_days,
        ..SessionStats::default()
    };
    let mut hours: IndexMap<u32, u64> = IndexMap::new();
    let mut tasks: IndexMap<&str, u64> = IndexMap::new();

    for record in records {
        stats.total_count += 1;
        *tasks.entry(record.task.as_str()).or_default() += 1;
        if !record.is_open() {
            stats.completed_count += 1;
            stats.total_completed_duration_secs += record.duration_secs;
            // Whole minutes per record; partial minutes are not carried over.
            stats.focus_minutes += record.duration_secs / 60;
            let hour = record.started_at.with_timezone(&Local).hour();
            *hours.entry(hour).or_default() += 1;
        }
    }

    stats.incomplete_count = stats.total_count - stats.completed_count;
    stats.completion_rate = if stats.total_count == 0 {
        0.0
    } else {
        let pct = stats.completed_count as f64 / stats.total_count as f64 * 100.0;
        (pct * 10.0).round() / 10.0
    };

    stats.counts_by_hour_of_day = top_n(hours, TOP_HOURS)
        .into_iter()
        .map(|(hour, count)| CountByHour { hour, count })
        .collect();
    stats.counts_by_task = top_n(tasks, TOP_TASKS)
        .into_iter()
        .map(|(task, count)| CountByTask {
            task: task.to_string(),
            count,
        })
        .collect();
    stats
}

fn top_n<K>(counts: IndexMap<K, u64>, n: usize) -> Vec<(K, u64)> {
    let mut entries: Vec<(K, u64)> = counts.into_iter().collect();
    // Stable sort: equal counts stay in insertion order.
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    entries.truncate(n);
    entries
}

/// Start of the lookback window. Windows reaching past the representable
/// range cover everything.
fn window_start(since_days: u32) -> DateTime<Utc> {
    TimeDelta::try_days(i64::from(since_days))
        .and_then(|span| Utc::now().checked_sub_signed(span))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn format_ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<SessionRecord> {
    let started: String = row.get(3)?;
    let completed: Option<String> = row.get(4)?;
    Ok(SessionRecord {
        id: row.get(0)?,
        task: row.get(1)?,
        duration_secs: row.get(2)?,
        started_at: parse_ts(3, &started)?,
        completed_at: completed.map(|raw| parse_ts(4, &raw)).transpose()?,
    })
}
