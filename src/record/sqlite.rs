// src/record/sqlite.rs

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::errors::{DayplanError, Result};
use crate::record::{MetricRecord, Recorder, RunId, RunRecord};
use crate::types::Day;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS run (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    day INTEGER NOT NULL,
    ok INTEGER,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    artifacts TEXT NOT NULL DEFAULT '{}'
);
CREATE TABLE IF NOT EXISTS metric (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    day INTEGER NOT NULL,
    k TEXT NOT NULL,
    v REAL NOT NULL,
    ts TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_run_day ON run(day);
CREATE INDEX IF NOT EXISTS idx_metric_day ON metric(day);
";

const RUN_COLUMNS: &str = "id, day, ok, started_at, finished_at, artifacts";

/// Recorder backed by a single SQLite database.
///
/// `rusqlite::Connection` is `!Sync`, so it sits behind a `Mutex`.
#[derive(Debug)]
pub struct SqliteRecorder {
    conn: Mutex<Connection>,
}

impl SqliteRecorder {
    /// Open (or create) the database at `path` and ensure the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "opened sqlite recorder");
        Self::with_connection(conn)
    }

    /// In-memory database, mostly for tests.
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DayplanError::Recorder(e.to_string()))
    }
}

/// Raw row as stored; converted with [`raw_to_run`].
struct RawRunRow {
    id: i64,
    day: i64,
    ok: Option<i64>,
    started_at: String,
    finished_at: Option<String>,
    artifacts: String,
}

fn read_run_row(row: &Row<'_>) -> rusqlite::Result<RawRunRow> {
    Ok(RawRunRow {
        id: row.get(0)?,
        day: row.get(1)?,
        ok: row.get(2)?,
        started_at: row.get(3)?,
        finished_at: row.get(4)?,
        artifacts: row.get(5)?,
    })
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DayplanError::Recorder(format!("bad timestamp '{raw}': {e}")))
}

fn to_day(raw: i64) -> Result<Day> {
    Day::try_from(raw).map_err(|_| DayplanError::Recorder(format!("bad day value {raw}")))
}

fn raw_to_run(raw: RawRunRow) -> Result<RunRecord> {
    let artifacts: BTreeMap<String, String> = serde_json::from_str(&raw.artifacts)
        .map_err(|e| DayplanError::Recorder(format!("bad artifacts json: {e}")))?;

    Ok(RunRecord {
        id: raw.id,
        day: to_day(raw.day)?,
        ok: raw.ok.map(|v| v != 0),
        started_at: parse_ts(&raw.started_at)?,
        finished_at: raw.finished_at.as_deref().map(parse_ts).transpose()?,
        artifacts,
    })
}

impl Recorder for SqliteRecorder {
    fn start_run(&self, day: Day) -> Result<RunId> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO run (day, ok, started_at, finished_at, artifacts)
             VALUES (?1, NULL, ?2, NULL, '{}')",
            params![day, Utc::now().to_rfc3339()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn finish_run(
        &self,
        run_id: RunId,
        ok: bool,
        artifacts: &BTreeMap<String, String>,
    ) -> Result<()> {
        let artifacts = serde_json::to_string(artifacts)
            .map_err(|e| DayplanError::Recorder(e.to_string()))?;

        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE run SET ok = ?1, finished_at = ?2, artifacts = ?3 WHERE id = ?4",
            params![ok, Utc::now().to_rfc3339(), artifacts, run_id],
        )?;

        if updated == 0 {
            return Err(DayplanError::Recorder(format!("unknown run id {run_id}")));
        }
        Ok(())
    }

    fn add_metric(&self, day: Day, key: &str, value: f64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO metric (day, k, v, ts) VALUES (?1, ?2, ?3, ?4)",
            params![day, key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn get_run(&self, run_id: RunId) -> Result<Option<RunRecord>> {
        let conn = self.conn()?;
        let raw = conn
            .query_row(
                &format!("SELECT {RUN_COLUMNS} FROM run WHERE id = ?1"),
                params![run_id],
                read_run_row,
            )
            .optional()?;

        raw.map(raw_to_run).transpose()
    }

    fn runs_for_day(&self, day: Day) -> Result<Vec<RunRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RUN_COLUMNS} FROM run WHERE day = ?1 ORDER BY id ASC"
        ))?;

        let rows = stmt.query_map(params![day], read_run_row)?;

        let mut runs = Vec::new();
        for row in rows {
            runs.push(raw_to_run(row?)?);
        }
        Ok(runs)
    }

    fn metrics_for_day(&self, day: Day) -> Result<Vec<MetricRecord>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, day, k, v, ts FROM metric WHERE day = ?1 ORDER BY id ASC")?;

        let rows = stmt.query_map(params![day], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut metrics = Vec::new();
        for row in rows {
            let (id, day, key, value, ts) = row?;
            metrics.push(MetricRecord {
                id,
                day: to_day(day)?,
                key,
                value,
                ts: parse_ts(&ts)?,
            });
        }
        Ok(metrics)
    }

    fn successful_days(&self) -> Result<BTreeSet<Day>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT DISTINCT day FROM run WHERE ok = 1")?;
        let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;

        let mut days = BTreeSet::new();
        for row in rows {
            days.insert(to_day(row?)?);
        }
        Ok(days)
    }
}
