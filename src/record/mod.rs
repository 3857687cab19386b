// src/record/mod.rs

//! Run/metric recording.
//!
//! The scheduler only needs the three write operations of [`Recorder`];
//! the read operations exist for status reporting and tests. Backends:
//!
//! - [`sqlite`]: embedded relational store (`run` and `metric` tables).
//! - [`memory`]: in-process store, useful for tests and dry runs.

pub mod memory;
pub mod sqlite;

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::Result;
use crate::types::Day;

pub use memory::MemoryRecorder;
pub use sqlite::SqliteRecorder;

/// Identifier assigned by the recorder to a run.
pub type RunId = i64;

/// One execution attempt of a node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRecord {
    pub id: RunId,
    pub day: Day,
    /// `None` while the run is in flight.
    pub ok: Option<bool>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub artifacts: BTreeMap<String, String>,
}

/// A single numeric metric emitted by a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRecord {
    pub id: i64,
    pub day: Day,
    pub key: String,
    pub value: f64,
    pub ts: DateTime<Utc>,
}

/// Persistence collaborator tracking the run/metric lifecycle.
///
/// Implementations must be usable from many handler tasks at once.
pub trait Recorder: Send + Sync {
    fn start_run(&self, day: Day) -> Result<RunId>;

    fn finish_run(&self, run_id: RunId, ok: bool, artifacts: &BTreeMap<String, String>)
        -> Result<()>;

    fn add_metric(&self, day: Day, key: &str, value: f64) -> Result<()>;

    fn get_run(&self, run_id: RunId) -> Result<Option<RunRecord>>;

    /// Runs for `day`, oldest first.
    fn runs_for_day(&self, day: Day) -> Result<Vec<RunRecord>>;

    /// Metrics for `day`, oldest first.
    fn metrics_for_day(&self, day: Day) -> Result<Vec<MetricRecord>>;

    /// Days with at least one successful run.
    fn successful_days(&self) -> Result<BTreeSet<Day>>;
}
