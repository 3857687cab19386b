// src/record/memory.rs

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use chrono::Utc;

use crate::errors::{DayplanError, Result};
use crate::record::{MetricRecord, Recorder, RunId, RunRecord};
use crate::types::Day;

#[derive(Debug, Default)]
struct Inner {
    runs: Vec<RunRecord>,
    metrics: Vec<MetricRecord>,
}

/// Recorder that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    inner: Mutex<Inner>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// All runs recorded so far, in creation order.
    pub fn runs(&self) -> Result<Vec<RunRecord>> {
        Ok(self.lock()?.runs.clone())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|e| DayplanError::Recorder(e.to_string()))
    }
}

impl Recorder for MemoryRecorder {
    fn start_run(&self, day: Day) -> Result<RunId> {
        let mut inner = self.lock()?;
        let id = inner.runs.len() as RunId + 1;
        inner.runs.push(RunRecord {
            id,
            day,
            ok: None,
            started_at: Utc::now(),
            finished_at: None,
            artifacts: BTreeMap::new(),
        });
        Ok(id)
    }

    fn finish_run(
        &self,
        run_id: RunId,
        ok: bool,
        artifacts: &BTreeMap<String, String>,
    ) -> Result<()> {
        let mut inner = self.lock()?;
        let run = inner
            .runs
            .iter_mut()
            .find(|r| r.id == run_id)
            .ok_or_else(|| DayplanError::Recorder(format!("unknown run id {run_id}")))?;

        run.ok = Some(ok);
        run.finished_at = Some(Utc::now());
        run.artifacts = artifacts.clone();
        Ok(())
    }

    fn add_metric(&self, day: Day, key: &str, value: f64) -> Result<()> {
        let mut inner = self.lock()?;
        let id = inner.metrics.len() as i64 + 1;
        inner.metrics.push(MetricRecord {
            id,
            day,
            key: key.to_string(),
            value,
            ts: Utc::now(),
        });
        Ok(())
    }

    fn get_run(&self, run_id: RunId) -> Result<Option<RunRecord>> {
        Ok(self.lock()?.runs.iter().find(|r| r.id == run_id).cloned())
    }

    fn runs_for_day(&self, day: Day) -> Result<Vec<RunRecord>> {
        Ok(self
            .lock()?
            .runs
            .iter()
            .filter(|r| r.day == day)
            .cloned()
            .collect())
    }

    fn metrics_for_day(&self, day: Day) -> Result<Vec<MetricRecord>> {
        Ok(self
            .lock()?
            .metrics
            .iter()
            .filter(|m| m.day == day)
            .cloned()
            .collect())
    }

    fn successful_days(&self) -> Result<BTreeSet<Day>> {
        Ok(self
            .lock()?
            .runs
            .iter()
            .filter(|r| r.ok == Some(true))
            .map(|r| r.day)
            .collect())
    }
}
