#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use dayplan::errors::{DayplanError, Result};
use dayplan::record::{MetricRecord, Recorder, RunId, RunRecord};
use dayplan::types::Day;

/// Recorder whose writes fail, counting how often each one was called.
///
/// By default every call fails. With [`FailingRecorder::writes_only`],
/// `start_run` succeeds and only `add_metric` and `finish_run` fail.
#[derive(Debug, Default)]
pub struct FailingRecorder {
    start_ok: bool,
    next_id: AtomicUsize,
    start_calls: AtomicUsize,
    metric_calls: AtomicUsize,
    finish_calls: AtomicUsize,
}

impl FailingRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes_only() -> Self {
        Self {
            start_ok: true,
            ..Self::default()
        }
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn metric_calls(&self) -> usize {
        self.metric_calls.load(Ordering::SeqCst)
    }

    pub fn finish_calls(&self) -> usize {
        self.finish_calls.load(Ordering::SeqCst)
    }

    fn unavailable(op: &str) -> DayplanError {
        DayplanError::Recorder(format!("{op}: store unavailable"))
    }
}

impl Recorder for FailingRecorder {
    fn start_run(&self, _day: Day) -> Result<RunId> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        if self.start_ok {
            Ok(self.next_id.fetch_add(1, Ordering::SeqCst) as RunId + 1)
        } else {
            Err(Self::unavailable("start_run"))
        }
    }

    fn finish_run(
        &self,
        _run_id: RunId,
        _ok: bool,
        _artifacts: &BTreeMap<String, String>,
    ) -> Result<()> {
        self.finish_calls.fetch_add(1, Ordering::SeqCst);
        Err(Self::unavailable("finish_run"))
    }

    fn add_metric(&self, _day: Day, _key: &str, _value: f64) -> Result<()> {
        self.metric_calls.fetch_add(1, Ordering::SeqCst);
        Err(Self::unavailable("add_metric"))
    }

    fn get_run(&self, _run_id: RunId) -> Result<Option<RunRecord>> {
        Err(Self::unavailable("get_run"))
    }

    fn runs_for_day(&self, _day: Day) -> Result<Vec<RunRecord>> {
        Err(Self::unavailable("runs_for_day"))
    }

    fn metrics_for_day(&self, _day: Day) -> Result<Vec<MetricRecord>> {
        Err(Self::unavailable("metrics_for_day"))
    }

    fn successful_days(&self) -> Result<BTreeSet<Day>> {
        Err(Self::unavailable("successful_days"))
    }
}
