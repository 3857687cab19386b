#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use dayplan::exec::{Handler, HandlerContext, HandlerFuture, MetricMap, MetricValue};
use dayplan::plan::TaskNode;
use dayplan::types::Day;

/// Shared observations from a [`TrackingHandler`].
#[derive(Debug, Default)]
pub struct Tracker {
    started: Mutex<Vec<Day>>,
    finished: Mutex<Vec<Day>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Tracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Days in the order their handlers started.
    pub fn started(&self) -> Vec<Day> {
        self.started.lock().unwrap().clone()
    }

    /// Days in the order their handlers returned.
    pub fn finished(&self) -> Vec<Day> {
        self.finished.lock().unwrap().clone()
    }

    /// Highest number of handlers observed running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn position(&self, day: Day) -> Option<usize> {
        self.started().iter().position(|&d| d == day)
    }

    /// Currently running handlers.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn enter(&self, day: Day) -> InFlight<'_> {
        self.started.lock().unwrap().push(day);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlight { tracker: self }
    }

    fn finish(&self, day: Day) {
        self.finished.lock().unwrap().push(day);
    }
}

/// Holds one in-flight slot; released on drop so aborted handlers count too.
struct InFlight<'a> {
    tracker: &'a Tracker,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.tracker.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Configurable handler that records what it ran.
///
/// Sleeps for `delay` (or a per-day override), then fails for days in
/// `failing`, panics for days in `panicking`, and otherwise returns a
/// `files_created` metric plus a text `artifact_url`.
pub struct TrackingHandler {
    tracker: Arc<Tracker>,
    delay: Duration,
    slow: Vec<(Day, Duration)>,
    failing: HashSet<Day>,
    panicking: HashSet<Day>,
}

impl TrackingHandler {
    pub fn new(tracker: Arc<Tracker>) -> Self {
        Self {
            tracker,
            delay: Duration::from_millis(5),
            slow: Vec::new(),
            failing: HashSet::new(),
            panicking: HashSet::new(),
        }
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn slow(mut self, day: Day, delay: Duration) -> Self {
        self.slow.push((day, delay));
        self
    }

    pub fn failing(mut self, days: &[Day]) -> Self {
        self.failing.extend(days.iter().copied());
        self
    }

    pub fn panicking(mut self, days: &[Day]) -> Self {
        self.panicking.extend(days.iter().copied());
        self
    }

    pub fn into_arc(self) -> Arc<dyn Handler> {
        Arc::new(self)
    }

    async fn execute(&self, day: Day) -> anyhow::Result<MetricMap> {
        let slot = self.tracker.enter(day);

        let delay = self
            .slow
            .iter()
            .find(|(d, _)| *d == day)
            .map(|(_, d)| *d)
            .unwrap_or(self.delay);
        tokio::time::sleep(delay).await;

        drop(slot);
        self.tracker.finish(day);

        if self.panicking.contains(&day) {
            panic!("scripted panic on day {day}");
        }
        if self.failing.contains(&day) {
            return Err(anyhow!("scripted failure on day {day}"));
        }

        let mut metrics = MetricMap::new();
        metrics.insert("files_created".into(), MetricValue::Number(1.0));
        metrics.insert(
            "artifact_url".into(),
            MetricValue::Text(format!("tracked://day/{day}")),
        );
        Ok(metrics)
    }
}

impl Handler for TrackingHandler {
    fn run<'a>(&'a self, node: &'a TaskNode, _ctx: &'a HandlerContext) -> HandlerFuture<'a> {
        Box::pin(self.execute(node.day))
    }
}

/// Handler returning a fixed metric map.
pub struct StaticHandler {
    metrics: MetricMap,
}

impl StaticHandler {
    pub fn new(metrics: MetricMap) -> Self {
        Self { metrics }
    }
}

impl Handler for StaticHandler {
    fn run<'a>(&'a self, _node: &'a TaskNode, _ctx: &'a HandlerContext) -> HandlerFuture<'a> {
        let metrics = self.metrics.clone();
        Box::pin(async move { Ok(metrics) })
    }
}
