// src/control.rs

//! Control surface over the scheduler: `start`, `status`, `stop`,
//! `wait` and the synchronous `run_once`.
//!
//! A [`Controller`] is built once per process with its dispatcher and
//! recorder and passed around explicitly; it holds at most one active run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ConfigSection;
use crate::dag::Scheduler;
use crate::engine::{CoreRuntime, RunSummary, Runtime, RuntimeEvent};
use crate::errors::{DayplanError, Result};
use crate::exec::{Dispatcher, HandlerBackend};
use crate::plan::{self, Plan};
use crate::record::Recorder;
use crate::status::{StatusReporter, StatusSnapshot};
use crate::types::FailurePolicy;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Per-run settings the controller needs from configuration.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub plan_path: PathBuf,
    pub concurrency: usize,
    pub failure_policy: FailurePolicy,
    pub detect_cycles: bool,
}

impl From<&ConfigSection> for RunSettings {
    fn from(cfg: &ConfigSection) -> Self {
        Self {
            plan_path: cfg.plan.clone(),
            concurrency: cfg.concurrency,
            failure_policy: cfg.failure_policy,
            detect_cycles: cfg.detect_cycles,
        }
    }
}

/// Cloneable handle that requests a cooperative stop of a run.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: mpsc::Sender<RuntimeEvent>,
}

impl StopHandle {
    /// Request shutdown. Returns `false` if the run already ended.
    pub async fn stop(&self) -> bool {
        self.tx.send(RuntimeEvent::StopRequested).await.is_ok()
    }
}

struct ActiveRun {
    stop: StopHandle,
    status: StatusReporter,
    handle: Option<JoinHandle<Result<RunSummary>>>,
}

pub struct Controller {
    settings: RunSettings,
    dispatcher: Arc<Dispatcher>,
    recorder: Arc<dyn Recorder>,
    active: Option<ActiveRun>,
}

impl Controller {
    pub fn new(
        settings: RunSettings,
        dispatcher: Arc<Dispatcher>,
        recorder: Arc<dyn Recorder>,
    ) -> Self {
        Self {
            settings,
            dispatcher,
            recorder,
            active: None,
        }
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    pub fn recorder(&self) -> &Arc<dyn Recorder> {
        &self.recorder
    }

    /// Load the configured plan and start the scheduling loop in the
    /// background. Returns as soon as the loop is spawned.
    ///
    /// A run already in progress is asked to stop and is replaced.
    pub async fn start(&mut self, concurrency: usize) -> Result<()> {
        let plan = plan::load(&self.settings.plan_path)?;
        self.start_plan(plan, concurrency).await
    }

    /// Like [`Controller::start`], with an already loaded plan.
    pub async fn start_plan(&mut self, plan: Plan, concurrency: usize) -> Result<()> {
        let scheduler = self.prepare(&plan)?;

        if let Some(previous) = self.active.take() {
            if !previous.status.status().phase.is_terminal() {
                warn!("replacing a run that is still in progress; requesting stop");
                previous.stop.stop().await;
            }
        }

        self.active = Some(self.spawn(scheduler, concurrency));
        Ok(())
    }

    /// Last known status. Idle with zero counts when nothing was started.
    pub fn status(&self) -> StatusSnapshot {
        self.active
            .as_ref()
            .map(|run| run.status.status())
            .unwrap_or_default()
    }

    /// Reporter for the active run, for callers that want to await changes.
    pub fn reporter(&self) -> Option<StatusReporter> {
        self.active.as_ref().map(|run| run.status.clone())
    }

    pub fn stop_handle(&self) -> Option<StopHandle> {
        self.active.as_ref().map(|run| run.stop.clone())
    }

    /// Request cooperative shutdown of the active run. Handlers already
    /// running are not interrupted.
    pub async fn stop(&self) {
        match &self.active {
            Some(run) => {
                if !run.stop.stop().await {
                    debug!("stop requested but run already ended");
                }
            }
            None => debug!("stop requested with no active run"),
        }
    }

    /// Wait for the active run to end and return its summary.
    pub async fn wait(&mut self) -> Result<RunSummary> {
        let handle = self
            .active
            .as_mut()
            .and_then(|run| run.handle.take())
            .ok_or_else(|| DayplanError::Other(anyhow!("no run in progress")))?;

        handle
            .await
            .map_err(|e| DayplanError::Other(anyhow!("scheduler task failed: {e}")))?
    }

    /// Load the plan at `path` and run it to completion.
    ///
    /// Each call is an independent attempt with fresh in-memory state and
    /// new run records.
    pub async fn run_once(&self, path: impl AsRef<Path>) -> Result<RunSummary> {
        let plan = plan::load(path)?;
        self.run_plan(plan).await
    }

    /// Run an already loaded plan to completion with the configured
    /// concurrency.
    pub async fn run_plan(&self, plan: Plan) -> Result<RunSummary> {
        let scheduler = self.prepare(&plan)?;
        let mut run = self.spawn(scheduler, self.settings.concurrency);

        let handle = run
            .handle
            .take()
            .ok_or_else(|| DayplanError::Other(anyhow!("run handle missing")))?;

        handle
            .await
            .map_err(|e| DayplanError::Other(anyhow!("scheduler task failed: {e}")))?
    }

    fn prepare(&self, plan: &Plan) -> Result<Scheduler> {
        let scheduler = Scheduler::from_plan(plan, self.settings.failure_policy);

        if self.settings.detect_cycles {
            if let Some(day) = scheduler.graph().find_cycle() {
                return Err(DayplanError::PlanCycle(day));
            }
        }

        Ok(scheduler)
    }

    fn spawn(&self, scheduler: Scheduler, concurrency: usize) -> ActiveRun {
        let core = CoreRuntime::new(scheduler, concurrency);
        let (status_tx, status) = StatusReporter::channel(core.snapshot());
        let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(EVENT_CHANNEL_CAPACITY);

        let executor = HandlerBackend::new(
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.recorder),
            rt_tx.clone(),
        );

        info!(concurrency = core.concurrency(), "spawning scheduler");
        let runtime = Runtime::new(core, rt_rx, executor, status_tx);
        let handle = tokio::spawn(runtime.run());

        ActiveRun {
            stop: StopHandle { tx: rt_tx },
            status,
            handle: Some(handle),
        }
    }
}
