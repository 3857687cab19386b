// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! [`CoreRuntime`] consumes [`RuntimeEvent`]s and returns commands for the
//! IO shell. It owns the scheduler and enforces the concurrency cap: at
//! most `concurrency` nodes are ever `Running`.
//!
//! It has no channels and performs no IO, so it can be stepped by hand in
//! tests.

use tracing::{debug, info, warn};

use crate::dag::{ScheduledNode, Scheduler};
use crate::engine::{RunSummary, RuntimeEvent};
use crate::status::StatusSnapshot;
use crate::types::RunPhase;

/// Command produced by the core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Hand these nodes to the executor.
    DispatchNodes(Vec<ScheduledNode>),
    /// The run is over with the given phase.
    RunEnded(RunPhase),
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer loop should keep receiving events.
    pub keep_running: bool,
}

#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    concurrency: usize,
    phase: RunPhase,
}

impl CoreRuntime {
    /// `concurrency` is clamped to at least 1.
    pub fn new(scheduler: Scheduler, concurrency: usize) -> Self {
        Self {
            scheduler,
            concurrency: concurrency.max(1),
            phase: RunPhase::Idle,
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            phase: self.phase,
            counts: self.scheduler.counts(),
        }
    }

    pub fn summary(&self) -> RunSummary {
        let counts = self.scheduler.counts();
        RunSummary {
            phase: self.phase,
            total: counts.total,
            completed: counts.completed,
            failed: counts.failed,
            abandoned: counts.running,
        }
    }

    /// Begin the run: dispatch the first wave of ready nodes.
    pub fn start(&mut self) -> CoreStep {
        if self.phase != RunPhase::Idle {
            warn!(phase = %self.phase, "start called twice; ignoring");
            return CoreStep {
                commands: Vec::new(),
                keep_running: !self.phase.is_terminal(),
            };
        }

        info!(
            total = self.scheduler.total(),
            concurrency = self.concurrency,
            "starting run"
        );
        self.phase = RunPhase::Running;
        self.advance(Vec::new())
    }

    /// Handle a single event.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        if self.phase.is_terminal() {
            debug!(?event, phase = %self.phase, "event after run ended; ignoring");
            return CoreStep {
                commands: Vec::new(),
                keep_running: false,
            };
        }

        match event {
            RuntimeEvent::NodeFinished { day, outcome } => {
                let step = self.scheduler.complete(day, outcome);
                debug!(
                    day,
                    ?outcome,
                    newly_ready = ?step.newly_ready,
                    newly_failed = ?step.newly_failed,
                    "node finished"
                );
                self.advance(Vec::new())
            }
            RuntimeEvent::StopRequested => {
                let counts = self.scheduler.counts();
                info!(
                    running = counts.running,
                    done = counts.done,
                    total = counts.total,
                    "stop requested; no further nodes will be dispatched"
                );
                self.phase = RunPhase::Stopped;
                CoreStep {
                    commands: vec![CoreCommand::RunEnded(RunPhase::Stopped)],
                    keep_running: false,
                }
            }
        }
    }

    /// Fill free worker slots, then check for the end of the run.
    fn advance(&mut self, mut commands: Vec<CoreCommand>) -> CoreStep {
        let free = self
            .concurrency
            .saturating_sub(self.scheduler.running_count());

        if free > 0 {
            let nodes = self.scheduler.take_ready(free);
            if !nodes.is_empty() {
                commands.push(CoreCommand::DispatchNodes(nodes));
            }
        }

        if !self.scheduler.is_quiescent() {
            return CoreStep {
                commands,
                keep_running: true,
            };
        }

        let phase = if self.scheduler.all_terminal() {
            RunPhase::Finished
        } else {
            RunPhase::Blocked
        };

        let counts = self.scheduler.counts();
        if phase == RunPhase::Blocked {
            warn!(
                open = counts.open,
                done = counts.done,
                total = counts.total,
                "run blocked: remaining nodes have unresolved dependencies"
            );
        } else {
            info!(
                completed = counts.completed,
                failed = counts.failed,
                total = counts.total,
                "run finished"
            );
        }

        self.phase = phase;
        commands.push(CoreCommand::RunEnded(phase));
        CoreStep {
            commands,
            keep_running: false,
        }
    }
}
