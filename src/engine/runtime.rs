// src/engine/runtime.rs

use std::fmt;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::dag::ScheduledNode;
use crate::errors::Result;
use crate::exec::ExecutorBackend;
use crate::status::StatusSnapshot;
use crate::types::RunPhase;

use super::core::CoreRuntime;
use super::{CoreCommand, RunSummary, RuntimeEvent};

/// Async shell around [`CoreRuntime`].
///
/// Reads events from the channel, feeds them to the core, hands dispatched
/// nodes to the [`ExecutorBackend`] and publishes a status snapshot after
/// every step. This is the single task that mutates scheduling state.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    status_tx: watch::Sender<StatusSnapshot>,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(
        core: CoreRuntime,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        executor: E,
        status_tx: watch::Sender<StatusSnapshot>,
    ) -> Self {
        Self {
            core,
            event_rx,
            executor,
            status_tx,
        }
    }

    /// Main event loop. Returns when the run finishes, blocks, or is
    /// stopped.
    pub async fn run(mut self) -> Result<RunSummary> {
        info!("dayplan runtime started");

        let mut step = self.core.start();

        loop {
            self.publish();

            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                break;
            }

            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; stopping");
                    RuntimeEvent::StopRequested
                }
            };

            debug!(?event, "runtime received event");
            step = self.core.step(event);
        }

        self.publish();
        let summary = self.core.summary();
        info!(
            phase = %summary.phase,
            completed = summary.completed,
            failed = summary.failed,
            total = summary.total,
            abandoned = summary.abandoned,
            "runtime exiting"
        );
        Ok(summary)
    }

    fn publish(&self) {
        self.status_tx.send_replace(self.core.snapshot());
    }

    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::DispatchNodes(nodes) => self.dispatch(nodes).await,
            CoreCommand::RunEnded(phase) => {
                if phase == RunPhase::Stopped {
                    info!("run stopped; in-flight handlers are left to finish on their own");
                }
                Ok(())
            }
        }
    }

    async fn dispatch(&mut self, nodes: Vec<ScheduledNode>) -> Result<()> {
        if nodes.is_empty() {
            return Ok(());
        }

        let days: Vec<_> = nodes.iter().map(|n| n.day).collect();
        debug!(?days, "dispatching ready nodes");

        self.executor.spawn_ready_nodes(nodes).await
    }
}
