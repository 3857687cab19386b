// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of spawning handler
//! tasks itself. Production code uses [`HandlerBackend`]; tests can
//! provide a backend that records dispatches and emits `NodeFinished`
//! events directly.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::dag::ScheduledNode;
use crate::engine::RuntimeEvent;
use crate::errors::Result;
use crate::exec::dispatcher::Dispatcher;
use crate::exec::task_runner::run_node;
use crate::record::Recorder;

/// Trait abstracting how dispatched nodes are executed.
///
/// Implementations must not wait for the nodes to finish; completion is
/// reported later through `RuntimeEvent::NodeFinished`.
pub trait ExecutorBackend: Send {
    fn spawn_ready_nodes(
        &mut self,
        nodes: Vec<ScheduledNode>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Production backend: one Tokio task per node, running the handler via
/// the [`Dispatcher`] and recording through the [`Recorder`].
pub struct HandlerBackend {
    dispatcher: Arc<Dispatcher>,
    recorder: Arc<dyn Recorder>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl HandlerBackend {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        recorder: Arc<dyn Recorder>,
        runtime_tx: mpsc::Sender<RuntimeEvent>,
    ) -> Self {
        Self {
            dispatcher,
            recorder,
            runtime_tx,
        }
    }
}

impl ExecutorBackend for HandlerBackend {
    fn spawn_ready_nodes(
        &mut self,
        nodes: Vec<ScheduledNode>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for node in nodes {
                tokio::spawn(run_node(
                    node,
                    Arc::clone(&self.dispatcher),
                    Arc::clone(&self.recorder),
                    self.runtime_tx.clone(),
                ));
            }
            Ok(())
        })
    }
}
