// src/engine/mod.rs

//! Coordination engine.
//!
//! All scheduling state is owned by one coordinator. Handler tasks run in
//! parallel but only talk to it through [`RuntimeEvent`]s, so counters and
//! the ready queue are never mutated concurrently.
//!
//! The pure state machine lives in [`core`]; the async/IO shell that owns
//! the event channel is [`runtime`].

use serde::Serialize;

use crate::types::{Day, RunPhase};

/// Outcome of a dispatched node, as far as scheduling is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOutcome {
    Success,
    Failed,
}

impl NodeOutcome {
    pub fn from_ok(ok: bool) -> Self {
        if ok {
            NodeOutcome::Success
        } else {
            NodeOutcome::Failed
        }
    }
}

/// Events flowing into the coordinator.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A handler returned (or failed) for this node.
    NodeFinished { day: Day, outcome: NodeOutcome },
    /// Cooperative shutdown requested (e.g. Ctrl-C or `Controller::stop`).
    StopRequested,
}

/// Final result of one scheduling run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub phase: RunPhase,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    /// Nodes still in flight when the run ended; only non-zero for
    /// [`RunPhase::Stopped`].
    pub abandoned: usize,
}

pub mod core;
pub mod runtime;

pub use self::core::{CoreCommand, CoreRuntime, CoreStep};
pub use runtime::Runtime;
