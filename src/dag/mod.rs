// src/dag/mod.rs

//! Dependency graph and scheduling state.
//!
//! - [`graph`] holds parent/child adjacency and the remaining-dependency
//!   counters, with idempotent unlocks.
//! - [`ready_queue`] is the FIFO of nodes eligible to run.
//! - [`node_state`] defines per-node status and the dispatched node type.
//! - [`scheduler`] is the synchronous state machine that ties them
//!   together.
//! - [`scheduler_step`] defines the result type for completion steps.

pub mod graph;
pub mod node_state;
pub mod ready_queue;
pub mod scheduler;
pub mod scheduler_step;

pub use graph::DependencyGraph;
pub use node_state::{NodeStatus, ScheduledNode};
pub use ready_queue::ReadyQueue;
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
