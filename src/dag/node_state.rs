// src/dag/node_state.rs

//! Per-node status and the dispatched node description.

use std::sync::Arc;

use crate::plan::TaskNode;
use crate::types::Day;

/// Lifecycle of a node within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    /// Waiting for dependencies, or ready but not yet dispatched.
    Pending,
    /// Handed to the executor; the handler has not returned yet.
    Running,
    Completed,
    /// Handler failed, or (with `HaltDependents`) an upstream node failed.
    Failed,
}

impl NodeStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, NodeStatus::Completed | NodeStatus::Failed)
    }
}

/// A node the scheduler wants the executor to run now.
#[derive(Debug, Clone)]
pub struct ScheduledNode {
    pub day: Day,
    pub node: Arc<TaskNode>,
}
