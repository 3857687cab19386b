// src/dag/scheduler_step.rs

use crate::types::Day;

/// Structured result of feeding one completion into the scheduler.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Nodes whose counter reached zero in this step and were queued.
    pub newly_ready: Vec<Day>,
    /// Nodes newly marked failed in this step: the completed node itself if
    /// it failed, plus any dependents halted by the failure policy.
    pub newly_failed: Vec<Day>,
}
