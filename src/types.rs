// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Day number identifying a node in the plan.
pub type Day = u32;

/// What happens to the dependents of a node whose handler failed.
///
/// - `UnlockChildren` (default): the failed node is terminal and unlocks its
///   children like a successful one; its own status stays `Failed`.
/// - `HaltDependents`: every transitive dependent of the failed node is
///   marked `Failed` without being dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    #[default]
    UnlockChildren,
    HaltDependents,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "unlock_children" | "unlock" => Ok(FailurePolicy::UnlockChildren),
            "halt_dependents" | "halt" => Ok(FailurePolicy::HaltDependents),
            other => Err(format!(
                "invalid failure_policy: {other} (expected \"unlock_children\" or \"halt_dependents\")"
            )),
        }
    }
}

/// Coarse lifecycle of a scheduling run, as seen by status pollers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    /// No run has been started.
    #[default]
    Idle,
    Running,
    /// Every node reached a terminal state.
    Finished,
    /// Nothing is running or ready, but some nodes never became eligible.
    Blocked,
    /// A stop request ended the run early.
    ///
    /// Handlers already running keep going and their runs are still
    /// recorded, but the scheduler no longer tracks them: the final
    /// snapshot leaves them under `running` and the summary counts them
    /// as `abandoned`.
    Stopped,
}

impl RunPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunPhase::Finished | RunPhase::Blocked | RunPhase::Stopped
        )
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunPhase::Idle => "idle",
            RunPhase::Running => "running",
            RunPhase::Finished => "finished",
            RunPhase::Blocked => "blocked",
            RunPhase::Stopped => "stopped",
        };
        f.write_str(s)
    }
}
