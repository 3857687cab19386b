// src/status.rs

//! Best-effort progress snapshots for external polling.
//!
//! The coordinator publishes a [`StatusSnapshot`] after every step through a
//! `tokio::sync::watch` channel; readers never block it and never see an
//! error.

use serde::Serialize;
use tokio::sync::watch;

use crate::errors::Result;
use crate::plan::Plan;
use crate::record::Recorder;
use crate::types::RunPhase;

/// Node counts at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: usize,
    /// Terminal nodes: `completed + failed`.
    pub done: usize,
    pub completed: usize,
    pub failed: usize,
    pub running: usize,
    /// `total - done`.
    pub open: usize,
}

impl StatusCounts {
    /// Counts derived from the recorder when no run is held in-process:
    /// every day with a successful run counts as done.
    ///
    /// With a plan, only its days count and `total` is the plan size, so
    /// stale days from older plans in the same database are ignored.
    /// Without one, `total` is the number of successful days.
    pub fn from_recorder(recorder: &dyn Recorder, plan: Option<&Plan>) -> Result<Self> {
        let successful = recorder.successful_days()?;

        let (total, completed) = match plan {
            Some(plan) => (
                plan.len(),
                successful.iter().filter(|&&day| plan.contains(day)).count(),
            ),
            None => (successful.len(), successful.len()),
        };

        Ok(StatusCounts {
            total,
            done: completed,
            completed,
            failed: 0,
            running: 0,
            open: total - completed,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub phase: RunPhase,
    #[serde(flatten)]
    pub counts: StatusCounts,
}

/// Read side of the status channel.
#[derive(Debug, Clone)]
pub struct StatusReporter {
    rx: watch::Receiver<StatusSnapshot>,
}

impl StatusReporter {
    /// Create a publisher/reporter pair seeded with `initial`.
    pub fn channel(initial: StatusSnapshot) -> (watch::Sender<StatusSnapshot>, StatusReporter) {
        let (tx, rx) = watch::channel(initial);
        (tx, StatusReporter { rx })
    }

    /// Last published snapshot.
    pub fn status(&self) -> StatusSnapshot {
        *self.rx.borrow()
    }

    /// Wait until the published phase is terminal and return that snapshot.
    ///
    /// If the publisher is dropped first, the last known snapshot is
    /// returned.
    pub async fn wait_terminal(&mut self) -> StatusSnapshot {
        let terminal = self
            .rx
            .wait_for(|s| s.phase.is_terminal())
            .await
            .map(|snapshot| *snapshot);

        match terminal {
            Ok(snapshot) => snapshot,
            Err(_) => *self.rx.borrow(),
        }
    }
}
