use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use dayplan::dag::ScheduledNode;
use dayplan::engine::{NodeOutcome, RuntimeEvent};
use dayplan::errors::Result;
use dayplan::exec::ExecutorBackend;
use dayplan::types::Day;
use tokio::sync::mpsc;

/// A fake executor that:
/// - records which days were "run", in dispatch order
/// - immediately reports NodeFinished for each scheduled node, failing the
///   days in `failing`.
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<Day>>>,
    failing: HashSet<Day>,
}

impl FakeExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, executed: Arc<Mutex<Vec<Day>>>) -> Self {
        Self {
            runtime_tx,
            executed,
            failing: HashSet::new(),
        }
    }

    pub fn failing(mut self, days: &[Day]) -> Self {
        self.failing.extend(days.iter().copied());
        self
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_nodes(
        &mut self,
        nodes: Vec<ScheduledNode>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let failing = self.failing.clone();

        Box::pin(async move {
            for n in nodes {
                {
                    let mut guard = executed.lock().unwrap();
                    guard.push(n.day);
                }

                let outcome = if failing.contains(&n.day) {
                    NodeOutcome::Failed
                } else {
                    NodeOutcome::Success
                };

                tx.send(RuntimeEvent::NodeFinished {
                    day: n.day,
                    outcome,
                })
                .await
                .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}
