// src/exec/task_runner.rs

//! Runs a single dispatched node end to end.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::dag::ScheduledNode;
use crate::engine::{NodeOutcome, RuntimeEvent};
use crate::errors::{DayplanError, Result};
use crate::exec::dispatcher::{DispatchResult, Dispatcher};
use crate::exec::handler::MetricValue;
use crate::record::{Recorder, RunId};
use crate::types::Day;

/// Run one node:
///
/// 1. `start_run` on the recorder,
/// 2. dispatch to the node's handler,
/// 3. record numeric metrics and finish the run with the text entries as
///    its artifact summary,
/// 4. report `NodeFinished` to the coordinator.
///
/// Recorder calls run on the blocking pool, off the async workers.
/// Recorder failures are logged and swallowed. If the coordinator has
/// already stopped, the completion event is dropped.
pub async fn run_node(
    scheduled: ScheduledNode,
    dispatcher: Arc<Dispatcher>,
    recorder: Arc<dyn Recorder>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    let day = scheduled.day;

    let run_id = match blocking(&recorder, move |rec| rec.start_run(day)).await {
        Ok(id) => Some(id),
        Err(err) => {
            warn!(day, error = %err, "failed to record run start");
            None
        }
    };

    let result = dispatcher.dispatch(scheduled.node).await;
    let ok = result.ok;

    info!(day, ok, ?run_id, "node handler returned");

    let recorded = blocking(&recorder, move |rec| {
        record_result(rec, day, run_id, &result);
        Ok(())
    })
    .await;
    if let Err(err) = recorded {
        warn!(day, error = %err, "failed to record run result");
    }

    if runtime_tx
        .send(RuntimeEvent::NodeFinished {
            day,
            outcome: NodeOutcome::from_ok(ok),
        })
        .await
        .is_err()
    {
        debug!(day, "coordinator gone; dropping completion");
    }
}

async fn blocking<T, F>(recorder: &Arc<dyn Recorder>, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn Recorder) -> Result<T> + Send + 'static,
{
    let recorder = Arc::clone(recorder);
    tokio::task::spawn_blocking(move || f(recorder.as_ref()))
        .await
        .map_err(|e| DayplanError::Recorder(format!("recorder task failed: {e}")))?
}

fn record_result(
    recorder: &dyn Recorder,
    day: Day,
    run_id: Option<RunId>,
    result: &DispatchResult,
) {
    let mut artifacts = BTreeMap::new();

    for (key, value) in &result.metrics {
        match value {
            MetricValue::Number(n) if n.is_finite() => {
                if let Err(err) = recorder.add_metric(day, key, *n) {
                    warn!(day, key = %key, error = %err, "failed to record metric");
                }
            }
            MetricValue::Number(n) => {
                debug!(day, key = %key, value = %n, "dropping non-finite metric");
            }
            MetricValue::Text(text) => {
                artifacts.insert(key.clone(), text.clone());
            }
        }
    }

    if let Some(run_id) = run_id {
        if let Err(err) = recorder.finish_run(run_id, result.ok, &artifacts) {
            warn!(day, run_id, error = %err, "failed to record run finish");
        }
    }
}
