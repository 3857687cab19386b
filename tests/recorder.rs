// tests/recorder.rs

use std::collections::BTreeMap;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;

use dayplan::control::{Controller, RunSettings};
use dayplan::dag::ScheduledNode;
use dayplan::engine::{NodeOutcome, RuntimeEvent};
use dayplan::exec::task_runner::run_node;
use dayplan::exec::{Dispatcher, HandlerContext, HandlerRegistry, MetricMap, MetricValue, DEFAULT_ROLE};
use dayplan::plan::TaskNode;
use dayplan::record::{MemoryRecorder, Recorder, SqliteRecorder};
use dayplan::status::StatusCounts;
use dayplan::types::{FailurePolicy, RunPhase};
use dayplan_test_utils::builders::PlanBuilder;
use dayplan_test_utils::handlers::StaticHandler;
use dayplan_test_utils::recorders::FailingRecorder;
use dayplan_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn artifacts(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn exercise_lifecycle(recorder: &dyn Recorder) -> TestResult {
    let run = recorder.start_run(4)?;

    let in_flight = recorder.get_run(run)?.expect("run exists");
    assert_eq!(in_flight.day, 4);
    assert_eq!(in_flight.ok, None);
    assert!(in_flight.finished_at.is_none());

    let summary = artifacts(&[("artifact_url", "artifacts/day004_generic.txt")]);
    recorder.finish_run(run, true, &summary)?;

    let done = recorder.get_run(run)?.expect("run exists");
    assert_eq!(done.ok, Some(true));
    assert_eq!(done.artifacts, summary);
    assert!(done.finished_at.is_some_and(|f| f >= done.started_at));

    let failed = recorder.start_run(5)?;
    recorder.finish_run(failed, false, &artifacts(&[("error", "boom")]))?;
    assert_eq!(recorder.get_run(failed)?.and_then(|r| r.ok), Some(false));

    recorder.add_metric(4, "files_created", 1.0)?;
    recorder.add_metric(4, "sections", 2.0)?;
    let metrics = recorder.metrics_for_day(4)?;
    let keys: Vec<_> = metrics.iter().map(|m| (m.key.as_str(), m.value)).collect();
    assert_eq!(keys, vec![("files_created", 1.0), ("sections", 2.0)]);
    assert!(recorder.metrics_for_day(5)?.is_empty());

    assert_eq!(recorder.successful_days()?.into_iter().collect::<Vec<_>>(), vec![4]);
    assert!(recorder.get_run(9999)?.is_none());
    assert!(recorder.finish_run(9999, true, &BTreeMap::new()).is_err());
    Ok(())
}

#[test]
fn memory_recorder_round_trip() -> TestResult {
    exercise_lifecycle(&MemoryRecorder::new())
}

#[test]
fn sqlite_recorder_round_trip() -> TestResult {
    exercise_lifecycle(&SqliteRecorder::in_memory()?)
}

#[test]
fn sqlite_recorder_persists_across_reopen() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("nested").join("dayplan.db");

    {
        let rec = SqliteRecorder::open(&path)?;
        let id = rec.start_run(1)?;
        rec.finish_run(id, true, &artifacts(&[("note", "ok")]))?;
        rec.start_run(2)?;
    }

    let rec = SqliteRecorder::open(&path)?;
    let runs = rec.runs_for_day(1)?;
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].artifacts.get("note").map(String::as_str), Some("ok"));

    let pending = rec.runs_for_day(2)?;
    assert_eq!(pending[0].ok, None);

    let plan = PlanBuilder::new().chain(1, 3).build();
    let counts = StatusCounts::from_recorder(&rec, Some(&plan))?;
    assert_eq!((counts.total, counts.done, counts.open), (3, 1, 2));
    Ok(())
}

#[test]
fn recorded_status_ignores_days_outside_the_plan() -> TestResult {
    let rec = MemoryRecorder::new();
    for day in [1, 2, 40, 41] {
        let id = rec.start_run(day)?;
        rec.finish_run(id, true, &BTreeMap::new())?;
    }

    let plan = PlanBuilder::new().chain(1, 3).build();
    let counts = StatusCounts::from_recorder(&rec, Some(&plan))?;
    assert_eq!(counts.total, 3);
    assert_eq!(counts.completed, 2);
    assert_eq!(counts.open, 1);

    let unplanned = StatusCounts::from_recorder(&rec, None)?;
    assert_eq!((unplanned.total, unplanned.done, unplanned.open), (4, 4, 0));
    Ok(())
}

#[tokio::test]
async fn run_node_records_numbers_as_metrics_and_text_as_artifacts() -> TestResult {
    init_tracing();

    let mut metrics = MetricMap::new();
    metrics.insert("files_created".into(), MetricValue::Number(1.0));
    metrics.insert("bytes".into(), MetricValue::from(128usize));
    metrics.insert("artifact_url".into(), MetricValue::from("s3://bucket/day007.txt"));
    metrics.insert("ratio".into(), MetricValue::Number(f64::NAN));

    let mut registry = HandlerRegistry::new();
    registry.register(DEFAULT_ROLE, Arc::new(StaticHandler::new(metrics)));
    let dispatcher = Arc::new(Dispatcher::new(registry, HandlerContext::new("unused")));

    let recorder = Arc::new(MemoryRecorder::new());
    let (tx, mut rx) = mpsc::channel(4);

    let scheduled = ScheduledNode {
        day: 7,
        node: Arc::new(TaskNode::new(7, "whatever")),
    };
    run_node(scheduled, dispatcher, Arc::clone(&recorder) as Arc<dyn Recorder>, tx).await;

    match rx.recv().await {
        Some(RuntimeEvent::NodeFinished { day, outcome }) => {
            assert_eq!(day, 7);
            assert_eq!(outcome, NodeOutcome::Success);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    let stored: Vec<_> = recorder
        .metrics_for_day(7)?
        .into_iter()
        .map(|m| (m.key, m.value))
        .collect();
    assert_eq!(
        stored,
        vec![("bytes".to_string(), 128.0), ("files_created".to_string(), 1.0)]
    );

    let run = recorder.runs_for_day(7)?.pop().expect("run for day 7");
    assert_eq!(run.ok, Some(true));
    assert_eq!(
        run.artifacts.get("artifact_url").map(String::as_str),
        Some("s3://bucket/day007.txt")
    );
    assert!(!run.artifacts.contains_key("ratio"));
    Ok(())
}

#[tokio::test]
async fn run_node_survives_closed_coordinator() -> TestResult {
    let registry = HandlerRegistry::with_builtin();
    let dir = tempfile::tempdir()?;
    let dispatcher = Arc::new(Dispatcher::new(registry, HandlerContext::new(dir.path())));
    let recorder = Arc::new(MemoryRecorder::new());

    let (tx, rx) = mpsc::channel(1);
    drop(rx);

    let scheduled = ScheduledNode {
        day: 1,
        node: Arc::new(TaskNode::new(1, "generic")),
    };
    run_node(scheduled, dispatcher, Arc::clone(&recorder) as Arc<dyn Recorder>, tx).await;

    assert_eq!(recorder.runs()?.len(), 1);
    assert_eq!(recorder.runs()?[0].ok, Some(true));
    Ok(())
}

fn controller_over(recorder: Arc<FailingRecorder>) -> Controller {
    let mut metrics = MetricMap::new();
    metrics.insert("files_created".into(), MetricValue::Number(1.0));
    metrics.insert("artifact_url".into(), MetricValue::from("file://out.txt"));

    let mut registry = HandlerRegistry::new();
    registry.register(DEFAULT_ROLE, Arc::new(StaticHandler::new(metrics)));
    let dispatcher = Dispatcher::new(registry, HandlerContext::new("unused"));

    let settings = RunSettings {
        plan_path: PathBuf::from("unused.csv"),
        concurrency: 2,
        failure_policy: FailurePolicy::default(),
        detect_cycles: false,
    };
    Controller::new(settings, Arc::new(dispatcher), recorder as Arc<dyn Recorder>)
}

#[tokio::test]
async fn run_completes_when_every_recorder_call_fails() -> TestResult {
    init_tracing();

    let recorder = Arc::new(FailingRecorder::new());
    let ctl = controller_over(Arc::clone(&recorder));

    let summary = with_timeout(ctl.run_plan(PlanBuilder::new().chain(1, 3).build())).await?;

    assert_eq!(summary.phase, RunPhase::Finished);
    assert_eq!((summary.completed, summary.failed), (3, 0));
    assert_eq!(recorder.start_calls(), 3);
    assert_eq!(recorder.metric_calls(), 3);
    // No run id was handed out, so there is nothing to finish.
    assert_eq!(recorder.finish_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn run_completes_when_metric_and_finish_writes_fail() -> TestResult {
    init_tracing();

    let recorder = Arc::new(FailingRecorder::writes_only());
    let ctl = controller_over(Arc::clone(&recorder));

    let summary = with_timeout(ctl.run_plan(PlanBuilder::new().chain(1, 3).build())).await?;

    assert_eq!(summary.phase, RunPhase::Finished);
    assert_eq!(summary.completed, 3);
    assert_eq!(recorder.start_calls(), 3);
    assert_eq!(recorder.metric_calls(), 3);
    assert_eq!(recorder.finish_calls(), 3);
    Ok(())
}
