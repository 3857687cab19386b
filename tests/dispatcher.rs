// tests/dispatcher.rs

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;

use dayplan::behaviors::BUILTIN;
use dayplan::exec::handler::artifact_file_name;
use dayplan::exec::{
    normalize_role, Dispatcher, FnHandler, HandlerContext, HandlerRegistry, MetricMap,
    MetricValue, DEFAULT_ROLE,
};
use dayplan::plan::{Plan, TaskNode};
use dayplan_test_utils::handlers::{Tracker, TrackingHandler};
use dayplan_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn error_text(metrics: &MetricMap) -> String {
    match metrics.get("error") {
        Some(MetricValue::Text(s)) => s.clone(),
        other => panic!("expected error text, got {other:?}"),
    }
}

#[test]
fn role_normalization() {
    assert_eq!(normalize_role("Codex Herald"), "codex_herald");
    assert_eq!(normalize_role("  Lab   Warden "), "lab_warden");
    assert_eq!(normalize_role("Glyph-Envoy"), "glyph_envoy");
    assert_eq!(normalize_role("NODE_ENGINEER"), "node_engineer");
}

#[test]
fn registry_falls_back_to_generic() {
    let registry = HandlerRegistry::with_builtin();

    let (name, _) = registry.resolve("Codex Herald").expect("codex herald");
    assert_eq!(name, "codex_herald");

    let (name, _) = registry.resolve("Unknown Role").expect("fallback");
    assert_eq!(name, DEFAULT_ROLE);

    assert!(HandlerRegistry::new().resolve("anything").is_none());
}

#[tokio::test]
async fn dispatch_uses_role_specific_handler() {
    init_tracing();

    let mut registry = HandlerRegistry::new();
    registry.register(
        "Waterwright",
        Arc::new(FnHandler::new(|node: TaskNode, _ctx: HandlerContext| async move {
            let mut m = MetricMap::new();
            m.insert("day".into(), MetricValue::from(node.day as f64));
            Ok(m)
        })),
    );
    registry.register(
        DEFAULT_ROLE,
        Arc::new(FnHandler::new(|_node: TaskNode, _ctx: HandlerContext| async move {
            Err::<MetricMap, _>(anyhow!("generic should not run"))
        })),
    );

    let dispatcher = Dispatcher::new(registry, HandlerContext::new("unused"));
    let result = dispatcher
        .dispatch(Arc::new(TaskNode::new(12, "waterwright")))
        .await;

    assert!(result.ok);
    assert_eq!(result.metrics.get("day"), Some(&MetricValue::Number(12.0)));
}

#[tokio::test]
async fn handler_error_becomes_failed_result() {
    let mut registry = HandlerRegistry::new();
    registry.register(
        DEFAULT_ROLE,
        Arc::new(FnHandler::new(|_node: TaskNode, _ctx: HandlerContext| async move {
            Err::<MetricMap, _>(anyhow!("disk full").context("writing draft"))
        })),
    );
    let dispatcher = Dispatcher::new(registry, HandlerContext::new("unused"));

    let result = dispatcher.dispatch(Arc::new(TaskNode::new(1, "x"))).await;
    assert!(!result.ok);
    assert_eq!(error_text(&result.metrics), "writing draft: disk full");
}

#[tokio::test]
async fn handler_panic_becomes_failed_result() {
    let tracker = Tracker::new();
    let mut registry = HandlerRegistry::new();
    registry.register(DEFAULT_ROLE, TrackingHandler::new(tracker).panicking(&[3]).into_arc());
    let dispatcher = Dispatcher::new(registry, HandlerContext::new("unused"));

    let result = dispatcher.dispatch(Arc::new(TaskNode::new(3, "x"))).await;
    assert!(!result.ok);
    assert_eq!(error_text(&result.metrics), "handler panicked: scripted panic on day 3");
}

#[tokio::test]
async fn missing_handler_becomes_failed_result() {
    let dispatcher = Dispatcher::new(HandlerRegistry::new(), HandlerContext::new("unused"));

    let result = dispatcher.dispatch(Arc::new(TaskNode::new(1, "ghost"))).await;
    assert!(!result.ok);
    assert!(error_text(&result.metrics).contains("ghost"));
}

#[tokio::test]
async fn slow_handler_times_out_when_limit_set() {
    let tracker = Tracker::new();
    let mut registry = HandlerRegistry::new();
    registry.register(
        DEFAULT_ROLE,
        TrackingHandler::new(Arc::clone(&tracker)).delay(Duration::from_secs(5)).into_arc(),
    );
    let dispatcher = Dispatcher::new(registry, HandlerContext::new("unused"))
        .with_timeout(Some(Duration::from_millis(20)));

    let result = dispatcher.dispatch(Arc::new(TaskNode::new(1, "x"))).await;
    assert!(!result.ok);
    assert!(error_text(&result.metrics).contains("timed out"));

    // The handler task was aborted, not left sleeping in the background.
    assert_eq!(tracker.started(), vec![1]);
    assert_eq!(tracker.in_flight(), 0);
    assert!(tracker.finished().is_empty());
}

#[test]
fn artifact_names_are_zero_padded() {
    assert_eq!(artifact_file_name(7, "codex_herald", "md"), "day007_codex_herald.md");
    assert_eq!(artifact_file_name(123, "node_spec", "txt"), "day123_node_spec.txt");
    assert_eq!(artifact_file_name(1000, "x", "txt"), "day1000_x.txt");
}

#[tokio::test]
async fn builtin_handlers_write_their_artifacts() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let art_dir = dir.path().join("artifacts");
    let dispatcher = Dispatcher::new(HandlerRegistry::with_builtin(), HandlerContext::new(&art_dir));

    let csv = "Day,VOT Name,Theme,Primary Deliverable\n\
               1,Codex Herald – Day 1,Origins,Codex preface\n\
               2,Patent Sentinel – Day 2,IP,self-scheduling plans\n\
               3,Netweaver – Day 3,Web,Landing page\n\
               4,Someone New – Day 4,Misc,Anything\n";
    let plan = Plan::from_csv_str(csv)?;

    for node in plan.nodes() {
        let result = dispatcher.dispatch(Arc::new(node.clone())).await;
        assert!(result.ok, "day {} failed: {:?}", node.day, result.metrics);
        assert_eq!(result.metrics.get("files_created"), Some(&MetricValue::Number(1.0)));
    }

    let codex = std::fs::read_to_string(art_dir.join("day001_codex_herald.md"))?;
    assert!(codex.contains("Codex preface"));

    let claims = dispatcher
        .dispatch(Arc::new(plan.get(2).expect("day 2").clone()))
        .await;
    assert_eq!(claims.metrics.get("claims"), Some(&MetricValue::Number(2.0)));

    assert!(art_dir.join("day003_codexnet.html").is_file());
    assert!(art_dir.join("day004_generic.txt").is_file());
    Ok(())
}

#[test]
fn builtin_table_has_generic_and_unique_roles() {
    let mut roles: Vec<_> = BUILTIN.iter().map(|(role, _)| *role).collect();
    assert!(roles.contains(&DEFAULT_ROLE));

    let before = roles.len();
    roles.sort();
    roles.dedup();
    assert_eq!(roles.len(), before);
}
