// src/lib.rs

pub mod behaviors;
pub mod cli;
pub mod config;
pub mod control;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod plan;
pub mod record;
pub mod status;
pub mod types;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, Command, PlanArgs, RunArgs, StatusArgs};
use crate::config::{load_and_validate, ConfigSection};
use crate::control::{Controller, RunSettings};
use crate::dag::DependencyGraph;
use crate::exec::{Dispatcher, HandlerContext, HandlerRegistry};
use crate::record::{MemoryRecorder, Recorder, SqliteRecorder};
use crate::status::{StatusCounts, StatusSnapshot};
use crate::types::RunPhase;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (file, env, CLI flags)
/// - recorder and handler registry
/// - the controller and its scheduling loop
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(args.config.as_deref())?;
    let mut section = cfg.config;

    match args.command {
        Command::Run(run_args) => {
            apply_run_args(&mut section, &run_args);
            config::validate::validate_section(&section)?;
            run_plan(section).await
        }
        Command::Plan(plan_args) => print_dry_run(&section, &plan_args),
        Command::Status(status_args) => print_recorded_status(&section, &status_args),
    }
}

fn apply_run_args(section: &mut ConfigSection, args: &RunArgs) {
    if let Some(ref plan) = args.plan {
        section.plan = plan.clone();
    }
    if let Some(n) = args.concurrency {
        section.concurrency = n;
    }
    if let Some(ref db) = args.db {
        section.db = Some(db.clone());
    }
    if let Some(ref dir) = args.artifact_dir {
        section.artifact_dir = dir.clone();
    }
    if let Some(policy) = args.failure_policy {
        section.failure_policy = policy.into();
    }
    if args.detect_cycles {
        section.detect_cycles = true;
    }
}

fn open_recorder(section: &ConfigSection) -> Result<Arc<dyn Recorder>> {
    Ok(match section.db {
        Some(ref path) => Arc::new(
            SqliteRecorder::open(path)
                .with_context(|| format!("opening database {}", path.display()))?,
        ),
        None => {
            info!("no database configured; recording runs in memory only");
            Arc::new(MemoryRecorder::new())
        }
    })
}

async fn run_plan(section: ConfigSection) -> Result<()> {
    let recorder = open_recorder(&section)?;

    let dispatcher = Dispatcher::new(
        HandlerRegistry::with_builtin(),
        HandlerContext::new(&section.artifact_dir),
    )
    .with_timeout(section.handler_timeout());

    let mut controller = Controller::new(
        RunSettings::from(&section),
        Arc::new(dispatcher),
        recorder,
    );

    controller.start(section.concurrency).await?;

    // Ctrl-C → cooperative stop.
    if let Some(stop) = controller.stop_handle() {
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            info!("Ctrl+C received; stopping after in-flight handlers");
            stop.stop().await;
        });
    }

    let summary = controller.wait().await?;
    if summary.phase == RunPhase::Blocked {
        warn!(
            completed = summary.completed,
            failed = summary.failed,
            total = summary.total,
            "run ended blocked"
        );
    }

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Print nodes, roles and dependencies without executing anything.
fn print_dry_run(section: &ConfigSection, args: &PlanArgs) -> Result<()> {
    let path = args.plan.as_ref().unwrap_or(&section.plan);
    let plan = plan::load(path)?;
    let graph = DependencyGraph::build(&plan);
    let registry = HandlerRegistry::with_builtin();

    println!("dayplan dry-run");
    println!("  plan = {}", path.display());
    println!("  concurrency = {}", section.concurrency);
    println!("  failure_policy = {:?}", section.failure_policy);
    println!();

    println!("nodes ({}):", plan.len());
    for node in plan.nodes() {
        let handler = registry
            .resolve(&node.role)
            .map(|(name, _)| name)
            .unwrap_or_else(|| "<none>".to_string());
        println!("  - day {} [{}] -> {handler}", node.day, node.role);

        let deps = graph.dependencies_of(node.day);
        if !deps.is_empty() {
            println!("      after: {deps:?}");
        }
        let ignored: Vec<_> = node
            .depends_on
            .iter()
            .filter(|d| !deps.contains(d))
            .collect();
        if !ignored.is_empty() {
            println!("      ignored deps (not in plan): {ignored:?}");
        }
        if !node.deliverable.is_empty() {
            println!("      deliverable: {}", node.deliverable);
        }
    }

    println!();
    println!("roots: {:?}", graph.roots());
    match graph.find_cycle() {
        Some(day) => println!("cycle: involves day {day}"),
        None => println!("cycle: none"),
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}

/// Status computed from the recorder, for when no run is in-process.
fn print_recorded_status(section: &ConfigSection, args: &StatusArgs) -> Result<()> {
    let db = args
        .db
        .as_ref()
        .or(section.db.as_ref())
        .context("status needs a database (--db or [config].db)")?;
    let recorder = SqliteRecorder::open(db)?;

    let path = args.plan.as_ref().unwrap_or(&section.plan);
    let plan = match plan::load(path) {
        Ok(plan) => Some(plan),
        Err(err) => {
            warn!(error = %err, "could not load plan; total taken from recorded days");
            None
        }
    };

    let counts = StatusCounts::from_recorder(&recorder, plan.as_ref())?;
    let snapshot = StatusSnapshot {
        phase: RunPhase::Idle,
        counts,
    };
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
