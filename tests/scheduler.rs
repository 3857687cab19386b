// tests/scheduler.rs

use dayplan::dag::{DependencyGraph, NodeStatus, Scheduler};
use dayplan::engine::{CoreCommand, CoreRuntime, NodeOutcome, RuntimeEvent};
use dayplan::types::{Day, FailurePolicy, RunPhase};
use dayplan_test_utils::builders::PlanBuilder;
use dayplan_test_utils::init_tracing;

fn days(nodes: &[dayplan::dag::ScheduledNode]) -> Vec<Day> {
    nodes.iter().map(|n| n.day).collect()
}

fn dispatched(commands: &[CoreCommand]) -> Vec<Day> {
    commands
        .iter()
        .filter_map(|c| match c {
            CoreCommand::DispatchNodes(nodes) => Some(days(nodes)),
            _ => None,
        })
        .flatten()
        .collect()
}

fn ended(commands: &[CoreCommand]) -> Option<RunPhase> {
    commands.iter().find_map(|c| match c {
        CoreCommand::RunEnded(phase) => Some(*phase),
        _ => None,
    })
}

#[test]
fn fan_in_waits_for_both_parents() {
    init_tracing();

    let plan = PlanBuilder::new().node(1, &[]).node(2, &[]).node(3, &[1, 2]).build();
    let mut s = Scheduler::from_plan(&plan, FailurePolicy::UnlockChildren);

    let first = s.take_ready(2);
    assert_eq!(days(&first), vec![1, 2]);
    assert_eq!(s.running_count(), 2);
    assert_eq!(s.status_of(3), Some(NodeStatus::Pending));

    let step = s.complete(1, NodeOutcome::Success);
    assert!(step.newly_ready.is_empty());
    assert!(s.take_ready(2).is_empty());

    let step = s.complete(2, NodeOutcome::Success);
    assert_eq!(step.newly_ready, vec![3]);
    assert_eq!(days(&s.take_ready(2)), vec![3]);

    s.complete(3, NodeOutcome::Success);
    let counts = s.counts();
    assert_eq!((counts.total, counts.done, counts.open), (3, 3, 0));
    assert!(s.all_terminal());
    assert!(s.is_quiescent());
}

#[test]
fn missing_dependency_is_ignored() {
    let plan = PlanBuilder::new().node(1, &[]).node(2, &[1, 99]).build();
    let mut s = Scheduler::from_plan(&plan, FailurePolicy::UnlockChildren);

    assert_eq!(s.graph().dependencies_of(2), &[1]);
    assert_eq!(s.graph().deps_left(2), Some(1));

    s.take_ready(1);
    let step = s.complete(1, NodeOutcome::Success);
    assert_eq!(step.newly_ready, vec![2]);
}

#[test]
fn node_whose_only_dep_is_missing_is_a_root() {
    let plan = PlanBuilder::new().node(5, &[42]).build();
    let graph = DependencyGraph::build(&plan);

    assert_eq!(graph.deps_left(5), Some(0));
    assert_eq!(graph.roots(), vec![5]);
}

#[test]
fn unlock_is_idempotent_per_pair() {
    let plan = PlanBuilder::new().node(1, &[]).node(2, &[]).node(3, &[1, 2]).build();
    let mut graph = DependencyGraph::build(&plan);

    assert_eq!(graph.deps_left(3), Some(2));
    assert!(!graph.unlock(1, 3));
    assert!(!graph.unlock(1, 3));
    assert_eq!(graph.deps_left(3), Some(1));

    // Not an edge: no effect.
    assert!(!graph.unlock(3, 1));
    assert_eq!(graph.deps_left(1), Some(0));

    assert!(graph.unlock(2, 3));
    assert!(!graph.unlock(2, 3));
    assert_eq!(graph.deps_left(3), Some(0));
}

#[test]
fn scheduler_unlock_enqueues_child_at_most_once() {
    let plan = PlanBuilder::new().node(1, &[]).node(2, &[1]).build();
    let mut s = Scheduler::from_plan(&plan, FailurePolicy::UnlockChildren);

    assert!(s.unlock(1, 2));
    assert!(!s.unlock(1, 2));
    assert_eq!(s.ready_len(), 2);

    let taken = s.take_ready(10);
    assert_eq!(days(&taken), vec![1, 2]);
    assert_eq!(s.ready_len(), 0);
}

#[test]
fn failure_unlocks_children_by_default() {
    let plan = PlanBuilder::new().chain(1, 3).build();
    let mut s = Scheduler::from_plan(&plan, FailurePolicy::default());

    s.take_ready(1);
    s.complete(1, NodeOutcome::Success);
    s.take_ready(1);

    let step = s.complete(2, NodeOutcome::Failed);
    assert_eq!(step.newly_failed, vec![2]);
    assert_eq!(step.newly_ready, vec![3]);
    assert_eq!(s.status_of(2), Some(NodeStatus::Failed));

    assert_eq!(days(&s.take_ready(1)), vec![3]);
    s.complete(3, NodeOutcome::Success);

    let counts = s.counts();
    assert_eq!(counts.completed, 2);
    assert_eq!(counts.failed, 1);
    assert_eq!(counts.done, 3);
}

#[test]
fn failure_halts_dependents_when_configured() {
    let plan = PlanBuilder::new().chain(1, 3).node(4, &[3]).node(5, &[1]).build();
    let mut s = Scheduler::from_plan(&plan, FailurePolicy::HaltDependents);

    s.take_ready(1);
    let step = s.complete(1, NodeOutcome::Success);
    assert_eq!(step.newly_ready, vec![2, 5]);
    assert_eq!(days(&s.take_ready(1)), vec![2]);

    let step = s.complete(2, NodeOutcome::Failed);
    assert!(step.newly_ready.is_empty());
    let mut failed = step.newly_failed.clone();
    failed.sort();
    assert_eq!(failed, vec![2, 3, 4]);

    // 3 is never handed out.
    assert_eq!(days(&s.take_ready(10)), vec![5]);
    assert_eq!(s.status_of(3), Some(NodeStatus::Failed));
    assert_eq!(s.status_of(4), Some(NodeStatus::Failed));
}

#[test]
fn stray_completions_are_ignored() {
    let plan = PlanBuilder::new().node(1, &[]).node(2, &[1]).build();
    let mut s = Scheduler::from_plan(&plan, FailurePolicy::UnlockChildren);

    // Unknown day, and a pending node that was never dispatched.
    assert!(s.complete(77, NodeOutcome::Success).newly_ready.is_empty());
    assert!(s.complete(2, NodeOutcome::Success).newly_ready.is_empty());
    assert_eq!(s.status_of(2), Some(NodeStatus::Pending));

    s.take_ready(1);
    s.complete(1, NodeOutcome::Success);
    // Second completion of the same node.
    assert!(s.complete(1, NodeOutcome::Failed).newly_failed.is_empty());
    assert_eq!(s.status_of(1), Some(NodeStatus::Completed));
}

#[test]
fn core_never_exceeds_concurrency() {
    init_tracing();

    let mut builder = PlanBuilder::new();
    for day in 1..=5 {
        builder = builder.node(day, &[]);
    }
    let plan = builder.build();

    let mut core = CoreRuntime::new(Scheduler::from_plan(&plan, FailurePolicy::default()), 1);
    let step = core.start();
    assert_eq!(dispatched(&step.commands), vec![1]);
    assert!(step.keep_running);

    let mut order = vec![1];
    let mut current = 1;
    loop {
        assert!(core.scheduler().running_count() <= 1);
        let step = core.step(RuntimeEvent::NodeFinished {
            day: current,
            outcome: NodeOutcome::Success,
        });
        let next = dispatched(&step.commands);
        assert!(next.len() <= 1);

        if !step.keep_running {
            assert_eq!(ended(&step.commands), Some(RunPhase::Finished));
            break;
        }
        current = next[0];
        order.push(current);
    }

    assert_eq!(order, vec![1, 2, 3, 4, 5]);
    assert_eq!(core.phase(), RunPhase::Finished);
    assert_eq!(core.summary().completed, 5);
}

#[test]
fn core_dispatches_fan_in_with_two_workers() {
    let plan = PlanBuilder::new().node(1, &[]).node(2, &[]).node(3, &[1, 2]).build();
    let mut core = CoreRuntime::new(Scheduler::from_plan(&plan, FailurePolicy::default()), 2);

    let step = core.start();
    assert_eq!(dispatched(&step.commands), vec![1, 2]);

    let step = core.step(RuntimeEvent::NodeFinished {
        day: 2,
        outcome: NodeOutcome::Success,
    });
    assert!(dispatched(&step.commands).is_empty());

    let step = core.step(RuntimeEvent::NodeFinished {
        day: 1,
        outcome: NodeOutcome::Success,
    });
    assert_eq!(dispatched(&step.commands), vec![3]);

    let step = core.step(RuntimeEvent::NodeFinished {
        day: 3,
        outcome: NodeOutcome::Success,
    });
    assert!(!step.keep_running);

    let snap = core.snapshot();
    assert_eq!(snap.phase, RunPhase::Finished);
    assert_eq!((snap.counts.total, snap.counts.done, snap.counts.open), (3, 3, 0));
}

#[test]
fn cycle_ends_run_as_blocked() {
    let plan = PlanBuilder::new()
        .node(1, &[])
        .node(2, &[3])
        .node(3, &[2])
        .build();
    let scheduler = Scheduler::from_plan(&plan, FailurePolicy::default());
    assert!(scheduler.graph().find_cycle().is_some());

    let mut core = CoreRuntime::new(scheduler, 4);
    let step = core.start();
    assert_eq!(dispatched(&step.commands), vec![1]);

    let step = core.step(RuntimeEvent::NodeFinished {
        day: 1,
        outcome: NodeOutcome::Success,
    });
    assert!(!step.keep_running);
    assert_eq!(ended(&step.commands), Some(RunPhase::Blocked));

    let snap = core.snapshot();
    assert_eq!((snap.counts.done, snap.counts.open), (1, 2));
}

#[test]
fn empty_plan_finishes_immediately() {
    let plan = PlanBuilder::new().build();
    let mut core = CoreRuntime::new(Scheduler::from_plan(&plan, FailurePolicy::default()), 3);

    let step = core.start();
    assert!(!step.keep_running);
    assert_eq!(ended(&step.commands), Some(RunPhase::Finished));
}

#[test]
fn stop_ends_run_and_ignores_later_events() {
    let plan = PlanBuilder::new().chain(1, 3).build();
    let mut core = CoreRuntime::new(Scheduler::from_plan(&plan, FailurePolicy::default()), 1);

    core.start();
    let step = core.step(RuntimeEvent::StopRequested);
    assert!(!step.keep_running);
    assert_eq!(ended(&step.commands), Some(RunPhase::Stopped));

    let step = core.step(RuntimeEvent::NodeFinished {
        day: 1,
        outcome: NodeOutcome::Success,
    });
    assert!(step.commands.is_empty());
    assert_eq!(core.phase(), RunPhase::Stopped);
    assert_eq!(core.scheduler().status_of(2), Some(NodeStatus::Pending));
}

#[test]
fn zero_concurrency_is_clamped_to_one() {
    let plan = PlanBuilder::new().node(1, &[]).node(2, &[]).build();
    let mut core = CoreRuntime::new(Scheduler::from_plan(&plan, FailurePolicy::default()), 0);

    assert_eq!(core.concurrency(), 1);
    assert_eq!(dispatched(&core.start().commands), vec![1]);
}
