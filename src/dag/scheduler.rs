// src/dag/scheduler.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dag::graph::DependencyGraph;
use crate::dag::node_state::{NodeStatus, ScheduledNode};
use crate::dag::ready_queue::ReadyQueue;
use crate::dag::scheduler_step::SchedulerStep;
use crate::engine::NodeOutcome;
use crate::plan::{Plan, TaskNode};
use crate::status::StatusCounts;
use crate::types::{Day, FailurePolicy};

#[derive(Debug, Clone)]
struct NodeInfo {
    node: Arc<TaskNode>,
    status: NodeStatus,
}

/// Scheduler holds the dependency graph plus mutable per-run state.
///
/// It is responsible for:
/// - seeding the ready queue with nodes that have no dependencies
/// - handing out ready nodes and marking them `Running`
/// - marking nodes completed/failed
/// - unlocking children, or halting them, per the [`FailurePolicy`]
///
/// It performs no IO and has no notion of concurrency; the engine decides
/// how many nodes to take at once.
#[derive(Debug)]
pub struct Scheduler {
    graph: DependencyGraph,
    nodes: BTreeMap<Day, NodeInfo>,
    ready: ReadyQueue,
    policy: FailurePolicy,
}

impl Scheduler {
    /// Build a scheduler for one run of `plan` and seed the ready queue.
    pub fn from_plan(plan: &Plan, policy: FailurePolicy) -> Self {
        let graph = DependencyGraph::build(plan);

        let nodes = plan
            .nodes()
            .map(|node| {
                (
                    node.day,
                    NodeInfo {
                        node: Arc::new(node.clone()),
                        status: NodeStatus::Pending,
                    },
                )
            })
            .collect();

        let mut ready = ReadyQueue::new();
        for day in graph.roots() {
            ready.push(day);
        }

        debug!(
            nodes = graph.len(),
            ready = ready.len(),
            ?policy,
            "scheduler: seeded ready queue"
        );

        Self {
            graph,
            nodes,
            ready,
            policy,
        }
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn total(&self) -> usize {
        self.nodes.len()
    }

    pub fn status_of(&self, day: Day) -> Option<NodeStatus> {
        self.nodes.get(&day).map(|info| info.status)
    }

    pub fn running_count(&self) -> usize {
        self.count(NodeStatus::Running)
    }

    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    /// Nothing is running and nothing is ready: the run cannot progress.
    pub fn is_quiescent(&self) -> bool {
        self.ready.is_empty() && self.running_count() == 0
    }

    pub fn all_terminal(&self) -> bool {
        self.nodes.values().all(|info| info.status.is_terminal())
    }

    /// Take up to `limit` ready nodes, marking each `Running`.
    pub fn take_ready(&mut self, limit: usize) -> Vec<ScheduledNode> {
        let mut out = Vec::new();

        while out.len() < limit {
            let Some(day) = self.ready.pop() else {
                break;
            };

            let Some(info) = self.nodes.get_mut(&day) else {
                warn!(day, "ready node missing from node table");
                continue;
            };

            if info.status != NodeStatus::Pending {
                debug!(day, status = ?info.status, "ready node no longer pending; skipping");
                continue;
            }

            info!(day, role = %info.node.role, "dependencies satisfied; dispatching");
            info.status = NodeStatus::Running;
            out.push(ScheduledNode {
                day,
                node: Arc::clone(&info.node),
            });
        }

        out
    }

    /// Record the outcome of a running node and propagate to its children.
    ///
    /// Completions for unknown nodes, or for nodes that are not `Running`,
    /// are ignored.
    pub fn complete(&mut self, day: Day, outcome: NodeOutcome) -> SchedulerStep {
        let mut step = SchedulerStep::default();

        let Some(info) = self.nodes.get_mut(&day) else {
            warn!(day, "completion for unknown node; ignoring");
            return step;
        };

        if info.status != NodeStatus::Running {
            warn!(day, status = ?info.status, "completion for node that is not running; ignoring");
            return step;
        }

        match outcome {
            NodeOutcome::Success => {
                info.status = NodeStatus::Completed;
                debug!(day, "node completed");
                step.newly_ready = self.unlock_children(day);
            }
            NodeOutcome::Failed => {
                info.status = NodeStatus::Failed;
                step.newly_failed.push(day);

                match self.policy {
                    FailurePolicy::UnlockChildren => {
                        warn!(day, "node failed; unlocking dependents anyway");
                        step.newly_ready = self.unlock_children(day);
                    }
                    FailurePolicy::HaltDependents => {
                        warn!(day, "node failed; failing dependents");
                        step.newly_failed.extend(self.mark_dependents_failed(day));
                    }
                }
            }
        }

        step
    }

    /// Apply a single (parent, child) unlock, queueing the child if its
    /// counter reaches zero. Returns `true` if the child became ready.
    pub fn unlock(&mut self, parent: Day, child: Day) -> bool {
        if !self.graph.unlock(parent, child) {
            return false;
        }

        match self.nodes.get(&child) {
            Some(info) if info.status == NodeStatus::Pending => self.ready.push(child),
            _ => false,
        }
    }

    /// Snapshot of node counts.
    pub fn counts(&self) -> StatusCounts {
        let total = self.nodes.len();
        let completed = self.count(NodeStatus::Completed);
        let failed = self.count(NodeStatus::Failed);
        let running = self.running_count();
        let done = completed + failed;

        StatusCounts {
            total,
            done,
            completed,
            failed,
            running,
            open: total - done,
        }
    }

    fn count(&self, status: NodeStatus) -> usize {
        self.nodes.values().filter(|i| i.status == status).count()
    }

    fn unlock_children(&mut self, parent: Day) -> Vec<Day> {
        let children = self.graph.dependents_of(parent).to_vec();
        children
            .into_iter()
            .filter(|&child| self.unlock(parent, child))
            .collect()
    }

    /// Mark every pending transitive dependent of `failed` as `Failed`.
    fn mark_dependents_failed(&mut self, failed: Day) -> Vec<Day> {
        let mut stack: Vec<Day> = self.graph.dependents_of(failed).to_vec();
        let mut newly_failed = Vec::new();

        while let Some(day) = stack.pop() {
            if let Some(info) = self.nodes.get_mut(&day) {
                if info.status == NodeStatus::Pending {
                    info.status = NodeStatus::Failed;
                    debug!(day, upstream = failed, "dependent halted by upstream failure");
                    newly_failed.push(day);
                    stack.extend_from_slice(self.graph.dependents_of(day));
                }
            }
        }

        newly_failed
    }
}
