// src/dag/graph.rs

use std::collections::{BTreeMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::plan::Plan;
use crate::types::Day;

/// Internal node structure: immediate deps, dependents and the counter.
#[derive(Debug, Clone)]
struct DagNode {
    /// Dependencies that exist in the plan, deduplicated.
    deps: Vec<Day>,
    /// Nodes that list this one as a dependency.
    dependents: Vec<Day>,
    /// Dependencies not yet unlocked.
    deps_left: usize,
}

/// Parent → children adjacency plus remaining-dependency counters.
///
/// Dependency tokens naming days absent from the plan are dropped at build
/// time and never count toward a node's counter.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    nodes: BTreeMap<Day, DagNode>,
    /// (parent, child) pairs whose unlock has already been applied.
    unlocked: HashSet<(Day, Day)>,
}

impl DependencyGraph {
    /// Build the graph from a loaded plan.
    pub fn build(plan: &Plan) -> Self {
        let mut nodes: BTreeMap<Day, DagNode> = BTreeMap::new();

        // First pass: nodes with their valid dependency lists.
        for node in plan.nodes() {
            let mut deps = Vec::with_capacity(node.depends_on.len());
            for &dep in &node.depends_on {
                if !plan.contains(dep) {
                    debug!(
                        day = node.day,
                        dep,
                        "dependency names a day not in the plan; ignoring"
                    );
                    continue;
                }
                if !deps.contains(&dep) {
                    deps.push(dep);
                }
            }

            nodes.insert(
                node.day,
                DagNode {
                    deps_left: deps.len(),
                    deps,
                    dependents: Vec::new(),
                },
            );
        }

        // Second pass: dependents from deps.
        let edges: Vec<(Day, Day)> = nodes
            .iter()
            .flat_map(|(&child, n)| n.deps.iter().map(move |&parent| (parent, child)))
            .collect();

        for (parent, child) in edges {
            if let Some(parent_node) = nodes.get_mut(&parent) {
                parent_node.dependents.push(child);
            }
        }

        Self {
            nodes,
            unlocked: HashSet::new(),
        }
    }

    /// All days, ascending.
    pub fn days(&self) -> impl Iterator<Item = Day> + '_ {
        self.nodes.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Valid dependencies of `day`.
    pub fn dependencies_of(&self, day: Day) -> &[Day] {
        self.nodes
            .get(&day)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Children of `day` (nodes that depend on it).
    pub fn dependents_of(&self, day: Day) -> &[Day] {
        self.nodes
            .get(&day)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Remaining-dependency counter, or `None` for an unknown day.
    pub fn deps_left(&self, day: Day) -> Option<usize> {
        self.nodes.get(&day).map(|n| n.deps_left)
    }

    /// Days whose counter is zero, ascending.
    pub fn roots(&self) -> Vec<Day> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.deps_left == 0)
            .map(|(&day, _)| day)
            .collect()
    }

    /// Apply the unlock of `child` by `parent`.
    ///
    /// Decrements the child's counter at most once per pair, and only if
    /// `parent` really is one of its dependencies. Returns `true` if this
    /// call brought the counter to zero.
    pub fn unlock(&mut self, parent: Day, child: Day) -> bool {
        let Some(node) = self.nodes.get_mut(&child) else {
            return false;
        };

        if !node.deps.contains(&parent) {
            return false;
        }

        if !self.unlocked.insert((parent, child)) {
            debug!(parent, child, "unlock already applied; ignoring");
            return false;
        }

        if node.deps_left == 0 {
            return false;
        }

        node.deps_left -= 1;
        node.deps_left == 0
    }

    /// Find a node that sits on a dependency cycle, if any.
    pub fn find_cycle(&self) -> Option<Day> {
        let mut graph: DiGraphMap<Day, ()> = DiGraphMap::new();

        for &day in self.nodes.keys() {
            graph.add_node(day);
        }

        // Edge direction: dep -> dependent.
        for (&day, node) in self.nodes.iter() {
            for &dep in &node.deps {
                graph.add_edge(dep, day, ());
            }
        }

        match toposort(&graph, None) {
            Ok(_order) => None,
            Err(cycle) => Some(cycle.node_id()),
        }
    }
}
