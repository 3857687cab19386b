// src/plan/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::types::Day;

/// Optional per-row payload column.
///
/// Values that look like a serialized JSON object or array and parse
/// cleanly are kept as JSON; anything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Json(serde_json::Value),
    Text(String),
}

impl Payload {
    pub fn parse(raw: &str) -> Option<Payload> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if raw.starts_with('{') || raw.starts_with('[') {
            if let Ok(value) = serde_json::from_str(raw) {
                return Some(Payload::Json(value));
            }
        }

        Some(Payload::Text(raw.to_string()))
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Payload::Json(v) => Some(v),
            Payload::Text(_) => None,
        }
    }
}

/// One row of the plan: a unit of work identified by its day number.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskNode {
    pub day: Day,
    /// Raw task label, e.g. `"Codex Herald – Day 1"`.
    pub label: String,
    /// Role extracted from the label; selects the handler.
    pub role: String,
    pub theme: String,
    pub deliverable: String,
    pub metrics_template: String,
    /// Declared dependencies in plan order, duplicates removed.
    ///
    /// May name days that are not in the plan; the graph ignores those.
    pub depends_on: Vec<Day>,
    pub payload: Option<Payload>,
    /// Columns the loader did not recognise, keyed by their header.
    pub extra: BTreeMap<String, String>,
}

impl TaskNode {
    pub fn new(day: Day, role: impl Into<String>) -> Self {
        let role = role.into();
        Self {
            day,
            label: role.clone(),
            role,
            theme: String::new(),
            deliverable: String::new(),
            metrics_template: String::new(),
            depends_on: Vec::new(),
            payload: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_deps(mut self, deps: impl IntoIterator<Item = Day>) -> Self {
        for dep in deps {
            if !self.depends_on.contains(&dep) {
                self.depends_on.push(dep);
            }
        }
        self
    }

    pub fn with_deliverable(mut self, deliverable: impl Into<String>) -> Self {
        self.deliverable = deliverable.into();
        self
    }
}

/// A loaded plan: task nodes keyed by day.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    source: Option<PathBuf>,
    nodes: BTreeMap<Day, TaskNode>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a plan from nodes; a later node with the same day replaces an
    /// earlier one.
    pub fn from_nodes(nodes: impl IntoIterator<Item = TaskNode>) -> Self {
        let mut plan = Plan::new();
        for node in nodes {
            plan.insert(node);
        }
        plan
    }

    /// Parse a plan from CSV text.
    pub fn from_csv_str(csv: &str) -> crate::errors::Result<Self> {
        super::loader::load_from_reader(csv.as_bytes())
    }

    /// Insert a node, returning the node it replaced (if any).
    pub fn insert(&mut self, node: TaskNode) -> Option<TaskNode> {
        self.nodes.insert(node.day, node)
    }

    pub fn get(&self, day: Day) -> Option<&TaskNode> {
        self.nodes.get(&day)
    }

    pub fn contains(&self, day: Day) -> bool {
        self.nodes.contains_key(&day)
    }

    /// Nodes in ascending day order.
    pub fn nodes(&self) -> impl Iterator<Item = &TaskNode> {
        self.nodes.values()
    }

    pub fn days(&self) -> impl Iterator<Item = Day> + '_ {
        self.nodes.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// File the plan was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub(crate) fn set_source(&mut self, path: PathBuf) {
        self.source = Some(path);
    }
}
