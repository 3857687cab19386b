#![allow(dead_code)]

use dayplan::config::{ConfigFile, ConfigSection, RawConfigFile};
use dayplan::plan::{Plan, TaskNode};
use dayplan::types::{Day, FailurePolicy};

/// Builder for `Plan` to simplify test setup.
pub struct PlanBuilder {
    nodes: Vec<TaskNode>,
}

impl PlanBuilder {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Add a node with the default `generic` role.
    pub fn node(self, day: Day, deps: &[Day]) -> Self {
        self.role_node(day, "generic", deps)
    }

    pub fn role_node(mut self, day: Day, role: &str, deps: &[Day]) -> Self {
        self.nodes
            .push(TaskNode::new(day, role).with_deps(deps.iter().copied()));
        self
    }

    /// `first -> first+1 -> ... -> last`.
    pub fn chain(mut self, first: Day, last: Day) -> Self {
        for day in first..=last {
            let node = TaskNode::new(day, "generic");
            let node = if day > first {
                node.with_deps([day - 1])
            } else {
                node
            };
            self.nodes.push(node);
        }
        self
    }

    pub fn build(self) -> Plan {
        Plan::from_nodes(self.nodes)
    }
}

impl Default for PlanBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `ConfigFile`.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
            },
        }
    }

    pub fn plan(mut self, path: &str) -> Self {
        self.config.config.plan = path.into();
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.config.concurrency = n;
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.config.failure_policy = policy;
        self
    }

    pub fn detect_cycles(mut self, val: bool) -> Self {
        self.config.config.detect_cycles = val;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
