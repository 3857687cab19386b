// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

use crate::types::FailurePolicy;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// plan = "data/plan.csv"
/// concurrency = 8
/// db = "dayplan.db"
/// artifact_dir = "artifacts"
/// failure_policy = "unlock_children"
/// detect_cycles = false
/// handler_timeout_secs = 300
/// ```
///
/// Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,
}

/// A validated configuration.
///
/// Only constructed through `TryFrom<RawConfigFile>` (see `validate.rs`) so
/// that holders can rely on the invariants.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(config: ConfigSection) -> Self {
        Self { config }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// CSV plan to execute.
    #[serde(default = "default_plan")]
    pub plan: PathBuf,

    /// Maximum number of nodes running at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// SQLite database for run/metric records. In-memory recording when
    /// unset.
    #[serde(default)]
    pub db: Option<PathBuf>,

    /// Directory handlers write artifacts into.
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,

    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Reject plans with dependency cycles before running anything.
    #[serde(default)]
    pub detect_cycles: bool,

    /// Fail handlers that run longer than this. No limit when unset.
    #[serde(default)]
    pub handler_timeout_secs: Option<u64>,
}

pub const DEFAULT_CONCURRENCY: usize = 3;
pub const MAX_CONCURRENCY: usize = 256;

fn default_plan() -> PathBuf {
    PathBuf::from("data/plan.csv")
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            plan: default_plan(),
            concurrency: default_concurrency(),
            db: None,
            artifact_dir: default_artifact_dir(),
            failure_policy: FailurePolicy::default(),
            detect_cycles: false,
            handler_timeout_secs: None,
        }
    }
}

impl ConfigSection {
    pub fn handler_timeout(&self) -> Option<std::time::Duration> {
        self.handler_timeout_secs
            .filter(|&s| s > 0)
            .map(std::time::Duration::from_secs)
    }
}
