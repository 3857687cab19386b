// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{DayplanError, Result};

pub const ENV_PLAN: &str = "DAYPLAN_PLAN";
pub const ENV_CONCURRENCY: &str = "DAYPLAN_CONCURRENCY";
pub const ENV_DB: &str = "DAYPLAN_DB";
pub const ENV_ART_DIR: &str = "DAYPLAN_ART_DIR";
pub const ENV_FAILURE_POLICY: &str = "DAYPLAN_FAILURE_POLICY";

/// Load a configuration file and return the raw, unvalidated model.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    let config: RawConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

/// Resolve the effective configuration:
///
/// - Reads the TOML file if `path` is given, or if the default
///   `Dayplan.toml` exists. A missing default file means all defaults.
/// - Applies `DAYPLAN_*` environment overrides.
/// - Validates the result.
///
/// CLI flags are applied on top by the caller.
pub fn load_and_validate(path: Option<&Path>) -> Result<ConfigFile> {
    let mut raw = match path {
        Some(p) => load_from_path(p)?,
        None => {
            let default = default_config_path();
            if default.is_file() {
                load_from_path(&default)?
            } else {
                debug!(path = %default.display(), "no config file; using defaults");
                RawConfigFile::default()
            }
        }
    };

    apply_env_overrides(&mut raw, |key| std::env::var(key).ok())?;
    ConfigFile::try_from(raw)
}

/// Apply `DAYPLAN_*` overrides using `lookup` to read variables.
///
/// Taking the lookup as a parameter keeps this testable without touching
/// the process environment.
pub fn apply_env_overrides(
    raw: &mut RawConfigFile,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    let cfg = &mut raw.config;

    if let Some(plan) = lookup(ENV_PLAN).filter(|v| !v.trim().is_empty()) {
        cfg.plan = PathBuf::from(plan.trim());
    }

    if let Some(raw_n) = lookup(ENV_CONCURRENCY) {
        cfg.concurrency = raw_n.trim().parse().map_err(|_| {
            DayplanError::Config(format!("{ENV_CONCURRENCY} must be an integer (got '{raw_n}')"))
        })?;
    }

    if let Some(db) = lookup(ENV_DB).filter(|v| !v.trim().is_empty()) {
        cfg.db = Some(PathBuf::from(db.trim()));
    }

    if let Some(dir) = lookup(ENV_ART_DIR).filter(|v| !v.trim().is_empty()) {
        cfg.artifact_dir = PathBuf::from(dir.trim());
    }

    if let Some(policy) = lookup(ENV_FAILURE_POLICY).filter(|v| !v.trim().is_empty()) {
        cfg.failure_policy = policy
            .parse()
            .map_err(|e| DayplanError::Config(format!("{ENV_FAILURE_POLICY}: {e}")))?;
    }

    Ok(())
}

/// Default config location: `Dayplan.toml` in the working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Dayplan.toml")
}
