// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DayplanError {
    #[error("Plan not found: {}", .0.display())]
    PlanNotFound(PathBuf),

    #[error("Plan CSV error: {0}")]
    PlanCsv(#[from] csv::Error),

    /// Row-level problem while loading a plan. Logged and skipped by the
    /// loader; never returned from `load`.
    #[error("Row {row}: {reason}")]
    RowParse { row: usize, reason: String },

    #[error("Cycle detected in plan involving day {0}")]
    PlanCycle(u32),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Recorder error: {0}")]
    Recorder(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for DayplanError {
    fn from(err: rusqlite::Error) -> Self {
        DayplanError::Recorder(err.to_string())
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DayplanError>;
