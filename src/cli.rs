// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::types::FailurePolicy;

/// Command-line arguments for `dayplan`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dayplan",
    version,
    about = "Run a day-indexed task plan in dependency order.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Dayplan.toml` in the current working directory, if present.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DAYPLAN_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Execute the plan to completion.
    Run(RunArgs),
    /// Parse the plan and print nodes and dependencies without running.
    Plan(PlanArgs),
    /// Report progress recorded in the database.
    Status(StatusArgs),
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// CSV plan to execute.
    #[arg(long, value_name = "PATH")]
    pub plan: Option<PathBuf>,

    /// Maximum number of nodes running at once.
    #[arg(long, short = 'j', value_name = "N")]
    pub concurrency: Option<usize>,

    /// SQLite database for run/metric records.
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Directory for handler artifacts.
    #[arg(long, value_name = "DIR")]
    pub artifact_dir: Option<PathBuf>,

    /// What a failed node does to its dependents.
    #[arg(long, value_enum, value_name = "POLICY")]
    pub failure_policy: Option<PolicyArg>,

    /// Reject plans with dependency cycles before running.
    #[arg(long)]
    pub detect_cycles: bool,
}

#[derive(Debug, Clone, Args)]
pub struct PlanArgs {
    /// CSV plan to inspect.
    #[arg(long, value_name = "PATH")]
    pub plan: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct StatusArgs {
    /// CSV plan, used for the total node count.
    #[arg(long, value_name = "PATH")]
    pub plan: Option<PathBuf>,

    /// SQLite database written by earlier runs.
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum PolicyArg {
    UnlockChildren,
    HaltDependents,
}

impl From<PolicyArg> for FailurePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::UnlockChildren => FailurePolicy::UnlockChildren,
            PolicyArg::HaltDependents => FailurePolicy::HaltDependents,
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
