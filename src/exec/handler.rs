// src/exec/handler.rs

use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use serde::Serialize;

use crate::plan::TaskNode;
use crate::types::Day;

/// A single metric entry returned by a handler.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

impl From<f64> for MetricValue {
    fn from(n: f64) -> Self {
        MetricValue::Number(n)
    }
}

impl From<usize> for MetricValue {
    fn from(n: usize) -> Self {
        MetricValue::Number(n as f64)
    }
}

impl From<String> for MetricValue {
    fn from(s: String) -> Self {
        MetricValue::Text(s)
    }
}

impl From<&str> for MetricValue {
    fn from(s: &str) -> Self {
        MetricValue::Text(s.to_string())
    }
}

pub type MetricMap = BTreeMap<String, MetricValue>;

/// Shared, read-only context handed to every handler invocation.
#[derive(Debug, Clone)]
pub struct HandlerContext {
    pub artifact_dir: PathBuf,
}

impl HandlerContext {
    pub fn new(artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            artifact_dir: artifact_dir.into(),
        }
    }

    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    /// Path of an artifact named `day<NNN>_<suffix>.<ext>`.
    pub fn artifact_path(&self, day: Day, suffix: &str, ext: &str) -> PathBuf {
        self.artifact_dir.join(artifact_file_name(day, suffix, ext))
    }
}

/// `day<NNN>_<suffix>.<ext>`, with the day zero-padded to three digits.
pub fn artifact_file_name(day: Day, suffix: &str, ext: &str) -> String {
    format!("day{day:03}_{suffix}.{ext}")
}

pub type HandlerFuture<'a> =
    Pin<Box<dyn Future<Output = anyhow::Result<MetricMap>> + Send + 'a>>;

/// A role-specific unit of work.
///
/// `Ok(metrics)` means success; `Err` means the handler failed. The
/// dispatcher turns errors (and panics) into `(false, {"error": ...})`.
pub trait Handler: Send + Sync {
    fn run<'a>(&'a self, node: &'a TaskNode, ctx: &'a HandlerContext) -> HandlerFuture<'a>;
}

/// Adapter turning an async closure into a [`Handler`].
///
/// The closure receives owned copies of the node and context so the
/// returned future can be `'static`.
pub struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(TaskNode, HandlerContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<MetricMap>> + Send + 'static,
{
    fn run<'a>(&'a self, node: &'a TaskNode, ctx: &'a HandlerContext) -> HandlerFuture<'a> {
        Box::pin((self.f)(node.clone(), ctx.clone()))
    }
}
