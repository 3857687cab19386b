// src/exec/dispatcher.rs

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::exec::handler::{HandlerContext, MetricMap, MetricValue};
use crate::exec::registry::HandlerRegistry;
use crate::plan::TaskNode;

/// What a dispatch produced: a success flag and the handler's metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchResult {
    pub ok: bool,
    pub metrics: MetricMap,
}

impl DispatchResult {
    fn failed(message: impl Into<String>) -> Self {
        let mut metrics = MetricMap::new();
        metrics.insert("error".to_string(), MetricValue::Text(message.into()));
        Self { ok: false, metrics }
    }
}

/// Resolves a node's role to a handler and invokes it.
///
/// Nothing a handler does escapes `dispatch`: errors, panics and timeouts
/// all come back as `ok = false` with an `error` metric.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: HandlerRegistry,
    ctx: HandlerContext,
    timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(registry: HandlerRegistry, ctx: HandlerContext) -> Self {
        Self {
            registry,
            ctx,
            timeout: None,
        }
    }

    /// Fail handlers that run longer than `timeout`. The handler task is
    /// aborted and has stopped by the time `dispatch` returns.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn context(&self) -> &HandlerContext {
        &self.ctx
    }

    pub async fn dispatch(&self, node: Arc<TaskNode>) -> DispatchResult {
        let day = node.day;

        let Some((handler_name, handler)) = self.registry.resolve(&node.role) else {
            warn!(day, role = %node.role, "no handler registered and no default handler");
            return DispatchResult::failed(format!(
                "no handler registered for role '{}'",
                node.role
            ));
        };

        info!(day, role = %node.role, handler = %handler_name, "invoking handler");

        let ctx = self.ctx.clone();
        // Own task so a panicking handler is contained.
        let mut join = tokio::spawn(async move { handler.run(&node, &ctx).await });

        let joined = match self.timeout {
            Some(limit) => {
                let waited = tokio::time::timeout(limit, &mut join).await;
                match waited {
                    Ok(joined) => joined,
                    Err(_) => {
                        warn!(day, handler = %handler_name, ?limit, "handler timed out; aborting");
                        join.abort();
                        // Wait for the abort so the concurrency slot is really free.
                        let _ = join.await;
                        return DispatchResult::failed(format!(
                            "handler '{handler_name}' timed out after {limit:?}"
                        ));
                    }
                }
            }
            None => join.await,
        };

        match joined {
            Ok(Ok(metrics)) => {
                debug!(day, handler = %handler_name, metrics = metrics.len(), "handler succeeded");
                DispatchResult { ok: true, metrics }
            }
            Ok(Err(err)) => {
                warn!(day, handler = %handler_name, error = %err, "handler failed");
                DispatchResult::failed(format!("{err:#}"))
            }
            Err(join_err) if join_err.is_panic() => {
                let message = panic_message(join_err.into_panic());
                warn!(day, handler = %handler_name, panic = %message, "handler panicked");
                DispatchResult::failed(format!("handler panicked: {message}"))
            }
            Err(join_err) => {
                warn!(day, handler = %handler_name, error = %join_err, "handler task cancelled");
                DispatchResult::failed(join_err.to_string())
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
