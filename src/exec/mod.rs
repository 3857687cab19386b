// src/exec/mod.rs

//! Handler execution layer.
//!
//! - [`handler`] defines the uniform handler contract and metric types.
//! - [`registry`] maps normalized role names to handlers.
//! - [`dispatcher`] resolves a node's handler, invokes it, and converts
//!   errors and panics into a failed outcome.
//! - [`task_runner`] runs one dispatched node end to end: recorder
//!   lifecycle, dispatch, metrics, completion event.
//! - [`backend`] provides the `ExecutorBackend` trait the runtime talks to,
//!   and the production `HandlerBackend`.

pub mod backend;
pub mod dispatcher;
pub mod handler;
pub mod registry;
pub mod task_runner;

pub use backend::{ExecutorBackend, HandlerBackend};
pub use dispatcher::{DispatchResult, Dispatcher};
pub use handler::{FnHandler, Handler, HandlerContext, HandlerFuture, MetricMap, MetricValue};
pub use registry::{normalize_role, HandlerRegistry, DEFAULT_ROLE};
