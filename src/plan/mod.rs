// src/plan/mod.rs

//! Plan ingestion.
//!
//! - [`model`] defines the task node and plan types.
//! - [`loader`] parses a CSV plan into a [`Plan`], tolerating messy rows.

pub mod loader;
pub mod model;

pub use loader::{load, load_from_reader, role_from_label};
pub use model::{Payload, Plan, TaskNode};
