// src/exec/registry.rs

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::exec::handler::Handler;

/// Role every unknown role falls back to.
pub const DEFAULT_ROLE: &str = "generic";

/// Normalize a role for registry lookup: lowercase, with whitespace and
/// dash runs collapsed to a single `_`.
///
/// `"Codex Herald"` → `"codex_herald"`.
pub fn normalize_role(role: &str) -> String {
    role.to_lowercase()
        .split(|c: char| c.is_whitespace() || matches!(c, '-' | '–' | '—' | '_'))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Startup-time mapping from normalized role to handler.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut roles: Vec<_> = self.handlers.keys().collect();
        roles.sort();
        f.debug_struct("HandlerRegistry")
            .field("roles", &roles)
            .finish()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in artifact handlers.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        crate::behaviors::register_builtin(&mut registry);
        registry
    }

    /// Register `handler` for `role` (normalized), replacing any previous one.
    pub fn register(&mut self, role: &str, handler: Arc<dyn Handler>) -> &mut Self {
        self.handlers.insert(normalize_role(role), handler);
        self
    }

    pub fn contains(&self, role: &str) -> bool {
        self.handlers.contains_key(&normalize_role(role))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Resolve a role to `(resolved_name, handler)`, falling back to
    /// [`DEFAULT_ROLE`]. `None` only if neither is registered.
    pub fn resolve(&self, role: &str) -> Option<(String, Arc<dyn Handler>)> {
        let name = normalize_role(role);
        if let Some(h) = self.handlers.get(&name) {
            return Some((name, Arc::clone(h)));
        }

        debug!(role = %role, "no handler for role; using default");
        self.handlers
            .get(DEFAULT_ROLE)
            .map(|h| (DEFAULT_ROLE.to_string(), Arc::clone(h)))
    }
}
