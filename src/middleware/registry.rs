//! Middleware lookup by configured id.

use std::collections::HashMap;
use std::sync::Arc;

use crate::middleware::{HeaderValidation, Middleware};

#[derive(Clone, Default)]
pub struct MiddlewareRegistry {
    entries: HashMap<String, Arc<dyn Middleware>>,
}

impl MiddlewareRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the middlewares shipped in this crate.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(HeaderValidation::ID, Arc::new(HeaderValidation));
        registry
    }

    /// Register under `id`, replacing any previous entry.
    pub fn register(&mut self, id: impl Into<String>, middleware: Arc<dyn Middleware>) {
        self.entries.insert(id.into(), middleware);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Middleware>> {
        self.entries.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}
