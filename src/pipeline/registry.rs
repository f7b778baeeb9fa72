//! Registry mapping handler names to step implementations.
//!
//! The feature tree only names handlers (`handler = "blog.fetch_post"`); the
//! registry, populated in code at startup, turns those names into callable
//! steps when the route table is built.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::step::Step;

#[derive(Clone, Default)]
pub struct StepRegistry {
    steps: HashMap<String, Arc<dyn Step>>,
}

impl StepRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a step under `name`. A second registration replaces the first.
    pub fn register(&mut self, name: &str, step: impl Step) -> &mut Self {
        self.register_arc(name, Arc::new(step))
    }

    pub fn register_arc(&mut self, name: &str, step: Arc<dyn Step>) -> &mut Self {
        if self.steps.insert(name.to_string(), step).is_some() {
            tracing::warn!(handler = name, "Step handler registered twice; keeping the latest");
        }
        self
    }

    /// Look up a handler by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Step>> {
        self.steps.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.steps.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.steps.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepRegistry")
            .field("steps", &self.names())
            .finish()
    }
}
