//! Route definitions and the compiled route table.
//!
//! # Responsibilities
//! - Store compiled routes with their ordered steps
//! - Look up the matching route for a request
//! - Return the matched route or an explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (shared across requests without locks)
//! - Steps are sorted once, when the definition is created
//! - Explicit `None` rather than a silent default route

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::builder::BuildError;
use super::matcher::PathMatcher;
use super::template::{Method, PathTemplate};
use crate::pipeline::Step;

/// Path parameters extracted from a request, keyed by template name.
pub type PathParams = HashMap<String, String>;

/// A step bound into a route: its file name, order key and handler.
#[derive(Clone)]
pub struct RouteStep {
    name: String,
    position: Option<u64>,
    handler_key: String,
    description: Option<String>,
    handler: Arc<dyn Step>,
}

impl RouteStep {
    pub fn new(name: impl Into<String>, handler_key: impl Into<String>, handler: Arc<dyn Step>) -> Self {
        let name = name.into();
        Self {
            position: step_position(&name),
            name,
            handler_key: handler_key.into(),
            description: None,
            handler,
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Numeric prefix of the file name, if it has one.
    pub fn position(&self) -> Option<u64> {
        self.position
    }

    /// Registry name of the handler backing this step.
    pub fn handler_key(&self) -> &str {
        &self.handler_key
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn handler(&self) -> &dyn Step {
        self.handler.as_ref()
    }
}

impl fmt::Debug for RouteStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteStep")
            .field("name", &self.name)
            .field("position", &self.position)
            .field("handler", &self.handler_key)
            .finish()
    }
}

/// Leading ASCII digits of a step file stem.
///
/// `"100-fetch.toml"` is `Some(100)`; `"render.toml"` is `None`. A prefix too
/// large for `u64` sorts as the largest numeric position.
pub fn step_position(file_name: &str) -> Option<u64> {
    let digits: &str = {
        let end = file_name
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(file_name.len());
        &file_name[..end]
    };
    if digits.is_empty() {
        return None;
    }
    Some(digits.parse().unwrap_or(u64::MAX))
}

/// Execution order: numeric prefixes ascending, unnumbered after numbered,
/// ties by file name.
pub fn step_order(a: &RouteStep, b: &RouteStep) -> Ordering {
    let by_position = match (a.position, b.position) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_position.then_with(|| a.name.cmp(&b.name))
}

/// One (method, path template) pair with its pipeline.
#[derive(Debug, Clone)]
pub struct RouteDefinition {
    method: Method,
    template: PathTemplate,
    steps: Vec<RouteStep>,
    initializer: Option<RouteStep>,
    source: Option<String>,
}

impl RouteDefinition {
    pub fn new(
        method: Method,
        template: PathTemplate,
        mut steps: Vec<RouteStep>,
        initializer: Option<RouteStep>,
    ) -> Self {
        steps.sort_by(step_order);
        Self {
            method,
            template,
            steps,
            initializer,
            source: None,
        }
    }

    /// Record the feature-tree directory this route came from.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    pub fn steps(&self) -> &[RouteStep] {
        &self.steps
    }

    pub fn initializer(&self) -> Option<&RouteStep> {
        self.initializer.as_ref()
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

impl fmt::Display for RouteDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.template)
    }
}

/// A successful lookup.
#[derive(Debug, Clone)]
pub struct PathMatch<'t> {
    pub route: &'t RouteDefinition,
    pub params: PathParams,
}

impl PartialEq for PathMatch<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.route, other.route) && self.params == other.params
    }
}

/// All routes of the application, frozen after startup.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<RouteDefinition>,
    matcher: PathMatcher,
}

impl RouteTable {
    /// Compile `routes`. Two routes with the same method and the same
    /// literal structure (parameter names aside) are rejected.
    pub fn new(routes: Vec<RouteDefinition>) -> Result<Self, BuildError> {
        let mut matcher = PathMatcher::new();
        for (index, route) in routes.iter().enumerate() {
            if let Some(existing) = matcher.insert(route.method, &route.template, index) {
                return Err(BuildError::DuplicateRoute {
                    method: route.method,
                    template: route.template.to_string(),
                    existing: routes[existing].template.to_string(),
                });
            }
        }
        Ok(Self { routes, matcher })
    }

    /// Match a request. Pure: no I/O, no interior mutation.
    pub fn lookup(&self, method: Method, path: &str) -> Option<PathMatch<'_>> {
        let (index, captures) = self.matcher.find(method, path)?;
        let route = &self.routes[index];
        let params = route
            .template
            .param_names()
            .map(str::to_string)
            .zip(captures)
            .collect();
        Some(PathMatch { route, params })
    }

    /// Whether any method has a route for `path`.
    pub fn has_path(&self, path: &str) -> bool {
        Method::ALL
            .iter()
            .any(|m| self.matcher.find(*m, path).is_some())
    }

    pub fn routes(&self) -> &[RouteDefinition] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
