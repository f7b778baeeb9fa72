//! Route table construction from a feature tree.
//!
//! # Layout
//! ```text
//! features/
//!   admin/posts/[id]/@put/
//!     index.toml              initializer = "..."        (optional)
//!     steps/100-guard.toml    handler = "guard.require_admin"
//!     steps/200-validate.toml handler = "admin.posts.validate"
//! ```
//! Directories above a method marker form the path template; files below it
//! form the pipeline. Handler names are resolved through a [`StepRegistry`].

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use super::router::{RouteDefinition, RouteStep, RouteTable};
use super::template::{Method, PathTemplate, Segment, SegmentError};
use super::tree::{EntryKind, FeatureEntry, FeatureTree, ScanError};
use crate::pipeline::StepRegistry;

const STEPS_DIR: &str = "steps";
const INDEX_FILE: &str = "index.toml";

/// Build-time configuration error. Any of these aborts startup.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("{path}: {source}")]
    Segment {
        path: String,
        #[source]
        source: SegmentError,
    },
    #[error("{path}: parameter `{name}` appears more than once")]
    DuplicateParam { path: String, name: String },
    #[error("{path}: method directory nested inside another method directory")]
    NestedMethod { path: String },
    #[error("{path}: unexpected entry in feature tree")]
    UnexpectedEntry { path: String },
    #[error("{path}: invalid declaration: {source}")]
    InvalidDeclaration {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("{path}: unknown step handler `{handler}`")]
    UnknownHandler { path: String, handler: String },
    #[error("{method} {template} conflicts with {method} {existing}")]
    DuplicateRoute {
        method: Method,
        template: String,
        existing: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StepDeclaration {
    handler: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct IndexDeclaration {
    initializer: Option<String>,
}

struct RouteDraft {
    method: Method,
    template: PathTemplate,
    steps: Vec<RouteStep>,
    initializer: Option<RouteStep>,
}

/// Turns a [`FeatureTree`] into a [`RouteTable`].
pub struct RouteTableBuilder<'r> {
    registry: &'r StepRegistry,
}

impl<'r> RouteTableBuilder<'r> {
    pub fn new(registry: &'r StepRegistry) -> Self {
        Self { registry }
    }

    /// Scan `root` on disk and build.
    pub fn build_from_dir(&self, root: &Path) -> Result<RouteTable, BuildError> {
        let tree = FeatureTree::scan(root)?;
        self.build(&tree)
    }

    pub fn build(&self, tree: &FeatureTree) -> Result<RouteTable, BuildError> {
        let mut drafts: BTreeMap<Vec<String>, RouteDraft> = BTreeMap::new();

        for entry in tree.entries() {
            self.add_entry(entry, &mut drafts)?;
        }

        let routes: Vec<RouteDefinition> = drafts
            .into_iter()
            .map(|(dir, draft)| {
                RouteDefinition::new(draft.method, draft.template, draft.steps, draft.initializer)
                    .with_source(dir.join("/"))
            })
            .collect();

        for route in &routes {
            tracing::debug!(
                route = %route,
                steps = route.steps().len(),
                initializer = route.initializer().is_some(),
                "Route built"
            );
        }

        RouteTable::new(routes)
    }

    fn add_entry(
        &self,
        entry: &FeatureEntry,
        drafts: &mut BTreeMap<Vec<String>, RouteDraft>,
    ) -> Result<(), BuildError> {
        let path = entry.display_path();
        let segments = entry.segments();
        let dirs = match entry.kind() {
            EntryKind::Dir => segments,
            EntryKind::File(_) => &segments[..segments.len().saturating_sub(1)],
        };

        let mut marker: Option<(usize, Method)> = None;
        for (i, name) in dirs.iter().enumerate() {
            if !name.starts_with('@') {
                continue;
            }
            let method = Method::from_marker(name).ok_or_else(|| BuildError::Segment {
                path: path.clone(),
                source: SegmentError::UnknownMarker(name.clone()),
            })?;
            if marker.is_some() {
                return Err(BuildError::NestedMethod { path });
            }
            marker = Some((i, method));
        }

        let Some((marker_idx, method)) = marker else {
            return match entry.kind() {
                EntryKind::Dir => parse_template(&path, dirs).map(|_| ()),
                EntryKind::File(_) => Err(BuildError::UnexpectedEntry { path }),
            };
        };

        let key = dirs[..=marker_idx].to_vec();
        if !drafts.contains_key(&key) {
            let template = parse_template(&path, &dirs[..marker_idx])?;
            drafts.insert(
                key.clone(),
                RouteDraft {
                    method,
                    template,
                    steps: Vec::new(),
                    initializer: None,
                },
            );
        }
        let draft = drafts
            .get_mut(&key)
            .ok_or_else(|| BuildError::UnexpectedEntry { path: path.clone() })?;

        let below = &dirs[marker_idx + 1..];
        match (entry.kind(), below) {
            (EntryKind::Dir, []) => Ok(()),
            (EntryKind::Dir, [steps]) if steps == STEPS_DIR => Ok(()),
            (EntryKind::File(source), []) if segments.last().map(String::as_str) == Some(INDEX_FILE) => {
                let decl: IndexDeclaration = parse_declaration(&path, source)?;
                if let Some(handler) = decl.initializer {
                    let step = self.resolve(&path, "index", &handler)?;
                    draft.initializer = Some(step);
                }
                Ok(())
            }
            (EntryKind::File(source), [steps]) if steps == STEPS_DIR => {
                let decl: StepDeclaration = parse_declaration(&path, source)?;
                let name = segments.last().cloned().unwrap_or_default();
                let step = self.resolve(&path, &name, &decl.handler)?;
                draft.steps.push(step.with_description(decl.description));
                Ok(())
            }
            _ => Err(BuildError::UnexpectedEntry { path }),
        }
    }

    fn resolve(&self, path: &str, name: &str, handler: &str) -> Result<RouteStep, BuildError> {
        let step = self
            .registry
            .get(handler)
            .ok_or_else(|| BuildError::UnknownHandler {
                path: path.to_string(),
                handler: handler.to_string(),
            })?;
        Ok(RouteStep::new(name, handler, step))
    }
}

fn parse_template(path: &str, dirs: &[String]) -> Result<PathTemplate, BuildError> {
    let segments = dirs
        .iter()
        .map(|d| Segment::parse(d))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| BuildError::Segment {
            path: path.to_string(),
            source,
        })?;
    let template = PathTemplate::new(segments);
    if let Some(name) = template.duplicate_param() {
        return Err(BuildError::DuplicateParam {
            path: path.to_string(),
            name: name.to_string(),
        });
    }
    Ok(template)
}

fn parse_declaration<T: serde::de::DeserializeOwned>(path: &str, source: &str) -> Result<T, BuildError> {
    toml::from_str(source).map_err(|source| BuildError::InvalidDeclaration {
        path: path.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Flow, RequestContext, ResponseWriter, StepFuture, StepRequest};

    fn noop<'a>(
        _ctx: &'a mut RequestContext,
        _req: &'a StepRequest,
        _res: &'a mut ResponseWriter,
    ) -> StepFuture<'a> {
        Box::pin(async move { Ok(Flow::Continue) })
    }

    fn registry() -> StepRegistry {
        let mut registry = StepRegistry::new();
        for name in ["fetch", "render", "auth", "validate", "create", "init"] {
            registry.register(name, noop);
        }
        registry
    }

    fn step(path: &str, handler: &str) -> FeatureEntry {
        FeatureEntry::file(path, format!("handler = \"{handler}\""))
    }

    #[test]
    fn test_builds_routes_from_tree() {
        let registry = registry();
        let tree = FeatureTree::from_entries([
            step("about/@get/steps/200-render.toml", "render"),
            step("about/@get/steps/100-fetch.toml", "fetch"),
            step("admin/categories/@post/steps/100-auth.toml", "auth"),
            step("admin/categories/@post/steps/200-validate.toml", "validate"),
            step("admin/categories/@post/steps/300-create.toml", "create"),
            step("@get/steps/100-fetch.toml", "fetch"),
        ]);
        let table = RouteTableBuilder::new(&registry).build(&tree).unwrap();
        assert_eq!(table.len(), 3);

        let about = table.lookup(Method::Get, "/about").unwrap();
        let names: Vec<&str> = about.route.steps().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["100-fetch.toml", "200-render.toml"]);
        assert_eq!(about.route.source(), Some("about/@get"));

        let create = table.lookup(Method::Post, "/admin/categories").unwrap();
        let handlers: Vec<&str> = create.route.steps().iter().map(|s| s.handler_key()).collect();
        assert_eq!(handlers, vec!["auth", "validate", "create"]);

        assert!(table.lookup(Method::Get, "/").is_some());
    }

    #[test]
    fn test_initializer_and_empty_method_dir() {
        let registry = registry();
        let tree = FeatureTree::from_entries([
            FeatureEntry::file("sitemap.xml/@get/index.toml", "initializer = \"init\""),
            step("sitemap.xml/@get/steps/200-render.toml", "render"),
            FeatureEntry::dir("ping/@get"),
        ]);
        let table = RouteTableBuilder::new(&registry).build(&tree).unwrap();

        let sitemap = table.lookup(Method::Get, "/sitemap.xml").unwrap();
        assert_eq!(sitemap.route.initializer().map(|s| s.handler_key()), Some("init"));

        let ping = table.lookup(Method::Get, "/ping").unwrap();
        assert!(ping.route.steps().is_empty());
        assert!(ping.route.initializer().is_none());
    }

    #[test]
    fn test_params_from_brackets() {
        let registry = registry();
        let tree = FeatureTree::from_entries([step(
            "admin/posts/[id]/edit/@get/steps/200-fetch.toml",
            "fetch",
        )]);
        let table = RouteTableBuilder::new(&registry).build(&tree).unwrap();
        let m = table.lookup(Method::Get, "/admin/posts/42/edit").unwrap();
        assert_eq!(m.params.get("id").map(String::as_str), Some("42"));
    }

    #[test]
    fn test_duplicate_route_fails() {
        let registry = registry();
        let tree = FeatureTree::from_entries([
            step("posts/[id]/@get/steps/100-fetch.toml", "fetch"),
            step("posts/[slug]/@get/steps/100-fetch.toml", "fetch"),
        ]);
        let err = RouteTableBuilder::new(&registry).build(&tree).unwrap_err();
        assert!(matches!(err, BuildError::DuplicateRoute { .. }));
    }

    #[test]
    fn test_same_path_different_methods_is_fine() {
        let registry = registry();
        let tree = FeatureTree::from_entries([
            step("install/@get/steps/100-fetch.toml", "fetch"),
            step("install/@post/steps/100-validate.toml", "validate"),
        ]);
        let table = RouteTableBuilder::new(&registry).build(&tree).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_build_errors() {
        let registry = registry();
        let build = |entries: Vec<FeatureEntry>| {
            RouteTableBuilder::new(&registry).build(&FeatureTree::from_entries(entries))
        };

        assert!(matches!(
            build(vec![step("x/@head/steps/1.toml", "fetch")]),
            Err(BuildError::Segment { source: SegmentError::UnknownMarker(_), .. })
        ));
        assert!(matches!(
            build(vec![step("a/[]/@get/steps/1.toml", "fetch")]),
            Err(BuildError::Segment { source: SegmentError::EmptyParam(_), .. })
        ));
        assert!(matches!(
            build(vec![step("a/[id]/b/[id]/@get/steps/1.toml", "fetch")]),
            Err(BuildError::DuplicateParam { .. })
        ));
        assert!(matches!(
            build(vec![step("a/@get/@post/steps/1.toml", "fetch")]),
            Err(BuildError::NestedMethod { .. })
        ));
        assert!(matches!(
            build(vec![step("a/@get/steps/1.toml", "missing")]),
            Err(BuildError::UnknownHandler { handler, .. }) if handler == "missing"
        ));
        assert!(matches!(
            build(vec![FeatureEntry::file("a/@get/steps/1.toml", "handler = ")]),
            Err(BuildError::InvalidDeclaration { .. })
        ));
        assert!(matches!(
            build(vec![step("a/stray.toml", "fetch")]),
            Err(BuildError::UnexpectedEntry { .. })
        ));
        assert!(matches!(
            build(vec![step("a/@get/other.toml", "fetch")]),
            Err(BuildError::UnexpectedEntry { .. })
        ));
    }

    #[test]
    fn test_build_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let steps = dir.path().join("about/@get/steps");
        std::fs::create_dir_all(&steps).unwrap();
        std::fs::write(steps.join("100-fetch.toml"), "handler = \"fetch\"\ndescription = \"load\"").unwrap();
        std::fs::write(steps.join("200-render.toml"), "handler = \"render\"").unwrap();

        let registry = registry();
        let table = RouteTableBuilder::new(&registry)
            .build_from_dir(dir.path())
            .unwrap();
        let about = table.lookup(Method::Get, "/about/").unwrap();
        assert_eq!(about.route.steps().len(), 2);
        assert_eq!(about.route.steps()[0].description(), Some("load"));
    }
}
