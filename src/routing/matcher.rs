//! Path matching.
//!
//! # Responsibilities
//! - Index every route template in a per-method segment trie
//! - Match a concrete request path, capturing parameter segments
//!
//! # Design Decisions
//! - Literal children are tried before the parameter child at every depth,
//!   falling back to the parameter branch when the literal branch dead-ends
//! - A parameter captures exactly one non-empty segment, never a `/`
//! - Segments are percent-decoded after splitting, so `%2F` stays inside one
//!   segment
//! - No regex; matching cost is bounded by path depth times backtracking

use std::collections::HashMap;

use percent_encoding::percent_decode_str;

use super::template::{Method, PathTemplate, Segment};

#[derive(Debug, Default)]
struct Node {
    literals: HashMap<String, Node>,
    param: Option<Box<Node>>,
    route: Option<usize>,
}

/// Segment trie over all route templates, one root per method.
#[derive(Debug, Default)]
pub struct PathMatcher {
    roots: HashMap<Method, Node>,
}

impl PathMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `template` for `method` as route number `route`.
    ///
    /// Two templates that differ only in parameter names land on the same
    /// node. In that case nothing is changed and the route already occupying
    /// the node is returned.
    pub fn insert(&mut self, method: Method, template: &PathTemplate, route: usize) -> Option<usize> {
        let mut node = self.roots.entry(method).or_default();
        for segment in template.segments() {
            node = match segment {
                Segment::Literal(lit) => node.literals.entry(lit.clone()).or_default(),
                Segment::Param(_) => node.param.get_or_insert_with(Box::default).as_mut(),
            };
        }
        match node.route {
            Some(existing) => Some(existing),
            None => {
                node.route = Some(route);
                None
            }
        }
    }

    /// Find the route for `path`, returning its index and the captured
    /// parameter values in template order.
    pub fn find(&self, method: Method, path: &str) -> Option<(usize, Vec<String>)> {
        let root = self.roots.get(&method)?;
        let segments = split_path(path)?;
        let mut captures = Vec::new();
        let route = walk(root, &segments, &mut captures)?;
        Some((route, captures))
    }
}

fn walk(node: &Node, rest: &[String], captures: &mut Vec<String>) -> Option<usize> {
    let Some((head, tail)) = rest.split_first() else {
        return node.route;
    };

    if let Some(child) = node.literals.get(head) {
        if let Some(found) = walk(child, tail, captures) {
            return Some(found);
        }
    }

    if let Some(child) = &node.param {
        captures.push(head.clone());
        if let Some(found) = walk(child, tail, captures) {
            return Some(found);
        }
        captures.pop();
    }

    None
}

/// Split a request path into decoded segments.
///
/// `/` is the empty sequence and one trailing slash is ignored. Paths that are
/// not absolute, contain an empty interior segment, or decode to invalid
/// UTF-8 yield `None`.
pub fn split_path(path: &str) -> Option<Vec<String>> {
    let rest = path.strip_prefix('/')?;
    let rest = rest.strip_suffix('/').unwrap_or(rest);
    if rest.is_empty() {
        return Some(Vec::new());
    }
    rest.split('/')
        .map(|raw| {
            if raw.is_empty() {
                return None;
            }
            percent_decode_str(raw)
                .decode_utf8()
                .ok()
                .map(|s| s.into_owned())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(routes: &[(Method, &str)]) -> PathMatcher {
        let mut m = PathMatcher::new();
        for (i, (method, template)) in routes.iter().enumerate() {
            let template = PathTemplate::parse(template).unwrap();
            assert_eq!(m.insert(*method, &template, i), None);
        }
        m
    }

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("/"), Some(vec![]));
        assert_eq!(split_path("/about/"), Some(vec!["about".to_string()]));
        assert_eq!(
            split_path("/blog/hello%20world"),
            Some(vec!["blog".to_string(), "hello world".to_string()])
        );
        assert_eq!(
            split_path("/a%2Fb"),
            Some(vec!["a/b".to_string()])
        );
        assert_eq!(split_path("/blog//x"), None);
        assert_eq!(split_path("/about//"), None);
        assert_eq!(split_path("relative"), None);
        assert_eq!(split_path("/%FF"), None);
    }

    #[test]
    fn test_literal_beats_param() {
        let m = matcher(&[
            (Method::Get, "/posts/[id]"),
            (Method::Get, "/posts/new"),
        ]);
        assert_eq!(m.find(Method::Get, "/posts/new"), Some((1, vec![])));
        assert_eq!(m.find(Method::Get, "/posts/42"), Some((0, vec!["42".to_string()])));
    }

    #[test]
    fn test_backtracks_from_dead_literal_branch() {
        let m = matcher(&[
            (Method::Get, "/blog/category/[slug]"),
            (Method::Get, "/blog/[slug]/comments"),
        ]);
        assert_eq!(
            m.find(Method::Get, "/blog/category/comments"),
            Some((0, vec!["comments".to_string()]))
        );
        assert_eq!(
            m.find(Method::Get, "/blog/category"),
            None
        );

        // `category` takes the literal branch first, which has no `y` child.
        let m = matcher(&[
            (Method::Get, "/blog/category/x"),
            (Method::Get, "/blog/[slug]/y"),
        ]);
        assert_eq!(
            m.find(Method::Get, "/blog/category/y"),
            Some((1, vec!["category".to_string()]))
        );
    }

    #[test]
    fn test_method_is_part_of_identity() {
        let m = matcher(&[
            (Method::Get, "/admin/posts"),
            (Method::Post, "/admin/posts"),
        ]);
        assert_eq!(m.find(Method::Post, "/admin/posts"), Some((1, vec![])));
        assert_eq!(m.find(Method::Delete, "/admin/posts"), None);
    }

    #[test]
    fn test_param_never_spans_segments() {
        let m = matcher(&[(Method::Get, "/blog/[slug]")]);
        assert_eq!(m.find(Method::Get, "/blog/a/b"), None);
        assert_eq!(m.find(Method::Get, "/blog"), None);
        assert_eq!(m.find(Method::Get, "/blog/"), None);
    }

    #[test]
    fn test_same_shape_is_rejected() {
        let mut m = PathMatcher::new();
        let a = PathTemplate::parse("/posts/[id]/edit").unwrap();
        let b = PathTemplate::parse("/posts/[slug]/edit").unwrap();
        assert_eq!(m.insert(Method::Get, &a, 0), None);
        assert_eq!(m.insert(Method::Get, &b, 1), Some(0));
        assert_eq!(m.insert(Method::Put, &b, 2), None);
    }

    #[test]
    fn test_root_template() {
        let m = matcher(&[(Method::Get, "/")]);
        assert_eq!(m.find(Method::Get, "/"), Some((0, vec![])));
        assert_eq!(m.find(Method::Get, "/x"), None);
    }

    #[test]
    fn test_literals_are_case_sensitive() {
        let m = matcher(&[(Method::Get, "/about")]);
        assert_eq!(m.find(Method::Get, "/About"), None);
    }
}
