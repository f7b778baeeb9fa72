//! Path templates derived from feature-tree directory names.
//!
//! # Responsibilities
//! - Classify directory names (method marker, parameter, literal)
//! - Hold the ordered segment structure of a route's path
//!
//! # Design Decisions
//! - Literal segments are case-sensitive
//! - Parameter names only matter for binding, never for identity

use std::fmt;

/// HTTP methods a feature directory can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl Method {
    pub const ALL: [Method; 5] = [
        Method::Get,
        Method::Post,
        Method::Put,
        Method::Delete,
        Method::Patch,
    ];

    /// Parse a directory marker such as `@get`.
    ///
    /// Returns `None` for names that are not markers at all. Names starting
    /// with `@` that are not a known method are reported by the caller.
    pub fn from_marker(name: &str) -> Option<Self> {
        match name {
            "@get" => Some(Method::Get),
            "@post" => Some(Method::Post),
            "@put" => Some(Method::Put),
            "@delete" => Some(Method::Delete),
            "@patch" => Some(Method::Patch),
            _ => None,
        }
    }

    /// Map an incoming HTTP method. HEAD, OPTIONS and friends have no routes.
    pub fn from_http(method: &axum::http::Method) -> Option<Self> {
        match *method {
            axum::http::Method::GET => Some(Method::Get),
            axum::http::Method::POST => Some(Method::Post),
            axum::http::Method::PUT => Some(Method::Put),
            axum::http::Method::DELETE => Some(Method::Delete),
            axum::http::Method::PATCH => Some(Method::Patch),
            _ => None,
        }
    }

    /// Parse a method override value (`_method=PUT`), case-insensitive.
    pub fn from_override(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "PUT" => Some(Method::Put),
            "DELETE" => Some(Method::Delete),
            "PATCH" => Some(Method::Patch),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One segment of a path template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Must equal the request segment exactly.
    Literal(String),
    /// Matches any single non-empty request segment and binds it to the name.
    Param(String),
}

/// Why a directory name cannot become a path segment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SegmentError {
    #[error("parameter segment `{0}` has an empty name")]
    EmptyParam(String),
    #[error("segment `{0}` mixes brackets with literal text")]
    StrayBracket(String),
    #[error("segment `{0}` is an unknown method marker")]
    UnknownMarker(String),
}

impl Segment {
    /// Classify a plain (non-method) directory name.
    pub fn parse(name: &str) -> Result<Self, SegmentError> {
        if name.starts_with('@') {
            return Err(SegmentError::UnknownMarker(name.to_string()));
        }
        if let Some(inner) = name.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            if inner.is_empty() {
                return Err(SegmentError::EmptyParam(name.to_string()));
            }
            if inner.contains(['[', ']', '/']) {
                return Err(SegmentError::StrayBracket(name.to_string()));
            }
            return Ok(Segment::Param(inner.to_string()));
        }
        if name.contains(['[', ']']) {
            return Err(SegmentError::StrayBracket(name.to_string()));
        }
        Ok(Segment::Literal(name.to_string()))
    }

    pub fn is_param(&self) -> bool {
        matches!(self, Segment::Param(_))
    }
}

/// The ordered segment structure of a route path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PathTemplate {
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Parse a slash-separated template such as `/posts/[id]/edit`.
    pub fn parse(template: &str) -> Result<Self, SegmentError> {
        let segments = template
            .split('/')
            .filter(|s| !s.is_empty())
            .map(Segment::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Parameter names in path order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// First parameter name that appears more than once, if any.
    pub fn duplicate_param(&self) -> Option<&str> {
        let names: Vec<&str> = self.param_names().collect();
        names
            .iter()
            .enumerate()
            .find(|(i, name)| names[..*i].contains(name))
            .map(|(_, name)| *name)
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            match segment {
                Segment::Literal(lit) => write!(f, "/{}", lit)?,
                Segment::Param(name) => write!(f, "/[{}]", name)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_classification() {
        assert_eq!(Segment::parse("posts").unwrap(), Segment::Literal("posts".into()));
        assert_eq!(Segment::parse("[id]").unwrap(), Segment::Param("id".into()));
        assert_eq!(
            Segment::parse("sitemap.xml").unwrap(),
            Segment::Literal("sitemap.xml".into())
        );
        assert!(matches!(Segment::parse("[]"), Err(SegmentError::EmptyParam(_))));
        assert!(matches!(Segment::parse("a[id]"), Err(SegmentError::StrayBracket(_))));
        assert!(matches!(Segment::parse("@head"), Err(SegmentError::UnknownMarker(_))));
    }

    #[test]
    fn test_method_markers() {
        assert_eq!(Method::from_marker("@get"), Some(Method::Get));
        assert_eq!(Method::from_marker("@delete"), Some(Method::Delete));
        assert_eq!(Method::from_marker("@GET"), None);
        assert_eq!(Method::from_marker("posts"), None);
        assert_eq!(Method::from_override("put"), Some(Method::Put));
        assert_eq!(Method::from_override("GET"), None);
    }

    #[test]
    fn test_template_display() {
        let a = PathTemplate::parse("/posts/[id]/edit").unwrap();
        assert_eq!(a.len(), 3);
        assert_eq!(a.param_names().collect::<Vec<_>>(), vec!["id"]);
        assert_eq!(a.to_string(), "/posts/[id]/edit");
        assert_eq!(PathTemplate::default().to_string(), "/");
    }

    #[test]
    fn test_duplicate_param_detection() {
        let t = PathTemplate::parse("/a/[id]/b/[id]").unwrap();
        assert_eq!(t.duplicate_param(), Some("id"));
        let ok = PathTemplate::parse("/a/[id]/b/[slug]").unwrap();
        assert_eq!(ok.duplicate_param(), None);
    }
}
