//! Server-side HTML and XML rendering.
//!
//! Every page is an askama template under `templates/`. Templates with an
//! `.html` or `.xml` extension escape every interpolated value; the only
//! value marked `|safe` is `Post::content_html`, which is sanitized when it
//! is rendered from markdown.

pub mod admin;
pub mod auth;
pub mod blog;
pub mod sitemap;

use askama::Template;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pipeline::CurrentUser;

pub fn format_date(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

/// Per-request page furniture: site name and the signed-in user.
#[derive(Debug, Clone, Default)]
pub struct Chrome {
    pub site_name: String,
    pub user: Option<CurrentUser>,
}

/// Page numbers for list views. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: usize, per_page: usize, total: usize) -> Self {
        let per_page = per_page.max(1);
        let total_pages = total.div_ceil(per_page);
        Self {
            page,
            per_page,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }

    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

/// Previous/next links for a listing at `base`, which may already carry a
/// query string. Rendered by `partials/pagination.html`.
#[derive(Debug, Clone)]
pub(crate) struct PageLinks {
    base: String,
    pub pagination: Pagination,
}

impl PageLinks {
    pub(crate) fn new(base: impl Into<String>, pagination: &Pagination) -> Self {
        Self {
            base: base.into(),
            pagination: *pagination,
        }
    }

    pub(crate) fn visible(&self) -> bool {
        self.pagination.total_pages > 1
    }

    fn href(&self, page: usize) -> String {
        let sep = if self.base.contains('?') { '&' } else { '?' };
        format!("{}{sep}page={page}", self.base)
    }

    pub(crate) fn prev_href(&self) -> String {
        self.href(self.pagination.page.saturating_sub(1))
    }

    pub(crate) fn next_href(&self) -> String {
        self.href(self.pagination.page + 1)
    }
}

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorPage<'a> {
    status: u16,
    message: &'a str,
}

/// Minimal page for status errors (404, 403, 500).
pub fn error_page(status: u16, message: &str) -> askama::Result<String> {
    ErrorPage { status, message }.render()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination() {
        let p = Pagination::new(2, 10, 25);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_next && p.has_prev);
        assert_eq!(p.offset(), 10);

        let p = Pagination::new(1, 10, 0);
        assert_eq!(p.total_pages, 0);
        assert!(!p.has_next && !p.has_prev);

        let links = PageLinks::new("/blog/search?q=rust", &Pagination::new(2, 10, 25));
        assert!(links.visible());
        assert_eq!(links.prev_href(), "/blog/search?q=rust&page=1");
        assert_eq!(links.next_href(), "/blog/search?q=rust&page=3");
        assert_eq!(PageLinks::new("/blog", &Pagination::new(1, 10, 25)).next_href(), "/blog?page=2");
    }

    #[test]
    fn test_error_page_escapes_message() {
        let html = error_page(404, "No <b>post</b> here").unwrap();
        assert!(html.contains("<h1>404</h1>"));
        assert!(html.contains("No &lt;b&gt;post&lt;/b&gt; here"));
        assert!(html.contains(r#"href="/static/css/style.css""#));
    }
}
