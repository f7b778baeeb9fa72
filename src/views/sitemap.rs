//! `sitemap.xml` rendering.

use askama::Template;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SitemapUrl {
    pub loc: String,
    /// `YYYY-MM-DD`.
    pub lastmod: String,
    pub changefreq: String,
    pub priority: String,
}

impl SitemapUrl {
    pub fn new(loc: String, lastmod: String, changefreq: &str, priority: &str) -> Self {
        Self {
            loc,
            lastmod,
            changefreq: changefreq.to_string(),
            priority: priority.to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "sitemap.xml")]
struct Sitemap<'a> {
    urls: &'a [SitemapUrl],
}

pub fn render(urls: &[SitemapUrl]) -> askama::Result<String> {
    Sitemap { urls }.render()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_escapes_locations() {
        let xml = render(&[SitemapUrl::new(
            "http://x/blog?a=1&b=2".into(),
            "2026-01-01".into(),
            "daily",
            "1.0",
        )])
        .unwrap();
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<loc>http://x/blog?a=1&amp;b=2</loc>"));
        assert!(xml.contains("<priority>1.0</priority>"));
        assert!(xml.trim_end().ends_with("</urlset>"));
    }
}
