//! Public blog pages.

use askama::Template;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{Category, Comment, Post, Tag, TechStack};
use crate::views::{format_date, Chrome, PageLinks, Pagination};

/// Name and slug of a category or tag, as shown next to a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub slug: String,
}

impl From<&Category> for Label {
    fn from(c: &Category) -> Self {
        Self {
            name: c.name.clone(),
            slug: c.slug.clone(),
        }
    }
}

impl From<&Tag> for Label {
    fn from(t: &Tag) -> Self {
        Self {
            name: t.name.clone(),
            slug: t.slug.clone(),
        }
    }
}

/// A post as shown in listings and returned by the search API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostCard {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub cover_image: Option<String>,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub view_count: u64,
    pub created_at: DateTime<Utc>,
    pub author_name: String,
    pub category: Option<Label>,
    pub tags: Vec<Label>,
}

impl PostCard {
    pub fn display_date(&self) -> String {
        format_date(self.published_at.as_ref().unwrap_or(&self.created_at))
    }

    pub fn created_date(&self) -> String {
        format_date(&self.created_at)
    }
}

/// A single post with everything its page shows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetail {
    pub post: Post,
    pub author_name: String,
    pub category: Option<Label>,
    pub tags: Vec<Label>,
}

/// Data for the About page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AboutData {
    pub title: String,
    pub description: String,
    pub app_name: String,
    /// `"<icon> <title>"` lines.
    pub features: Vec<String>,
    pub tech_stacks: Vec<TechStack>,
}

/// A comment with its display date.
struct CommentView<'a> {
    id: &'a str,
    author_name: &'a str,
    content: &'a str,
    date: String,
}

#[derive(Template)]
#[template(path = "blog/home.html")]
struct HomePage<'a> {
    chrome: &'a Chrome,
    title: &'a str,
    description: &'a str,
    posts: &'a [PostCard],
    empty: &'a str,
}

#[derive(Template)]
#[template(path = "blog/listing.html")]
struct ListingPage<'a> {
    chrome: &'a Chrome,
    title: &'a str,
    heading: &'a str,
    posts: &'a [PostCard],
    empty: &'a str,
    pager: PageLinks,
}

#[derive(Template)]
#[template(path = "blog/search.html")]
struct SearchPage<'a> {
    chrome: &'a Chrome,
    title: &'a str,
    query: &'a str,
    posts: &'a [PostCard],
    empty: &'a str,
    pager: PageLinks,
}

#[derive(Template)]
#[template(path = "blog/post.html")]
struct PostPage<'a> {
    chrome: &'a Chrome,
    title: &'a str,
    detail: &'a PostDetail,
    post: &'a Post,
    date: String,
    comments: Vec<CommentView<'a>>,
}

#[derive(Template)]
#[template(path = "blog/about.html")]
struct AboutPage<'a> {
    chrome: &'a Chrome,
    title: &'a str,
    data: &'a AboutData,
}

pub fn home(chrome: &Chrome, description: &str, posts: &[PostCard]) -> askama::Result<String> {
    HomePage {
        chrome,
        title: &chrome.site_name,
        description,
        posts,
        empty: "No posts yet.",
    }
    .render()
}

/// Paginated listing shared by `/blog`, categories and tags.
pub fn listing(
    chrome: &Chrome,
    title: &str,
    heading: &str,
    base_path: &str,
    posts: &[PostCard],
    pagination: &Pagination,
) -> askama::Result<String> {
    ListingPage {
        chrome,
        title,
        heading,
        posts,
        empty: "No posts found.",
        pager: PageLinks::new(base_path, pagination),
    }
    .render()
}

pub fn search(
    chrome: &Chrome,
    query: &str,
    posts: &[PostCard],
    pagination: &Pagination,
) -> askama::Result<String> {
    let base = format!(
        "/blog/search?q={}",
        url::form_urlencoded::byte_serialize(query.as_bytes()).collect::<String>()
    );
    SearchPage {
        chrome,
        title: "Search",
        query,
        posts,
        empty: "No posts found.",
        pager: PageLinks::new(base, pagination),
    }
    .render()
}

pub fn post(chrome: &Chrome, detail: &PostDetail, comments: &[Comment]) -> askama::Result<String> {
    let post = &detail.post;
    PostPage {
        chrome,
        title: &post.title,
        detail,
        post,
        date: format_date(post.published_at.as_ref().unwrap_or(&post.created_at)),
        comments: comments
            .iter()
            .map(|c| CommentView {
                id: &c.id,
                author_name: &c.author_name,
                content: &c.content,
                date: format_date(&c.created_at),
            })
            .collect(),
    }
    .render()
}

pub fn about(chrome: &Chrome, data: &AboutData) -> askama::Result<String> {
    AboutPage {
        chrome,
        title: &data.title,
        data,
    }
    .render()
}
