//! Admin pages.

use askama::Template;
use serde::{Deserialize, Serialize};

use crate::pipeline::FormData;
use crate::store::{Category, Post, PostStats, Tag};
use crate::views::blog::PostCard;
use crate::views::Chrome;

/// Values shown in the post editor, either from a stored post or from a
/// rejected submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostForm {
    pub id: Option<String>,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub cover_image: String,
    pub category_id: Option<String>,
    pub tag_ids: Vec<String>,
    pub published: bool,
}

impl PostForm {
    pub fn from_post(post: &Post) -> Self {
        Self {
            id: Some(post.id.clone()),
            title: post.title.clone(),
            content: post.content.clone(),
            excerpt: post.excerpt.clone().unwrap_or_default(),
            cover_image: post.cover_image.clone().unwrap_or_default(),
            category_id: post.category_id.clone(),
            tag_ids: post.tag_ids.clone(),
            published: post.published,
        }
    }

    pub fn from_form(id: Option<String>, form: &FormData) -> Self {
        Self {
            id,
            title: form.get("title").unwrap_or("").to_string(),
            content: form.get("content").unwrap_or("").to_string(),
            excerpt: form.get("excerpt").unwrap_or("").to_string(),
            cover_image: form.get("coverImage").unwrap_or("").to_string(),
            category_id: form.non_empty("categoryId").map(str::to_string),
            tag_ids: form.get_all("tagIds").into_iter().map(str::to_string).collect(),
            published: form.get("published") == Some("true"),
        }
    }
}

/// Blog and profile values on the settings page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsForm {
    pub blog_name: String,
    pub blog_description: String,
    pub display_name: String,
    pub email: String,
}

/// One `<option>` or checkbox in the post editor.
struct Choice<'a> {
    value: &'a str,
    label: &'a str,
    selected: bool,
}

#[derive(Template)]
#[template(path = "admin/dashboard.html")]
struct DashboardPage<'a> {
    chrome: &'a Chrome,
    title: &'a str,
    stats: &'a PostStats,
    recent: &'a [PostCard],
}

#[derive(Template)]
#[template(path = "admin/posts.html")]
struct PostsPage<'a> {
    chrome: &'a Chrome,
    title: &'a str,
    posts: &'a [PostCard],
}

#[derive(Template)]
#[template(path = "admin/post_form.html")]
struct PostEditor<'a> {
    chrome: &'a Chrome,
    title: &'a str,
    action: String,
    form: &'a PostForm,
    categories: Vec<Choice<'a>>,
    tags: Vec<Choice<'a>>,
    error: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "admin/categories.html")]
struct CategoriesPage<'a> {
    chrome: &'a Chrome,
    title: &'a str,
    categories: &'a [Category],
}

#[derive(Template)]
#[template(path = "admin/category_form.html")]
struct CategoryEditor<'a> {
    chrome: &'a Chrome,
    title: &'a str,
    name: &'a str,
    slug: &'a str,
    description: &'a str,
    order: &'a str,
    error: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "admin/tags.html")]
struct TagsPage<'a> {
    chrome: &'a Chrome,
    title: &'a str,
    tags: &'a [Tag],
}

#[derive(Template)]
#[template(path = "admin/tag_form.html")]
struct TagEditor<'a> {
    chrome: &'a Chrome,
    title: &'a str,
    name: &'a str,
    slug: &'a str,
    error: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "admin/settings.html")]
struct SettingsPage<'a> {
    chrome: &'a Chrome,
    title: &'a str,
    form: &'a SettingsForm,
    errors: &'a [String],
    success: Option<&'a str>,
}

pub fn dashboard(chrome: &Chrome, stats: &PostStats, recent: &[PostCard]) -> askama::Result<String> {
    DashboardPage {
        chrome,
        title: "Dashboard",
        stats,
        recent,
    }
    .render()
}

pub fn posts(chrome: &Chrome, posts: &[PostCard]) -> askama::Result<String> {
    PostsPage {
        chrome,
        title: "Posts",
        posts,
    }
    .render()
}

/// New-post editor when `form.id` is `None`, edit form otherwise.
pub fn post_form(
    chrome: &Chrome,
    form: &PostForm,
    categories: &[Category],
    tags: &[Tag],
    error: Option<&str>,
) -> askama::Result<String> {
    let (title, action) = match &form.id {
        Some(id) => ("Edit post", format!("/admin/posts/{id}?_method=PUT")),
        None => ("New post", "/admin/posts".to_string()),
    };
    PostEditor {
        chrome,
        title,
        action,
        form,
        categories: categories
            .iter()
            .map(|c| Choice {
                value: &c.id,
                label: &c.name,
                selected: form.category_id.as_deref() == Some(c.id.as_str()),
            })
            .collect(),
        tags: tags
            .iter()
            .map(|t| Choice {
                value: &t.id,
                label: &t.name,
                selected: form.tag_ids.contains(&t.id),
            })
            .collect(),
        error,
    }
    .render()
}

pub fn categories(chrome: &Chrome, categories: &[Category]) -> askama::Result<String> {
    CategoriesPage {
        chrome,
        title: "Categories",
        categories,
    }
    .render()
}

pub fn category_form(chrome: &Chrome, form: &FormData, error: Option<&str>) -> askama::Result<String> {
    CategoryEditor {
        chrome,
        title: "New category",
        name: form.get("name").unwrap_or(""),
        slug: form.get("slug").unwrap_or(""),
        description: form.get("description").unwrap_or(""),
        order: form.get("order").unwrap_or("0"),
        error,
    }
    .render()
}

pub fn tags(chrome: &Chrome, tags: &[Tag]) -> askama::Result<String> {
    TagsPage {
        chrome,
        title: "Tags",
        tags,
    }
    .render()
}

pub fn tag_form(chrome: &Chrome, form: &FormData, error: Option<&str>) -> askama::Result<String> {
    TagEditor {
        chrome,
        title: "New tag",
        name: form.get("name").unwrap_or(""),
        slug: form.get("slug").unwrap_or(""),
        error,
    }
    .render()
}

pub fn settings(
    chrome: &Chrome,
    form: &SettingsForm,
    errors: &[String],
    success: Option<&str>,
) -> askama::Result<String> {
    SettingsPage {
        chrome,
        title: "Settings",
        form,
        errors,
        success,
    }
    .render()
}
