//! In-process datastore.
//!
//! # Responsibilities
//! - CRUD for every blog entity behind one async lock
//! - Distinct `NotFound` and `UniqueViolation` signalling
//! - Optional JSON snapshot persistence after every write
//!
//! # Design Decisions
//! - One `RwLock` over all tables keeps multi-table writes (cascades)
//!   atomic with respect to readers
//! - Snapshots are written to a temporary file and renamed into place
//! - Ids are UUID v4 strings

pub mod models;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

pub use models::*;

/// Datastore failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error("{entity} with this {field} already exists")]
    UniqueViolation {
        entity: &'static str,
        field: &'static str,
    },
    #[error("persistence failed: {0}")]
    Persistence(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

fn not_found(entity: &'static str) -> StoreError {
    StoreError::NotFound { entity }
}

fn unique(entity: &'static str, field: &'static str) -> StoreError {
    StoreError::UniqueViolation { entity, field }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Tables {
    users: Vec<User>,
    posts: Vec<Post>,
    categories: Vec<Category>,
    tags: Vec<Tag>,
    comments: Vec<Comment>,
    settings: Vec<(String, String)>,
    highlights: Vec<Highlight>,
    tech_stacks: Vec<TechStack>,
}

/// Which table a slug belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlugKind {
    Post,
    Category,
    Tag,
}

/// Shared handle to the datastore. Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct Store {
    tables: Arc<RwLock<Tables>>,
    data_file: Option<PathBuf>,
}

impl Store {
    /// Empty store that never touches disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a store backed by `data_file`, loading it if it exists.
    pub fn open(data_file: &Path) -> Result<Self, StoreError> {
        let tables = if data_file.exists() {
            let content = std::fs::read_to_string(data_file)
                .map_err(|e| StoreError::Persistence(e.to_string()))?;
            let tables: Tables = serde_json::from_str(&content)
                .map_err(|e| StoreError::Persistence(e.to_string()))?;
            tracing::info!(
                path = %data_file.display(),
                posts = tables.posts.len(),
                users = tables.users.len(),
                "Loaded datastore snapshot"
            );
            tables
        } else {
            Tables::default()
        };
        Ok(Self {
            tables: Arc::new(RwLock::new(tables)),
            data_file: Some(data_file.to_path_buf()),
        })
    }

    async fn persist(&self, tables: &Tables) -> Result<(), StoreError> {
        let Some(path) = &self.data_file else {
            return Ok(());
        };
        let bytes =
            serde_json::to_vec_pretty(tables).map_err(|e| StoreError::Persistence(e.to_string()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Persistence(e.to_string()))?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| StoreError::Persistence(e.to_string()))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| StoreError::Persistence(e.to_string()))?;
        tracing::trace!(path = %path.display(), "Snapshot written");
        Ok(())
    }

    // ----- settings -----

    pub async fn setting(&self, key: &str) -> Option<String> {
        let tables = self.tables.read().await;
        tables
            .settings
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    /// Insert or replace a setting.
    pub async fn set_setting(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        match tables.settings.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value.to_string(),
            None => tables.settings.push((key.to_string(), value.to_string())),
        }
        self.persist(&tables).await
    }

    pub async fn is_installed(&self) -> bool {
        self.setting("installed").await.as_deref() == Some("true")
    }

    // ----- users -----

    pub async fn create_user(&self, new: NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.username == new.username) {
            return Err(unique("user", "username"));
        }
        if tables.users.iter().any(|u| u.email == new.email) {
            return Err(unique("user", "email"));
        }
        let now = Utc::now();
        let user = User {
            id: new_id(),
            username: new.username,
            email: new.email,
            password: new.password_hash,
            display_name: new.display_name,
            role: new.role,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        self.persist(&tables).await?;
        Ok(user)
    }

    pub async fn user_by_id(&self, id: &str) -> Option<User> {
        let tables = self.tables.read().await;
        tables.users.iter().find(|u| u.id == id).cloned()
    }

    pub async fn user_by_username(&self, username: &str) -> Option<User> {
        let tables = self.tables.read().await;
        tables.users.iter().find(|u| u.username == username).cloned()
    }

    pub async fn update_profile(
        &self,
        id: &str,
        display_name: &str,
        email: &str,
    ) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.email == email && u.id != id) {
            return Err(unique("user", "email"));
        }
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| not_found("user"))?;
        user.display_name = display_name.to_string();
        user.email = email.to_string();
        user.updated_at = Utc::now();
        let user = user.clone();
        self.persist(&tables).await?;
        Ok(user)
    }

    pub async fn update_password(&self, id: &str, password_hash: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| not_found("user"))?;
        user.password = password_hash.to_string();
        user.updated_at = Utc::now();
        self.persist(&tables).await
    }

    pub async fn set_user_active(&self, id: &str, active: bool) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| not_found("user"))?;
        user.is_active = active;
        user.updated_at = Utc::now();
        self.persist(&tables).await
    }

    // ----- slugs -----

    pub async fn slug_exists(&self, kind: SlugKind, slug: &str) -> bool {
        let tables = self.tables.read().await;
        match kind {
            SlugKind::Post => tables.posts.iter().any(|p| p.slug == slug),
            SlugKind::Category => tables.categories.iter().any(|c| c.slug == slug),
            SlugKind::Tag => tables.tags.iter().any(|t| t.slug == slug),
        }
    }

    // ----- posts -----

    pub async fn create_post(&self, author_id: &str, draft: PostDraft) -> Result<Post, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.posts.iter().any(|p| p.slug == draft.slug) {
            return Err(unique("post", "slug"));
        }
        let now = Utc::now();
        let post = Post {
            id: new_id(),
            title: draft.title,
            slug: draft.slug,
            content: draft.content,
            content_html: draft.content_html,
            excerpt: draft.excerpt,
            cover_image: draft.cover_image,
            published: draft.published,
            published_at: draft.published.then_some(now),
            view_count: 0,
            author_id: author_id.to_string(),
            category_id: draft.category_id,
            tag_ids: draft.tag_ids,
            created_at: now,
            updated_at: now,
        };
        tables.posts.push(post.clone());
        self.persist(&tables).await?;
        Ok(post)
    }

    /// Replace a post's editable fields. `published_at` is set when a draft
    /// becomes published and cleared when a post is unpublished.
    pub async fn update_post(&self, id: &str, draft: PostDraft) -> Result<Post, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.posts.iter().any(|p| p.slug == draft.slug && p.id != id) {
            return Err(unique("post", "slug"));
        }
        let post = tables
            .posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| not_found("post"))?;
        let now = Utc::now();
        post.published_at = match (post.published, draft.published) {
            (false, true) => Some(now),
            (_, false) => None,
            (true, true) => post.published_at,
        };
        post.title = draft.title;
        post.slug = draft.slug;
        post.content = draft.content;
        post.content_html = draft.content_html;
        post.excerpt = draft.excerpt;
        post.cover_image = draft.cover_image;
        post.published = draft.published;
        post.category_id = draft.category_id;
        post.tag_ids = draft.tag_ids;
        post.updated_at = now;
        let post = post.clone();
        self.persist(&tables).await?;
        Ok(post)
    }

    /// Delete a post and its comments.
    pub async fn delete_post(&self, id: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.posts.len();
        tables.posts.retain(|p| p.id != id);
        if tables.posts.len() == before {
            return Err(not_found("post"));
        }
        tables.comments.retain(|c| c.post_id != id);
        self.persist(&tables).await
    }

    pub async fn post_by_id(&self, id: &str) -> Option<Post> {
        let tables = self.tables.read().await;
        tables.posts.iter().find(|p| p.id == id).cloned()
    }

    pub async fn post_by_slug(&self, slug: &str) -> Option<Post> {
        let tables = self.tables.read().await;
        tables.posts.iter().find(|p| p.slug == slug).cloned()
    }

    pub async fn increment_views(&self, id: &str) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        let post = tables
            .posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| not_found("post"))?;
        post.view_count += 1;
        let views = post.view_count;
        self.persist(&tables).await?;
        Ok(views)
    }

    pub async fn list_posts(&self, query: &PostQuery) -> Page<Post> {
        let tables = self.tables.read().await;
        let needle = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let mut matching: Vec<&Post> = tables
            .posts
            .iter()
            .filter(|p| !query.published_only || p.published)
            .filter(|p| match &query.category_id {
                Some(id) => p.category_id.as_deref() == Some(id.as_str()),
                None => true,
            })
            .filter(|p| match &query.tag_id {
                Some(id) => p.tag_ids.iter().any(|t| t == id),
                None => true,
            })
            .filter(|p| match &needle {
                Some(n) => {
                    p.title.to_lowercase().contains(n) || p.content.to_lowercase().contains(n)
                }
                None => true,
            })
            .collect();

        // Newest first: published date, falling back to creation date.
        matching.sort_by(|a, b| {
            let ka = a.published_at.unwrap_or(a.created_at);
            let kb = b.published_at.unwrap_or(b.created_at);
            kb.cmp(&ka).then_with(|| b.created_at.cmp(&a.created_at))
        });

        let total = matching.len();
        let items = matching
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Page { items, total }
    }

    /// Most recently created posts, drafts included.
    pub async fn recent_posts(&self, limit: usize) -> Vec<Post> {
        let tables = self.tables.read().await;
        let mut posts: Vec<&Post> = tables.posts.iter().collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        posts.into_iter().take(limit).cloned().collect()
    }

    pub async fn post_stats(&self) -> PostStats {
        let tables = self.tables.read().await;
        PostStats {
            total_posts: tables.posts.len(),
            published_posts: tables.posts.iter().filter(|p| p.published).count(),
            total_views: tables.posts.iter().map(|p| p.view_count).sum(),
        }
    }

    // ----- categories -----

    /// Without an explicit `order` the category is placed last.
    pub async fn create_category(
        &self,
        name: &str,
        slug: &str,
        description: Option<String>,
        order: Option<i64>,
    ) -> Result<Category, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.categories.iter().any(|c| c.name == name) {
            return Err(unique("category", "name"));
        }
        if tables.categories.iter().any(|c| c.slug == slug) {
            return Err(unique("category", "slug"));
        }
        let order = order.unwrap_or_else(|| {
            tables.categories.iter().map(|c| c.order).max().unwrap_or(0) + 1
        });
        let category = Category {
            id: new_id(),
            name: name.to_string(),
            slug: slug.to_string(),
            description,
            order,
            created_at: Utc::now(),
        };
        tables.categories.push(category.clone());
        self.persist(&tables).await?;
        Ok(category)
    }

    /// Ordered by `order`, then name.
    pub async fn list_categories(&self) -> Vec<Category> {
        let tables = self.tables.read().await;
        let mut categories = tables.categories.clone();
        categories.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
        categories
    }

    pub async fn category_by_id(&self, id: &str) -> Option<Category> {
        let tables = self.tables.read().await;
        tables.categories.iter().find(|c| c.id == id).cloned()
    }

    pub async fn category_by_slug(&self, slug: &str) -> Option<Category> {
        let tables = self.tables.read().await;
        tables.categories.iter().find(|c| c.slug == slug).cloned()
    }

    /// Delete a category; its posts become uncategorized.
    pub async fn delete_category(&self, id: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.categories.len();
        tables.categories.retain(|c| c.id != id);
        if tables.categories.len() == before {
            return Err(not_found("category"));
        }
        for post in tables.posts.iter_mut() {
            if post.category_id.as_deref() == Some(id) {
                post.category_id = None;
            }
        }
        self.persist(&tables).await
    }

    // ----- tags -----

    pub async fn create_tag(&self, name: &str, slug: &str) -> Result<Tag, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.tags.iter().any(|t| t.name == name) {
            return Err(unique("tag", "name"));
        }
        if tables.tags.iter().any(|t| t.slug == slug) {
            return Err(unique("tag", "slug"));
        }
        let tag = Tag {
            id: new_id(),
            name: name.to_string(),
            slug: slug.to_string(),
            created_at: Utc::now(),
        };
        tables.tags.push(tag.clone());
        self.persist(&tables).await?;
        Ok(tag)
    }

    /// Ordered by name.
    pub async fn list_tags(&self) -> Vec<Tag> {
        let tables = self.tables.read().await;
        let mut tags = tables.tags.clone();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        tags
    }

    pub async fn tag_by_slug(&self, slug: &str) -> Option<Tag> {
        let tables = self.tables.read().await;
        tables.tags.iter().find(|t| t.slug == slug).cloned()
    }

    /// Tags with the given ids, in name order. Unknown ids are skipped.
    pub async fn tags_by_ids(&self, ids: &[String]) -> Vec<Tag> {
        let tables = self.tables.read().await;
        let mut tags: Vec<Tag> = tables
            .tags
            .iter()
            .filter(|t| ids.contains(&t.id))
            .cloned()
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        tags
    }

    /// Delete a tag and detach it from every post.
    pub async fn delete_tag(&self, id: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.tags.len();
        tables.tags.retain(|t| t.id != id);
        if tables.tags.len() == before {
            return Err(not_found("tag"));
        }
        for post in tables.posts.iter_mut() {
            post.tag_ids.retain(|t| t != id);
        }
        self.persist(&tables).await
    }

    // ----- comments -----

    pub async fn create_comment(&self, new: NewComment) -> Result<Comment, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.posts.iter().any(|p| p.id == new.post_id) {
            return Err(not_found("post"));
        }
        let comment = Comment {
            id: new_id(),
            post_id: new.post_id,
            author_name: new.author_name,
            author_email: new.author_email,
            content: new.content,
            created_at: Utc::now(),
        };
        tables.comments.push(comment.clone());
        self.persist(&tables).await?;
        Ok(comment)
    }

    /// Comments of a post, oldest first.
    pub async fn comments_for_post(&self, post_id: &str) -> Vec<Comment> {
        let tables = self.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        comments
    }

    pub async fn comment_by_id(&self, id: &str) -> Option<Comment> {
        let tables = self.tables.read().await;
        tables.comments.iter().find(|c| c.id == id).cloned()
    }

    pub async fn delete_comment(&self, id: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.comments.len();
        tables.comments.retain(|c| c.id != id);
        if tables.comments.len() == before {
            return Err(not_found("comment"));
        }
        self.persist(&tables).await
    }

    // ----- about page -----

    pub async fn add_highlight(&self, icon: &str, title: &str, order: i64) -> Result<Highlight, StoreError> {
        let mut tables = self.tables.write().await;
        let highlight = Highlight {
            id: new_id(),
            icon: icon.to_string(),
            title: title.to_string(),
            order,
        };
        tables.highlights.push(highlight.clone());
        self.persist(&tables).await?;
        Ok(highlight)
    }

    pub async fn list_highlights(&self) -> Vec<Highlight> {
        let tables = self.tables.read().await;
        let mut items = tables.highlights.clone();
        items.sort_by_key(|h| h.order);
        items
    }

    pub async fn add_tech_stack(
        &self,
        name: &str,
        description: &str,
        order: i64,
    ) -> Result<TechStack, StoreError> {
        let mut tables = self.tables.write().await;
        let stack = TechStack {
            id: new_id(),
            name: name.to_string(),
            description: description.to_string(),
            order,
        };
        tables.tech_stacks.push(stack.clone());
        self.persist(&tables).await?;
        Ok(stack)
    }

    pub async fn list_tech_stacks(&self) -> Vec<TechStack> {
        let tables = self.tables.read().await;
        let mut items = tables.tech_stacks.clone();
        items.sort_by_key(|t| t.order);
        items
    }
}
