//! The blog's step handlers.
//!
//! Every handler is registered under a dotted name (`blog.fetch_post`) that
//! step files in the feature tree refer to. Handlers read collaborators from
//! `req.services` and hand data to later steps through the request context.

pub mod about;
pub mod admin;
pub mod api;
pub mod auth;
pub mod blog;
pub mod guard;
pub mod home;
pub mod install;
pub mod sitemap;

use axum::http::StatusCode;

use crate::pipeline::{Flow, ResponseWriter, StepRegistry, StepRequest};
use crate::store::{Post, Store};
use crate::views::blog::{Label, PostCard};
use crate::views::{self, Chrome};

/// Registry with every handler the feature tree may name.
pub fn registry() -> StepRegistry {
    let mut registry = StepRegistry::new();
    register_all(&mut registry);
    registry
}

pub fn register_all(registry: &mut StepRegistry) {
    guard::register(registry);
    home::register(registry);
    about::register(registry);
    blog::register(registry);
    api::register(registry);
    install::register(registry);
    auth::register(registry);
    admin::register(registry);
    sitemap::register(registry);
}

/// Posts per page on public listings.
pub(crate) const PER_PAGE: usize = 10;

pub(crate) async fn chrome(req: &StepRequest) -> Chrome {
    Chrome {
        site_name: req.services.blog_name().await,
        user: req.current_user.clone(),
    }
}

/// Commit an HTML error page with `status`.
pub(crate) fn error_page(
    res: &mut ResponseWriter,
    status: StatusCode,
    message: &str,
) -> anyhow::Result<Flow> {
    Ok(res.status(status).html(views::error_page(status.as_u16(), message)?))
}

/// Attach author, category and tag names to posts for listing.
pub(crate) async fn post_cards(store: &Store, posts: Vec<Post>) -> Vec<PostCard> {
    let mut cards = Vec::with_capacity(posts.len());
    for post in posts {
        let author_name = store
            .user_by_id(&post.author_id)
            .await
            .map(|u| u.display_name)
            .unwrap_or_default();
        let category = match &post.category_id {
            Some(id) => store.category_by_id(id).await.as_ref().map(Label::from),
            None => None,
        };
        let tags = store
            .tags_by_ids(&post.tag_ids)
            .await
            .iter()
            .map(Label::from)
            .collect();
        cards.push(PostCard {
            id: post.id,
            title: post.title,
            slug: post.slug,
            excerpt: post.excerpt,
            cover_image: post.cover_image,
            published: post.published,
            published_at: post.published_at,
            view_count: post.view_count,
            created_at: post.created_at,
            author_name,
            category,
            tags,
        });
    }
    cards
}
