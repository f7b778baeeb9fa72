//! Post management: list, create, edit, update and delete.

use axum::http::StatusCode;

use super::current_user;
use crate::pipeline::{Flow, RequestContext, ResponseWriter, StepFuture, StepRegistry, StepRequest};
use crate::services::{markdown, slug};
use crate::store::{Category, Post, PostDraft, PostQuery, SlugKind, StoreError, Tag};
use crate::steps::{chrome, error_page, post_cards};
use crate::views::admin::{self, PostForm};
use crate::views::blog::PostCard;

const EXCERPT_CHARS: usize = 200;
const LIST_PATH: &str = "/admin/posts";
const SLUG_CONFLICT: &str = "Another post took this slug while saving. Please try again.";

pub(super) fn register(registry: &mut StepRegistry) {
    registry
        .register("admin.posts.fetch_all", fetch_all)
        .register("admin.posts.render_list", render_list)
        .register("admin.posts.fetch_options", fetch_options)
        .register("admin.posts.render_new", render_new)
        .register("admin.posts.validate", validate)
        .register("admin.posts.create", create)
        .register("admin.posts.fetch_post", fetch_post)
        .register("admin.posts.render_edit", render_edit)
        .register("admin.posts.update", update)
        .register("admin.posts.delete", delete)
        .register("admin.posts.redirect_list", redirect_list);
}

/// Every post, drafts included.
fn fetch_all<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    _res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let store = &req.services.store;
        let posts = store.list_posts(&PostQuery::default()).await.items;
        ctx.insert("posts", post_cards(store, posts).await)?;
        Ok(Flow::Continue)
    })
}

fn render_list<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let posts: Vec<PostCard> = ctx.get("posts")?;
        let chrome = chrome(req).await;
        Ok(res.html(admin::posts(&chrome, &posts)?))
    })
}

/// Categories and tags for the editor's pickers.
fn fetch_options<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    _res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let store = &req.services.store;
        ctx.insert("categories", store.list_categories().await)?;
        ctx.insert("tags", store.list_tags().await)?;
        Ok(Flow::Continue)
    })
}

async fn render_editor(
    req: &StepRequest,
    res: &mut ResponseWriter,
    form: &PostForm,
    error: Option<&str>,
) -> anyhow::Result<Flow> {
    let store = &req.services.store;
    let categories = store.list_categories().await;
    let tags = store.list_tags().await;
    let chrome = chrome(req).await;
    if error.is_some() {
        res.status(StatusCode::BAD_REQUEST);
    }
    Ok(res.html(admin::post_form(&chrome, form, &categories, &tags, error)?))
}

fn render_new<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let categories: Vec<Category> = ctx.get("categories")?;
        let tags: Vec<Tag> = ctx.get("tags")?;
        let chrome = chrome(req).await;
        Ok(res.html(admin::post_form(&chrome, &PostForm::default(), &categories, &tags, None)?))
    })
}

/// Title and content are required. The cleaned submission is stored under
/// `postForm`; the post being edited, if any, is read from `post`.
fn validate<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let editing: Option<Post> = ctx.get_opt("post")?;
        let mut form = PostForm::from_form(editing.map(|p| p.id), &req.form);

        if form.title.trim().is_empty() {
            return render_editor(req, res, &form, Some("Please enter a title.")).await;
        }
        if form.content.trim().is_empty() {
            return render_editor(req, res, &form, Some("Please enter content.")).await;
        }

        form.title = form.title.trim().to_string();
        form.content = form.content.trim().to_string();
        ctx.insert("postForm", form)?;
        Ok(Flow::Continue)
    })
}

fn draft_from(form: PostForm, slug: String) -> PostDraft {
    let excerpt = match form.excerpt.trim() {
        "" => markdown::plain_excerpt(&form.content, EXCERPT_CHARS),
        given => given.to_string(),
    };
    let cover_image = Some(form.cover_image.trim().to_string()).filter(|c| !c.is_empty());
    PostDraft {
        content_html: markdown::render(&form.content),
        title: form.title,
        slug,
        content: form.content,
        excerpt: Some(excerpt).filter(|e| !e.is_empty()),
        cover_image,
        published: form.published,
        category_id: form.category_id,
        tag_ids: form.tag_ids,
    }
}

/// The stored post, or `None` after putting the submission back in the
/// editor because its slug was claimed between choosing and saving it.
async fn saved_or_rerender(
    req: &StepRequest,
    res: &mut ResponseWriter,
    form: &PostForm,
    saved: Result<Post, StoreError>,
) -> anyhow::Result<Option<Post>> {
    match saved {
        Ok(post) => Ok(Some(post)),
        Err(StoreError::UniqueViolation { field, .. }) => {
            tracing::warn!(title = %form.title, field, "Post save lost a uniqueness race");
            render_editor(req, res, form, Some(SLUG_CONFLICT)).await?;
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn create<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let author = current_user(ctx)?;
        let form: PostForm = ctx.get("postForm")?;
        let store = &req.services.store;

        let slug = slug::unique_slug(store, SlugKind::Post, &form.title).await;
        let saved = store.create_post(&author.id, draft_from(form.clone(), slug)).await;
        let Some(post) = saved_or_rerender(req, res, &form, saved).await? else {
            return Ok(Flow::Halt);
        };
        tracing::info!(post = %post.id, slug = %post.slug, published = post.published, "Post created");
        ctx.insert("post", post)?;
        Ok(Flow::Continue)
    })
}

fn fetch_post<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        match req.services.store.post_by_id(req.param("id")).await {
            Some(post) => {
                ctx.insert("post", post)?;
                Ok(Flow::Continue)
            }
            None => error_page(res, StatusCode::NOT_FOUND, "Post not found"),
        }
    })
}

fn render_edit<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let post: Post = ctx.get("post")?;
        let categories: Vec<Category> = ctx.get("categories")?;
        let tags: Vec<Tag> = ctx.get("tags")?;
        let chrome = chrome(req).await;
        let form = PostForm::from_post(&post);
        Ok(res.html(admin::post_form(&chrome, &form, &categories, &tags, None)?))
    })
}

/// Rewrites the post. The slug is regenerated only when the title changed,
/// and the post's own slug is never treated as taken.
fn update<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let existing: Post = ctx.get("post")?;
        let form: PostForm = ctx.get("postForm")?;
        let store = &req.services.store;

        let slug = if form.title == existing.title {
            existing.slug.clone()
        } else {
            slug::unique_slug_except(store, SlugKind::Post, &form.title, Some(&existing.slug)).await
        };
        let saved = store.update_post(&existing.id, draft_from(form.clone(), slug)).await;
        let Some(post) = saved_or_rerender(req, res, &form, saved).await? else {
            return Ok(Flow::Halt);
        };
        tracing::info!(post = %post.id, slug = %post.slug, "Post updated");
        ctx.insert("post", post)?;
        Ok(Flow::Continue)
    })
}

/// Deleting a post that is already gone is not an error.
fn delete<'a>(
    _ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    _res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let id = req.param("id");
        match req.services.store.delete_post(id).await {
            Ok(()) => tracing::info!(post = %id, "Post deleted"),
            Err(e) if e.is_not_found() => tracing::debug!(post = %id, "Post already deleted"),
            Err(e) => return Err(e.into()),
        }
        Ok(Flow::Continue)
    })
}

fn redirect_list<'a>(
    _ctx: &'a mut RequestContext,
    _req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move { Ok(res.redirect(LIST_PATH)) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::Method;
    use crate::steps::testing;
    use crate::store::Role;

    async fn admin_ctx(services: &std::sync::Arc<crate::services::Services>) -> RequestContext {
        let admin = testing::user(services, "admin", Role::Admin).await;
        let mut ctx = RequestContext::new();
        ctx.insert("currentUser", admin).unwrap();
        ctx
    }

    #[tokio::test]
    async fn test_validate_requires_title_and_content() {
        let services = testing::services();
        for (body, message) in [
            ("title=+&content=x", "Please enter a title."),
            ("title=Hello&content=", "Please enter content."),
        ] {
            let req = testing::request(&services, Method::Post, "/admin/posts")
                .with_form(testing::form(body));
            let mut res = ResponseWriter::new();
            let flow = validate(&mut RequestContext::new(), &req, &mut res).await.unwrap();
            assert_eq!(flow, Flow::Halt);
            assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
            assert!(res.body_text().contains(message));
        }
    }

    #[tokio::test]
    async fn test_create_generates_unique_slug_and_excerpt() {
        let services = testing::services();
        let mut ctx = admin_ctx(&services).await;
        let req = testing::request(&services, Method::Post, "/admin/posts").with_form(testing::form(
            "title=Hello+World&content=%23+Intro%0A%0ASome+**bold**+text&published=true",
        ));

        for expected in ["hello-world", "hello-world-2"] {
            ctx.remove("post");
            validate(&mut ctx, &req, &mut ResponseWriter::new()).await.unwrap();
            create(&mut ctx, &req, &mut ResponseWriter::new()).await.unwrap();
            let post: Post = ctx.get("post").unwrap();
            assert_eq!(post.slug, expected);
            assert!(post.published_at.is_some());
            assert!(post.content_html.contains("<strong>bold</strong>"));
            assert_eq!(post.excerpt.as_deref(), Some("Intro Some bold text"));
        }
    }

    #[tokio::test]
    async fn test_update_keeps_slug_unless_title_changes() {
        let services = testing::services();
        let mut ctx = admin_ctx(&services).await;
        let req = testing::request(&services, Method::Post, "/admin/posts")
            .with_form(testing::form("title=First&content=body"));
        validate(&mut ctx, &req, &mut ResponseWriter::new()).await.unwrap();
        create(&mut ctx, &req, &mut ResponseWriter::new()).await.unwrap();

        let req = testing::request(&services, Method::Put, "/admin/posts/x")
            .with_form(testing::form("title=First&content=changed&published=true"));
        validate(&mut ctx, &req, &mut ResponseWriter::new()).await.unwrap();
        update(&mut ctx, &req, &mut ResponseWriter::new()).await.unwrap();
        let post: Post = ctx.get("post").unwrap();
        assert_eq!(post.slug, "first");
        assert_eq!(post.content, "changed");
        assert!(post.published);

        let req = testing::request(&services, Method::Put, "/admin/posts/x")
            .with_form(testing::form("title=Renamed&content=changed"));
        validate(&mut ctx, &req, &mut ResponseWriter::new()).await.unwrap();
        update(&mut ctx, &req, &mut ResponseWriter::new()).await.unwrap();
        let post: Post = ctx.get("post").unwrap();
        assert_eq!(post.slug, "renamed");
        assert!(post.published_at.is_none());
    }

    #[tokio::test]
    async fn test_retitle_keeps_own_suffixed_slug() {
        let services = testing::services();
        let mut ctx = admin_ctx(&services).await;
        let req = testing::request(&services, Method::Post, "/admin/posts")
            .with_form(testing::form("title=Hello&content=body"));
        for _ in 0..2 {
            ctx.remove("post");
            validate(&mut ctx, &req, &mut ResponseWriter::new()).await.unwrap();
            create(&mut ctx, &req, &mut ResponseWriter::new()).await.unwrap();
        }
        let second: Post = ctx.get("post").unwrap();
        assert_eq!(second.slug, "hello-2");

        let req = testing::request(&services, Method::Put, "/admin/posts/x")
            .with_form(testing::form("title=Hello!&content=body"));
        validate(&mut ctx, &req, &mut ResponseWriter::new()).await.unwrap();
        update(&mut ctx, &req, &mut ResponseWriter::new()).await.unwrap();
        let post: Post = ctx.get("post").unwrap();
        assert_eq!(post.title, "Hello!");
        assert_eq!(post.slug, "hello-2");
    }

    #[tokio::test]
    async fn test_slug_conflict_rerenders_editor() {
        let services = testing::services();
        let ctx = admin_ctx(&services).await;
        let author = current_user(&ctx).unwrap();
        let store = &services.store;
        store
            .create_post(
                &author.id,
                draft_from(
                    PostForm {
                        title: "Taken".into(),
                        ..Default::default()
                    },
                    "taken".into(),
                ),
            )
            .await
            .unwrap();

        // A create that lost the race for "taken".
        let form = PostForm {
            title: "Taken".into(),
            content: "new body".into(),
            ..Default::default()
        };
        let saved = store.create_post(&author.id, draft_from(form.clone(), "taken".into())).await;
        let req = testing::request(&services, Method::Post, "/admin/posts");
        let mut res = ResponseWriter::new();
        let post = saved_or_rerender(&req, &mut res, &form, saved).await.unwrap();
        assert!(post.is_none());
        assert!(res.is_finished());
        assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
        assert!(res.body_text().contains("Please try again."));
        assert!(res.body_text().contains("new body"));
        assert_eq!(store.post_stats().await.total_posts, 1);

        // An update that lost the race for "taken".
        let other = store
            .create_post(
                &author.id,
                draft_from(
                    PostForm {
                        title: "Other".into(),
                        ..Default::default()
                    },
                    "other".into(),
                ),
            )
            .await
            .unwrap();
        let form = PostForm {
            id: Some(other.id.clone()),
            ..form
        };
        let saved = store.update_post(&other.id, draft_from(form.clone(), "taken".into())).await;
        let mut res = ResponseWriter::new();
        let post = saved_or_rerender(&req, &mut res, &form, saved).await.unwrap();
        assert!(post.is_none());
        assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
        assert!(res.body_text().contains(&format!("/admin/posts/{}?_method=PUT", other.id)));
        assert_eq!(store.post_by_id(&other.id).await.unwrap().slug, "other");
    }

    #[tokio::test]
    async fn test_delete_missing_post_continues() {
        let services = testing::services();
        let mut req = testing::request(&services, Method::Delete, "/admin/posts/nope");
        req.params.insert("id".into(), "nope".into());
        let flow = delete(&mut RequestContext::new(), &req, &mut ResponseWriter::new())
            .await
            .unwrap();
        assert_eq!(flow, Flow::Continue);
    }
}
