//! Public blog: listings, single posts, categories, tags and search.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::pipeline::{Flow, RequestContext, ResponseWriter, StepFuture, StepRegistry, StepRequest};
use crate::store::{Category, Comment, PostQuery, Tag};
use crate::steps::{chrome, error_page, post_cards, PER_PAGE};
use crate::views::blog::{self, Label, PostCard, PostDetail};
use crate::views::Pagination;

pub fn register(registry: &mut StepRegistry) {
    registry
        .register("blog.fetch_posts", fetch_posts)
        .register("blog.render_list", render_list)
        .register("blog.fetch_post", fetch_post)
        .register("blog.fetch_comments", fetch_comments)
        .register("blog.render_post", render_post)
        .register("blog.fetch_category_posts", fetch_category_posts)
        .register("blog.render_category", render_category)
        .register("blog.fetch_tag_posts", fetch_tag_posts)
        .register("blog.render_tag", render_tag)
        .register("blog.parse_search", parse_search)
        .register("blog.search_posts", search_posts)
        .register("blog.render_search", render_search);
}

/// Parsed search parameters shared by the HTML and JSON search routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub q: String,
    pub page: usize,
    pub per_page: usize,
}

/// One page of published posts matching `query`, stored as `posts` and
/// `pagination`.
async fn load_page(
    ctx: &mut RequestContext,
    req: &StepRequest,
    mut query: PostQuery,
    page: usize,
    per_page: usize,
) -> anyhow::Result<()> {
    let store = &req.services.store;
    query.published_only = true;
    query.offset = (page - 1).saturating_mul(per_page);
    query.limit = Some(per_page);
    let result = store.list_posts(&query).await;
    ctx.insert("pagination", Pagination::new(page, per_page, result.total))?;
    ctx.insert("posts", post_cards(store, result.items).await)?;
    Ok(())
}

fn fetch_posts<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    _res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        load_page(ctx, req, PostQuery::default(), req.page(), PER_PAGE).await?;
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
        let pagination: Pagination = ctx.get("pagination")?;
        let chrome = chrome(req).await;
        Ok(res.html(blog::listing(&chrome, "Blog", "Blog", "/blog", &posts, &pagination)?))
    })
}

/// Published post by slug; 404 otherwise. Counts the view.
fn fetch_post<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let store = &req.services.store;
        let Some(mut post) = store
            .post_by_slug(req.param("slug"))
            .await
            .filter(|p| p.published)
        else {
            return error_page(res, StatusCode::NOT_FOUND, "Post not found");
        };
        post.view_count = store.increment_views(&post.id).await?;

        let author_name = store
            .user_by_id(&post.author_id)
            .await
            .map(|u| u.display_name)
            .unwrap_or_default();
        let category = match &post.category_id {
            Some(id) => store.category_by_id(id).await.as_ref().map(Label::from),
            None => None,
        };
        let tags = store.tags_by_ids(&post.tag_ids).await.iter().map(Label::from).collect();
        ctx.insert(
            "post",
            PostDetail {
                post,
                author_name,
                category,
                tags,
            },
        )?;
        Ok(Flow::Continue)
    })
}

fn fetch_comments<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    _res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let detail: PostDetail = ctx.get("post")?;
        let comments = req.services.store.comments_for_post(&detail.post.id).await;
        ctx.insert("comments", comments)?;
        Ok(Flow::Continue)
    })
}

fn render_post<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let detail: PostDetail = ctx.get("post")?;
        let comments: Vec<Comment> = ctx.get_opt("comments")?.unwrap_or_default();
        let chrome = chrome(req).await;
        Ok(res.html(blog::post(&chrome, &detail, &comments)?))
    })
}

fn fetch_category_posts<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let Some(category) = req.services.store.category_by_slug(req.param("slug")).await else {
            return error_page(res, StatusCode::NOT_FOUND, "Category not found");
        };
        let query = PostQuery {
            category_id: Some(category.id.clone()),
            ..Default::default()
        };
        load_page(ctx, req, query, req.page(), PER_PAGE).await?;
        ctx.insert("category", category)?;
        Ok(Flow::Continue)
    })
}

fn render_category<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let category: Category = ctx.get("category")?;
        let posts: Vec<PostCard> = ctx.get("posts")?;
        let pagination: Pagination = ctx.get("pagination")?;
        let chrome = chrome(req).await;
        Ok(res.html(blog::listing(
            &chrome,
            &format!("{} - Category", category.name),
            &category.name,
            &format!("/blog/category/{}", category.slug),
            &posts,
            &pagination,
        )?))
    })
}

fn fetch_tag_posts<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let Some(tag) = req.services.store.tag_by_slug(req.param("slug")).await else {
            return error_page(res, StatusCode::NOT_FOUND, "Tag not found");
        };
        let query = PostQuery {
            tag_id: Some(tag.id.clone()),
            ..Default::default()
        };
        load_page(ctx, req, query, req.page(), PER_PAGE).await?;
        ctx.insert("tag", tag)?;
        Ok(Flow::Continue)
    })
}

fn render_tag<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let tag: Tag = ctx.get("tag")?;
        let posts: Vec<PostCard> = ctx.get("posts")?;
        let pagination: Pagination = ctx.get("pagination")?;
        let chrome = chrome(req).await;
        Ok(res.html(blog::listing(
            &chrome,
            &format!("#{} - Tag", tag.name),
            &format!("#{}", tag.name),
            &format!("/blog/tag/{}", tag.slug),
            &posts,
            &pagination,
        )?))
    })
}

fn parse_search<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    _res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let query = SearchQuery {
            q: req.query.get("q").unwrap_or("").trim().to_string(),
            page: req.page(),
            per_page: PER_PAGE,
        };
        ctx.insert("search", query)?;
        Ok(Flow::Continue)
    })
}

/// Runs the query stored under `search`. An empty query lists every
/// published post.
fn search_posts<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    _res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let search: SearchQuery = ctx.get("search")?;
        let query = PostQuery {
            search: Some(search.q.clone()).filter(|q| !q.is_empty()),
            ..Default::default()
        };
        load_page(ctx, req, query, search.page, search.per_page).await?;
        Ok(Flow::Continue)
    })
}

fn render_search<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let search: SearchQuery = ctx.get("search")?;
        let posts: Vec<PostCard> = ctx.get("posts")?;
        let pagination: Pagination = ctx.get("pagination")?;
        let chrome = chrome(req).await;
        Ok(res.html(blog::search(&chrome, &search.q, &posts, &pagination)?))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::Method;
    use crate::steps::testing;
    use crate::store::{PostDraft, Role};

    async fn publish(req: &StepRequest, author: &str, title: &str, slug: &str, published: bool) {
        req.services
            .store
            .create_post(
                author,
                PostDraft {
                    title: title.into(),
                    slug: slug.into(),
                    content: format!("About {title}"),
                    content_html: format!("<p>About {title}</p>"),
                    published,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_fetch_post_counts_views_and_hides_drafts() {
        let services = testing::services();
        let admin = testing::user(&services, "admin", Role::Admin).await;
        let mut req = testing::request(&services, Method::Get, "/blog/hello");
        publish(&req, &admin.id, "Hello", "hello", true).await;
        publish(&req, &admin.id, "Draft", "draft", false).await;

        req.params.insert("slug".into(), "hello".into());
        let mut ctx = RequestContext::new();
        let mut res = ResponseWriter::new();
        let flow = fetch_post(&mut ctx, &req, &mut res).await.unwrap();
        assert_eq!(flow, Flow::Continue);
        let detail: PostDetail = ctx.get("post").unwrap();
        assert_eq!(detail.post.view_count, 1);
        assert_eq!(detail.author_name, "admin");

        req.params.insert("slug".into(), "draft".into());
        let mut res = ResponseWriter::new();
        let flow = fetch_post(&mut RequestContext::new(), &req, &mut res).await.unwrap();
        assert_eq!(flow, Flow::Halt);
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
        assert!(res.body_text().contains("Post not found"));
    }

    #[tokio::test]
    async fn test_pagination_of_listing() {
        let services = testing::services();
        let admin = testing::user(&services, "admin", Role::Admin).await;
        let req = testing::request(&services, Method::Get, "/blog");
        for i in 0..12 {
            publish(&req, &admin.id, &format!("Post {i}"), &format!("post-{i}"), true).await;
        }

        let req = req.with_query(testing::form("page=2"));
        let mut ctx = RequestContext::new();
        fetch_posts(&mut ctx, &req, &mut ResponseWriter::new()).await.unwrap();
        let posts: Vec<PostCard> = ctx.get("posts").unwrap();
        let pagination: Pagination = ctx.get("pagination").unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(pagination.total_pages, 2);
        assert!(pagination.has_prev && !pagination.has_next);
    }

    #[tokio::test]
    async fn test_unknown_category_is_404() {
        let services = testing::services();
        let mut req = testing::request(&services, Method::Get, "/blog/category/none");
        req.params.insert("slug".into(), "none".into());
        let mut res = ResponseWriter::new();
        fetch_category_posts(&mut RequestContext::new(), &req, &mut res).await.unwrap();
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    }
}
