//! JSON API: search, comments and image upload.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::pipeline::{Flow, RequestContext, ResponseWriter, StepFuture, StepRegistry, StepRequest};
use crate::services::StoredUpload;
use crate::store::{Comment, NewComment, Post};
use crate::steps::blog::SearchQuery;
use crate::steps::PER_PAGE;
use crate::views::blog::PostCard;
use crate::views::Pagination;

pub fn register(registry: &mut StepRegistry) {
    registry
        .register("api.parse_search", parse_search)
        .register("api.search_response", search_response)
        .register("api.comments.find_post", find_post)
        .register("api.comments.list", list_comments)
        .register("api.comments.validate", validate_comment)
        .register("api.comments.create", create_comment)
        .register("api.comments.respond_created", respond_created)
        .register("api.comments.find", find_comment)
        .register("api.comments.delete", delete_comment)
        .register("api.comments.respond_deleted", respond_deleted)
        .register("api.upload.store_image", store_image)
        .register("api.upload.respond", upload_response);
}

fn json_error(res: &mut ResponseWriter, status: StatusCode, message: &str) -> Flow {
    res.status(status)
        .json(json!({ "success": false, "error": message }))
}

/// `q`, `page` and `perPage` (default 10) from the query string.
fn parse_search<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    _res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let per_page = req
            .query
            .get("perPage")
            .and_then(|p| p.trim().parse::<usize>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(PER_PAGE);
        ctx.insert(
            "search",
            SearchQuery {
                q: req.query.get("q").unwrap_or("").trim().to_string(),
                page: req.page(),
                per_page,
            },
        )?;
        Ok(Flow::Continue)
    })
}

fn search_response<'a>(
    ctx: &'a mut RequestContext,
    _req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let posts: Vec<PostCard> = ctx.get("posts")?;
        let pagination: Pagination = ctx.get("pagination")?;
        Ok(res.json(json!({
            "success": true,
            "posts": posts,
            "total": pagination.total,
            "page": pagination.page,
            "totalPages": pagination.total_pages,
        })))
    })
}

/// Published post named by the `slug` parameter, or a 404 JSON error.
fn find_post<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let post = req
            .services
            .store
            .post_by_slug(req.param("slug"))
            .await
            .filter(|p| p.published);
        match post {
            Some(post) => {
                ctx.insert("post", post)?;
                Ok(Flow::Continue)
            }
            None => Ok(json_error(res, StatusCode::NOT_FOUND, "Post not found")),
        }
    })
}

fn list_comments<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let post: Post = ctx.get("post")?;
        let comments = req.services.store.comments_for_post(&post.id).await;
        Ok(res.json(json!({ "success": true, "comments": comments })))
    })
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentInput {
    author_name: String,
    author_email: Option<String>,
    content: String,
}

fn validate_comment<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let Some(author_name) = req.form.non_empty("authorName") else {
            return Ok(json_error(res, StatusCode::BAD_REQUEST, "authorName is required"));
        };
        let Some(content) = req.form.non_empty("content") else {
            return Ok(json_error(res, StatusCode::BAD_REQUEST, "content is required"));
        };
        ctx.insert(
            "commentData",
            CommentInput {
                author_name: author_name.to_string(),
                author_email: req.form.non_empty("authorEmail").map(str::to_string),
                content: content.to_string(),
            },
        )?;
        Ok(Flow::Continue)
    })
}

fn create_comment<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    _res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let post: Post = ctx.get("post")?;
        let input: CommentInput = ctx.get("commentData")?;
        let comment = req
            .services
            .store
            .create_comment(NewComment {
                post_id: post.id,
                author_name: input.author_name,
                author_email: input.author_email,
                content: input.content,
            })
            .await?;
        tracing::info!(comment = %comment.id, post = %post.slug, "Comment created");
        ctx.insert("comment", comment)?;
        Ok(Flow::Continue)
    })
}

fn respond_created<'a>(
    ctx: &'a mut RequestContext,
    _req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let comment: Comment = ctx.get("comment")?;
        Ok(res
            .status(StatusCode::CREATED)
            .json(json!({ "success": true, "comment": comment })))
    })
}

fn find_comment<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        match req.services.store.comment_by_id(req.param("id")).await {
            Some(comment) => {
                ctx.insert("comment", comment)?;
                Ok(Flow::Continue)
            }
            None => Ok(json_error(res, StatusCode::NOT_FOUND, "Comment not found")),
        }
    })
}

fn delete_comment<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    _res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let comment: Comment = ctx.get("comment")?;
        req.services.store.delete_comment(&comment.id).await?;
        Ok(Flow::Continue)
    })
}

fn respond_deleted<'a>(
    _ctx: &'a mut RequestContext,
    _req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move { Ok(res.json(json!({ "success": true }))) })
}

/// Stores the multipart field `image`. Rejections answer 400 JSON.
fn store_image<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let Some(file) = req.file("image").filter(|f| !f.bytes.is_empty()) else {
            return Ok(json_error(res, StatusCode::BAD_REQUEST, "No file uploaded"));
        };
        match req.services.uploads.save_image(file).await {
            Ok(stored) => {
                ctx.insert("uploadedFile", stored)?;
                Ok(Flow::Continue)
            }
            Err(e) if e.is_rejection() => {
                Ok(json_error(res, StatusCode::BAD_REQUEST, &e.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    })
}

fn upload_response<'a>(
    ctx: &'a mut RequestContext,
    _req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let stored: StoredUpload = ctx.get("uploadedFile")?;
        Ok(res.json(json!({
            "success": true,
            "url": stored.url,
            "filename": stored.filename,
        })))
    })
}
