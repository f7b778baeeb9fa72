//! Categories and tags. Both take a name and an optional slug; categories
//! also carry a description and a display order.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::pipeline::{
    FormData, Flow, RequestContext, ResponseWriter, StepFuture, StepRegistry, StepRequest,
};
use crate::services::slug;
use crate::store::{Category, SlugKind, StoreError, Tag};
use crate::steps::chrome;
use crate::views::{admin, Chrome};

const INVALID_SLUG: &str = "Slug can only contain lowercase letters, numbers, and hyphens (-).";
const SLUG_TAKEN: &str = "Slug already exists.";

pub(super) fn register(registry: &mut StepRegistry) {
    registry
        .register("admin.categories.fetch_all", fetch_categories)
        .register("admin.categories.render_list", render_categories)
        .register("admin.categories.render_new", render_new_category)
        .register("admin.categories.validate", validate_category)
        .register("admin.categories.create", create_category)
        .register("admin.categories.delete", delete_category)
        .register("admin.categories.redirect_list", redirect_categories)
        .register("admin.tags.fetch_all", fetch_tags)
        .register("admin.tags.render_list", render_tags)
        .register("admin.tags.render_new", render_new_tag)
        .register("admin.tags.validate", validate_tag)
        .register("admin.tags.create", create_tag)
        .register("admin.tags.delete", delete_tag)
        .register("admin.tags.redirect_list", redirect_tags);
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Category,
    Tag,
}

impl Kind {
    fn slug_kind(self) -> SlugKind {
        match self {
            Kind::Category => SlugKind::Category,
            Kind::Tag => SlugKind::Tag,
        }
    }

    fn name_required(self) -> &'static str {
        match self {
            Kind::Category => "Category name is required.",
            Kind::Tag => "Tag name is required.",
        }
    }

    fn name_taken(self) -> &'static str {
        match self {
            Kind::Category => "Category name already exists.",
            Kind::Tag => "Tag name already exists.",
        }
    }

    fn render_form(self, chrome: &Chrome, form: &FormData, error: Option<&str>) -> askama::Result<String> {
        match self {
            Kind::Category => admin::category_form(chrome, form, error),
            Kind::Tag => admin::tag_form(chrome, form, error),
        }
    }
}

/// Cleaned create-form submission, stored under `taxonomyInput`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TaxonomyInput {
    name: String,
    slug: Option<String>,
    description: Option<String>,
    order: Option<i64>,
}

async fn reject(
    kind: Kind,
    req: &StepRequest,
    res: &mut ResponseWriter,
    message: &str,
) -> anyhow::Result<Flow> {
    let chrome = chrome(req).await;
    Ok(res
        .status(StatusCode::BAD_REQUEST)
        .html(kind.render_form(&chrome, &req.form, Some(message))?))
}

async fn validate_input(
    kind: Kind,
    ctx: &mut RequestContext,
    req: &StepRequest,
    res: &mut ResponseWriter,
) -> anyhow::Result<Flow> {
    let form = &req.form;
    let Some(name) = form.non_empty("name") else {
        return reject(kind, req, res, kind.name_required()).await;
    };
    let slug = form.non_empty("slug");
    if slug.is_some_and(|s| !slug::is_valid(s)) {
        return reject(kind, req, res, INVALID_SLUG).await;
    }
    ctx.insert(
        "taxonomyInput",
        TaxonomyInput {
            name: name.to_string(),
            slug: slug.map(str::to_string),
            description: form.non_empty("description").map(str::to_string),
            order: form.non_empty("order").and_then(|o| o.parse().ok()),
        },
    )?;
    Ok(Flow::Continue)
}

/// The given slug if it is free, a generated one if none was given, or
/// `None` after rejecting the request.
async fn choose_slug(
    kind: Kind,
    input: &TaxonomyInput,
    req: &StepRequest,
    res: &mut ResponseWriter,
) -> anyhow::Result<Option<String>> {
    let store = &req.services.store;
    match &input.slug {
        Some(given) if store.slug_exists(kind.slug_kind(), given).await => {
            reject(kind, req, res, SLUG_TAKEN).await?;
            Ok(None)
        }
        Some(given) => Ok(Some(given.clone())),
        None => Ok(Some(slug::unique_slug(store, kind.slug_kind(), &input.name).await)),
    }
}

/// Maps uniqueness conflicts onto the form; anything else is a failure.
async fn on_conflict(
    kind: Kind,
    err: StoreError,
    req: &StepRequest,
    res: &mut ResponseWriter,
) -> anyhow::Result<Flow> {
    match err {
        StoreError::UniqueViolation { field: "slug", .. } => reject(kind, req, res, SLUG_TAKEN).await,
        StoreError::UniqueViolation { .. } => reject(kind, req, res, kind.name_taken()).await,
        other => Err(other.into()),
    }
}

// ----- categories -----

fn fetch_categories<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    _res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        ctx.insert("categories", req.services.store.list_categories().await)?;
        Ok(Flow::Continue)
    })
}

fn render_categories<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let categories: Vec<Category> = ctx.get("categories")?;
        let chrome = chrome(req).await;
        Ok(res.html(admin::categories(&chrome, &categories)?))
    })
}

fn render_new_category<'a>(
    _ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let chrome = chrome(req).await;
        Ok(res.html(admin::category_form(&chrome, &FormData::default(), None)?))
    })
}

fn validate_category<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(validate_input(Kind::Category, ctx, req, res))
}

fn create_category<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let input: TaxonomyInput = ctx.get("taxonomyInput")?;
        let Some(slug) = choose_slug(Kind::Category, &input, req, res).await? else {
            return Ok(Flow::Halt);
        };
        let created = req
            .services
            .store
            .create_category(&input.name, &slug, input.description.clone(), input.order)
            .await;
        match created {
            Ok(category) => {
                tracing::info!(category = %category.slug, "Category created");
                ctx.insert("category", category)?;
                Ok(Flow::Continue)
            }
            Err(e) => on_conflict(Kind::Category, e, req, res).await,
        }
    })
}

fn delete_category<'a>(
    _ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    _res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let id = req.param("id");
        match req.services.store.delete_category(id).await {
            Ok(()) => tracing::info!(category = %id, "Category deleted"),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }
        Ok(Flow::Continue)
    })
}

fn redirect_categories<'a>(
    _ctx: &'a mut RequestContext,
    _req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move { Ok(res.redirect("/admin/categories")) })
}

// ----- tags -----

fn fetch_tags<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    _res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        ctx.insert("tags", req.services.store.list_tags().await)?;
        Ok(Flow::Continue)
    })
}

fn render_tags<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let tags: Vec<Tag> = ctx.get("tags")?;
        let chrome = chrome(req).await;
        Ok(res.html(admin::tags(&chrome, &tags)?))
    })
}

fn render_new_tag<'a>(
    _ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let chrome = chrome(req).await;
        Ok(res.html(admin::tag_form(&chrome, &FormData::default(), None)?))
    })
}

fn validate_tag<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(validate_input(Kind::Tag, ctx, req, res))
}

fn create_tag<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let input: TaxonomyInput = ctx.get("taxonomyInput")?;
        let Some(slug) = choose_slug(Kind::Tag, &input, req, res).await? else {
            return Ok(Flow::Halt);
        };
        match req.services.store.create_tag(&input.name, &slug).await {
            Ok(tag) => {
                tracing::info!(tag = %tag.slug, "Tag created");
                ctx.insert("tag", tag)?;
                Ok(Flow::Continue)
            }
            Err(e) => on_conflict(Kind::Tag, e, req, res).await,
        }
    })
}

fn delete_tag<'a>(
    _ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    _res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let id = req.param("id");
        match req.services.store.delete_tag(id).await {
            Ok(()) => tracing::info!(tag = %id, "Tag deleted"),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }
        Ok(Flow::Continue)
    })
}

fn redirect_tags<'a>(
    _ctx: &'a mut RequestContext,
    _req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move { Ok(res.redirect("/admin/tags")) })
}
