//! `GET /sitemap.xml`. The route initializer seeds `baseUrl` and an empty
//! `urls` list; each step appends one group of pages.

use axum::http::StatusCode;
use chrono::Utc;

use crate::pipeline::{Flow, RequestContext, ResponseWriter, StepFuture, StepRegistry, StepRequest};
use crate::store::PostQuery;
use crate::views::sitemap::{self, SitemapUrl};

pub fn register(registry: &mut StepRegistry) {
    registry
        .register("sitemap.init", init)
        .register("sitemap.add_static_pages", add_static_pages)
        .register("sitemap.add_posts", add_posts)
        .register("sitemap.add_categories", add_categories)
        .register("sitemap.add_tags", add_tags)
        .register("sitemap.render", render);
}

fn append(ctx: &mut RequestContext, more: Vec<SitemapUrl>) -> anyhow::Result<()> {
    let mut urls: Vec<SitemapUrl> = ctx.get("urls")?;
    urls.extend(more);
    ctx.insert("urls", urls)?;
    Ok(())
}

fn base_url(ctx: &RequestContext) -> anyhow::Result<String> {
    Ok(ctx.get("baseUrl")?)
}

fn init<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    _res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let base = req.services.config.site.base_url.trim_end_matches('/');
        ctx.insert("baseUrl", base)?;
        ctx.insert("urls", Vec::<SitemapUrl>::new())?;
        Ok(Flow::Continue)
    })
}

fn add_static_pages<'a>(
    ctx: &'a mut RequestContext,
    _req: &'a StepRequest,
    _res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let base = base_url(ctx)?;
        let today = Utc::now().format("%Y-%m-%d").to_string();
        let pages = [("/", "daily", "1.0"), ("/blog", "daily", "0.9"), ("/about", "monthly", "0.5")]
            .into_iter()
            .map(|(path, freq, priority)| {
                SitemapUrl::new(format!("{base}{path}"), today.clone(), freq, priority)
            })
            .collect();
        append(ctx, pages)?;
        Ok(Flow::Continue)
    })
}

/// Published posts, newest first, dated by their last update.
fn add_posts<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    _res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let base = base_url(ctx)?;
        let query = PostQuery {
            published_only: true,
            ..Default::default()
        };
        let posts = req.services.store.list_posts(&query).await.items;
        let urls = posts
            .iter()
            .map(|post| {
                SitemapUrl::new(
                    format!("{base}/blog/{}", post.slug),
                    post.updated_at.format("%Y-%m-%d").to_string(),
                    "weekly",
                    "0.8",
                )
            })
            .collect();
        append(ctx, urls)?;
        Ok(Flow::Continue)
    })
}

fn add_categories<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    _res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let base = base_url(ctx)?;
        let today = Utc::now().format("%Y-%m-%d").to_string();
        let mut categories = req.services.store.list_categories().await;
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        let urls = categories
            .iter()
            .map(|c| SitemapUrl::new(format!("{base}/blog/category/{}", c.slug), today.clone(), "weekly", "0.6"))
            .collect();
        append(ctx, urls)?;
        Ok(Flow::Continue)
    })
}

fn add_tags<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    _res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let base = base_url(ctx)?;
        let today = Utc::now().format("%Y-%m-%d").to_string();
        let urls = req
            .services
            .store
            .list_tags()
            .await
            .iter()
            .map(|t| SitemapUrl::new(format!("{base}/blog/tag/{}", t.slug), today.clone(), "weekly", "0.6"))
            .collect();
        append(ctx, urls)?;
        Ok(Flow::Continue)
    })
}

fn render<'a>(
    ctx: &'a mut RequestContext,
    _req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let urls: Vec<SitemapUrl> = ctx.get("urls")?;
        Ok(res.status(StatusCode::OK).xml(sitemap::render(&urls)?))
    })
}
