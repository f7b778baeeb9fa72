use crate::pipeline::{Flow, RequestContext, ResponseWriter, StepFuture, StepRegistry, StepRequest};
use crate::steps::{chrome, post_cards};
use crate::store::PostStats;
use crate::views::admin;
use crate::views::blog::PostCard;

const RECENT_POSTS: usize = 5;

pub(super) fn register(registry: &mut StepRegistry) {
    registry
        .register("admin.dashboard.fetch_stats", fetch_stats)
        .register("admin.dashboard.fetch_recent", fetch_recent)
        .register("admin.dashboard.render", render);
}

fn fetch_stats<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    _res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        ctx.insert("stats", req.services.store.post_stats().await)?;
        Ok(Flow::Continue)
    })
}

/// Latest posts by creation time, drafts included.
fn fetch_recent<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    _res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let store = &req.services.store;
        let recent = store.recent_posts(RECENT_POSTS).await;
        ctx.insert("recentPosts", post_cards(store, recent).await)?;
        Ok(Flow::Continue)
    })
}

fn render<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let stats: PostStats = ctx.get("stats")?;
        let recent: Vec<PostCard> = ctx.get("recentPosts")?;
        let chrome = chrome(req).await;
        Ok(res.html(admin::dashboard(&chrome, &stats, &recent)?))
    })
}
