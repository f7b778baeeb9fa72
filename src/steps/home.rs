//! `GET /`.

use crate::pipeline::{Flow, RequestContext, ResponseWriter, StepFuture, StepRegistry, StepRequest};
use crate::store::PostQuery;
use crate::steps::{chrome, post_cards};
use crate::views::blog::{self, PostCard};

const HOME_POSTS: usize = 10;

pub fn register(registry: &mut StepRegistry) {
    registry
        .register("home.fetch_posts", fetch_posts)
        .register("home.render", render);
}

fn fetch_posts<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    _res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let store = &req.services.store;
        let page = store
            .list_posts(&PostQuery {
                published_only: true,
                limit: Some(HOME_POSTS),
                ..Default::default()
            })
            .await;
        ctx.insert("posts", post_cards(store, page.items).await)?;
        Ok(Flow::Continue)
    })
}

fn render<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let posts: Vec<PostCard> = ctx.get_opt("posts")?.unwrap_or_default();
        let chrome = chrome(req).await;
        let description = req.services.blog_description().await;
        Ok(res.html(blog::home(&chrome, &description, &posts)?))
    })
}
