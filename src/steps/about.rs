//! `GET /about`.

use crate::pipeline::{Flow, RequestContext, ResponseWriter, StepFuture, StepRegistry, StepRequest};
use crate::steps::chrome;
use crate::views::blog::{self, AboutData};

pub fn register(registry: &mut StepRegistry) {
    registry
        .register("about.prepare_data", prepare_data)
        .register("about.render", render);
}

fn prepare_data<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    _res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let services = &req.services;
        let features = services
            .store
            .list_highlights()
            .await
            .into_iter()
            .map(|h| format!("{} {}", h.icon, h.title))
            .collect();
        let data = AboutData {
            title: "About".to_string(),
            description: services.blog_description().await,
            app_name: services.blog_name().await,
            features,
            tech_stacks: services.store.list_tech_stacks().await,
        };
        ctx.insert("pageData", data)?;
        Ok(Flow::Continue)
    })
}

fn render<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let data: AboutData = ctx.get("pageData")?;
        let chrome = chrome(req).await;
        Ok(res.html(blog::about(&chrome, &data)?))
    })
}
