//! Admin area. Every route starts with `guard.require_admin`, which leaves the
//! signed-in administrator in the context under `currentUser`.

mod dashboard;
mod posts;
mod settings;
mod taxonomy;

use crate::pipeline::{CurrentUser, RequestContext, StepRegistry};

pub fn register(registry: &mut StepRegistry) {
    dashboard::register(registry);
    posts::register(registry);
    taxonomy::register(registry);
    settings::register(registry);
}

fn current_user(ctx: &RequestContext) -> anyhow::Result<CurrentUser> {
    Ok(ctx.get("currentUser")?)
}
