//! Access checks placed first in protected routes.

use axum::http::StatusCode;
use serde_json::json;

use crate::pipeline::{Flow, RequestContext, ResponseWriter, StepFuture, StepRegistry, StepRequest};
use crate::steps::error_page;

pub const LOGIN_PATH: &str = "/auth/login";

pub fn register(registry: &mut StepRegistry) {
    registry
        .register("guard.require_login", require_login)
        .register("guard.require_admin", require_admin)
        .register("guard.require_admin_json", require_admin_json);
}

/// Anonymous requests are sent to the login page.
fn require_login<'a>(
    _ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        if req.current_user.is_none() {
            return Ok(res.redirect(LOGIN_PATH));
        }
        Ok(Flow::Continue)
    })
}

/// Anonymous requests go to the login page; signed-in non-admins get 403.
fn require_admin<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let Some(user) = &req.current_user else {
            return Ok(res.redirect(LOGIN_PATH));
        };
        if !user.is_admin() {
            tracing::debug!(user = %user.username, path = %req.path, "Admin access denied");
            return error_page(res, StatusCode::FORBIDDEN, "Permission denied.");
        }
        ctx.insert("currentUser", user)?;
        Ok(Flow::Continue)
    })
}

/// Like `require_admin`, but answers non-admins with a JSON error.
fn require_admin_json<'a>(
    _ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let Some(user) = &req.current_user else {
            return Ok(res.redirect(LOGIN_PATH));
        };
        if !user.is_admin() {
            return Ok(res
                .status(StatusCode::FORBIDDEN)
                .json(json!({ "success": false, "error": "Forbidden" })));
        }
        Ok(Flow::Continue)
    })
}
