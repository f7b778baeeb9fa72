//! `/auth/login` and `/auth/logout`.

use axum::http::StatusCode;

use crate::pipeline::{
    CurrentUser, Flow, RequestContext, ResponseWriter, StepFuture, StepRegistry, StepRequest,
};
use crate::steps::chrome;
use crate::views;

const INVALID_CREDENTIALS: &str = "Invalid username or password.";

pub fn register(registry: &mut StepRegistry) {
    registry
        .register("auth.render_login", render_login)
        .register("auth.validate_login", validate_login)
        .register("auth.authenticate", authenticate)
        .register("auth.start_session", start_session)
        .register("auth.logout", logout);
}

async fn reject(
    req: &StepRequest,
    res: &mut ResponseWriter,
    message: &str,
) -> anyhow::Result<Flow> {
    let chrome = chrome(req).await;
    Ok(res
        .status(StatusCode::BAD_REQUEST)
        .html(views::auth::login(&chrome, &req.form, Some(message))?))
}

fn render_login<'a>(
    _ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let chrome = chrome(req).await;
        Ok(res.html(views::auth::login(&chrome, &req.form, None)?))
    })
}

fn validate_login<'a>(
    _ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let has_username = req.form.non_empty("username").is_some();
        let has_password = req.form.get("password").is_some_and(|p| !p.is_empty());
        if !has_username || !has_password {
            return reject(req, res, "All required fields must be filled in.").await;
        }
        Ok(Flow::Continue)
    })
}

/// Checks the credentials and stores the user under `user`.
fn authenticate<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let services = &req.services;
        let username = req.form.non_empty("username").unwrap_or("");
        let password = req.form.get("password").unwrap_or("");

        let Some(user) = services.store.user_by_username(username).await else {
            tracing::debug!(%username, "Login for unknown user");
            return reject(req, res, INVALID_CREDENTIALS).await;
        };
        let valid = match services.passwords.verify(password, &user.password).await {
            Ok(valid) => valid,
            Err(e) => {
                tracing::warn!(%username, error = %e, "Stored password hash unusable");
                false
            }
        };
        if !valid {
            return reject(req, res, INVALID_CREDENTIALS).await;
        }
        if !user.is_active {
            return reject(req, res, "Account is deactivated. Please contact administrator.").await;
        }

        ctx.insert("user", CurrentUser::from(&user))?;
        Ok(Flow::Continue)
    })
}

fn start_session<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let user: CurrentUser = ctx.get("user")?;
        let sessions = &req.services.sessions;
        if let Some(previous) = &req.session_id {
            sessions.destroy(previous);
        }
        let session_id = sessions.create(&user.id);
        tracing::info!(username = %user.username, "User logged in");
        Ok(res.set_cookie(&sessions.session_cookie(&session_id)).redirect("/"))
    })
}

fn logout<'a>(
    _ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let sessions = &req.services.sessions;
        if let Some(session_id) = &req.session_id {
            sessions.destroy(session_id);
        }
        Ok(res.set_cookie(&sessions.clear_cookie()).redirect("/"))
    })
}
