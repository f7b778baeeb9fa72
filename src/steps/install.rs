//! First-run installation wizard: `GET|POST /install`.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::pipeline::{Flow, RequestContext, ResponseWriter, StepFuture, StepRegistry, StepRequest};
use crate::services::settings;
use crate::store::{NewUser, Role, StoreError};
use crate::steps::chrome;
use crate::views;

const MIN_PASSWORD_LEN: usize = 8;

pub fn register(registry: &mut StepRegistry) {
    registry
        .register("install.check", check)
        .register("install.render_form", render_form)
        .register("install.validate", validate)
        .register("install.create_admin", create_admin)
        .register("install.mark_installed", mark_installed)
        .register("install.redirect_login", redirect_login);
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdminInput {
    username: String,
    email: String,
    password: String,
    display_name: String,
}

async fn reject(
    req: &StepRequest,
    res: &mut ResponseWriter,
    message: &str,
) -> anyhow::Result<Flow> {
    let chrome = chrome(req).await;
    Ok(res
        .status(StatusCode::BAD_REQUEST)
        .html(views::auth::install(&chrome, &req.form, Some(message))?))
}

/// An installed site has nothing to set up.
fn check<'a>(
    _ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        if req.services.store.is_installed().await {
            return Ok(res.redirect("/"));
        }
        Ok(Flow::Continue)
    })
}

fn render_form<'a>(
    _ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let chrome = chrome(req).await;
        Ok(res.html(views::auth::install(&chrome, &req.form, None)?))
    })
}

fn validate<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let store = &req.services.store;
        if store.is_installed().await {
            return reject(req, res, "Installation already completed.").await;
        }

        let form = &req.form;
        let fields = (
            form.non_empty("username"),
            form.non_empty("email"),
            form.get("password").filter(|p| !p.is_empty()),
            form.get("passwordConfirm").filter(|p| !p.is_empty()),
            form.non_empty("displayName"),
        );
        let (Some(username), Some(email), Some(password), Some(confirm), Some(display_name)) =
            fields
        else {
            return reject(req, res, "All required fields must be filled in.").await;
        };
        if password != confirm {
            return reject(req, res, "Passwords do not match.").await;
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return reject(req, res, "Password must be at least 8 characters long.").await;
        }
        if store.user_by_username(username).await.is_some() {
            return reject(req, res, "Username is already in use.").await;
        }

        ctx.insert(
            "adminInput",
            AdminInput {
                username: username.to_string(),
                email: email.to_string(),
                password: password.to_string(),
                display_name: display_name.to_string(),
            },
        )?;
        Ok(Flow::Continue)
    })
}

fn create_admin<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let input: AdminInput = ctx.get("adminInput")?;
        let services = &req.services;
        let password_hash = services.passwords.hash(&input.password).await?;
        let created = services
            .store
            .create_user(NewUser {
                username: input.username,
                email: input.email,
                password_hash,
                display_name: input.display_name,
                role: Role::Admin,
            })
            .await;
        match created {
            Ok(user) => {
                tracing::info!(username = %user.username, "Administrator account created");
                Ok(Flow::Continue)
            }
            Err(StoreError::UniqueViolation { field: "email", .. }) => {
                reject(req, res, "Email is already in use.").await
            }
            Err(StoreError::UniqueViolation { .. }) => {
                reject(req, res, "Username is already in use.").await
            }
            Err(e) => Err(e.into()),
        }
    })
}

fn mark_installed<'a>(
    _ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    _res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        req.services.store.set_setting(settings::INSTALLED, "true").await?;
        tracing::info!("Installation completed");
        Ok(Flow::Continue)
    })
}

fn redirect_login<'a>(
    _ctx: &'a mut RequestContext,
    _req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move { Ok(res.redirect("/auth/login")) })
}
