//! Blog settings, the administrator's profile and password change.

use serde::{Deserialize, Serialize};

use super::current_user;
use crate::pipeline::{Flow, RequestContext, ResponseWriter, StepFuture, StepRegistry, StepRequest};
use crate::services::settings as keys;
use crate::store::StoreError;
use crate::steps::chrome;
use crate::views::admin::{self, SettingsForm};

const MIN_PASSWORD_LEN: usize = 8;
const SETTINGS_PATH: &str = "/admin/settings";

pub(super) fn register(registry: &mut StepRegistry) {
    registry
        .register("admin.settings.fetch", fetch)
        .register("admin.settings.render", render)
        .register("admin.settings.validate", validate)
        .register("admin.settings.verify_password", verify_password)
        .register("admin.settings.update_profile", update_profile)
        .register("admin.settings.update_blog", update_blog)
        .register("admin.settings.update_password", update_password)
        .register("admin.settings.redirect", redirect);
}

/// Validated submission, stored under `settingsInput`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsInput {
    form: SettingsForm,
    password_change: Option<PasswordChange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordChange {
    current: String,
    new: String,
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

/// Settings are rendered with status 200 even when they carry errors.
async fn render_errors(
    req: &StepRequest,
    res: &mut ResponseWriter,
    form: &SettingsForm,
    errors: &[String],
) -> anyhow::Result<Flow> {
    let chrome = chrome(req).await;
    Ok(res.html(admin::settings(&chrome, form, errors, None)?))
}

fn submitted_form(req: &StepRequest) -> SettingsForm {
    let field = |name: &str| req.form.get(name).unwrap_or("").trim().to_string();
    SettingsForm {
        blog_name: field("blogName"),
        blog_description: field("blogDescription"),
        display_name: field("displayName"),
        email: field("email"),
    }
}

fn fetch<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    _res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let user = current_user(ctx)?;
        let store = &req.services.store;
        let profile = store.user_by_id(&user.id).await;
        let form = SettingsForm {
            blog_name: store.setting(keys::BLOG_NAME).await.unwrap_or_default(),
            blog_description: store.setting(keys::BLOG_DESCRIPTION).await.unwrap_or_default(),
            display_name: profile.as_ref().map_or(user.display_name.clone(), |u| u.display_name.clone()),
            email: profile.map_or(user.email, |u| u.email),
        };
        ctx.insert("settingsForm", form)?;
        Ok(Flow::Continue)
    })
}

fn render<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let form: SettingsForm = ctx.get("settingsForm")?;
        let success = (req.query.get("saved") == Some("1")).then_some("Settings saved.");
        let chrome = chrome(req).await;
        Ok(res.html(admin::settings(&chrome, &form, &[], success)?))
    })
}

/// Collects every problem with the submission before answering.
fn validate<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let form = submitted_form(req);
        let mut errors = Vec::new();

        if form.blog_name.is_empty() {
            errors.push("Please enter blog name.".to_string());
        }
        if form.display_name.is_empty() {
            errors.push("Please enter display name.".to_string());
        }
        if !is_valid_email(&form.email) {
            errors.push("Please enter a valid email.".to_string());
        }

        let current = req.form.get("currentPassword").unwrap_or("");
        let new = req.form.get("newPassword").unwrap_or("");
        let confirm = req.form.get("newPasswordConfirm").unwrap_or("");
        let wants_change = !(current.is_empty() && new.is_empty() && confirm.is_empty());
        if wants_change {
            if current.is_empty() {
                errors.push("Please enter current password.".to_string());
            }
            if new.is_empty() {
                errors.push("Please enter new password.".to_string());
            }
            if confirm.is_empty() {
                errors.push("Please enter new password confirmation.".to_string());
            }
            if !new.is_empty() && !confirm.is_empty() && new != confirm {
                errors.push("Passwords do not match.".to_string());
            }
            if !new.is_empty() && new.chars().count() < MIN_PASSWORD_LEN {
                errors.push("Password must be at least 8 characters long.".to_string());
            }
        }

        if !errors.is_empty() {
            return render_errors(req, res, &form, &errors).await;
        }

        let password_change = wants_change.then(|| PasswordChange {
            current: current.to_string(),
            new: new.to_string(),
        });
        ctx.insert("settingsInput", SettingsInput { form, password_change })?;
        Ok(Flow::Continue)
    })
}

/// Checks the current password before anything is written.
fn verify_password<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let input: SettingsInput = ctx.get("settingsInput")?;
        let Some(change) = &input.password_change else {
            return Ok(Flow::Continue);
        };
        let user = current_user(ctx)?;
        let services = &req.services;
        let stored = services
            .store
            .user_by_id(&user.id)
            .await
            .ok_or(StoreError::NotFound { entity: "user" })?;
        let valid = services
            .passwords
            .verify(&change.current, &stored.password)
            .await
            .unwrap_or(false);
        if !valid {
            let errors = ["Current password is incorrect.".to_string()];
            return render_errors(req, res, &input.form, &errors).await;
        }
        Ok(Flow::Continue)
    })
}

fn update_profile<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let input: SettingsInput = ctx.get("settingsInput")?;
        let user = current_user(ctx)?;
        let updated = req
            .services
            .store
            .update_profile(&user.id, &input.form.display_name, &input.form.email)
            .await;
        match updated {
            Ok(_) => Ok(Flow::Continue),
            Err(StoreError::UniqueViolation { .. }) => {
                let errors = ["Email is already in use.".to_string()];
                render_errors(req, res, &input.form, &errors).await
            }
            Err(e) => Err(e.into()),
        }
    })
}

fn update_blog<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    _res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let input: SettingsInput = ctx.get("settingsInput")?;
        let store = &req.services.store;
        store.set_setting(keys::BLOG_NAME, &input.form.blog_name).await?;
        store
            .set_setting(keys::BLOG_DESCRIPTION, &input.form.blog_description)
            .await?;
        Ok(Flow::Continue)
    })
}

fn update_password<'a>(
    ctx: &'a mut RequestContext,
    req: &'a StepRequest,
    _res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move {
        let input: SettingsInput = ctx.get("settingsInput")?;
        let Some(change) = input.password_change else {
            return Ok(Flow::Continue);
        };
        let user = current_user(ctx)?;
        let services = &req.services;
        let hash = services.passwords.hash(&change.new).await?;
        services.store.update_password(&user.id, &hash).await?;
        let dropped = services
            .sessions
            .destroy_user(&user.id, req.session_id.as_deref());
        tracing::info!(username = %user.username, other_sessions = dropped, "Password changed");
        Ok(Flow::Continue)
    })
}

fn redirect<'a>(
    _ctx: &'a mut RequestContext,
    _req: &'a StepRequest,
    res: &'a mut ResponseWriter,
) -> StepFuture<'a> {
    Box::pin(async move { Ok(res.redirect(&format!("{SETTINGS_PATH}?saved=1"))) })
}
