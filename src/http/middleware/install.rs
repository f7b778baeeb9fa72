//! Installation gate.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::server::AppState;

pub const INSTALL_PATH: &str = "/install";

const ALWAYS_OPEN: [&str; 3] = [INSTALL_PATH, "/auth/login", "/static"];

fn under(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Paths reachable before installation: the wizard, login, and assets.
pub fn is_exempt(path: &str, uploads_prefix: &str) -> bool {
    ALWAYS_OPEN.iter().any(|prefix| under(path, prefix)) || under(path, uploads_prefix)
}

/// Redirect to the wizard until the `installed` setting is `"true"`.
pub async fn install_gate(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
    let path = req.uri().path();
    let uploads_prefix = state.services.config.uploads.url_prefix.trim_end_matches('/');
    if is_exempt(path, uploads_prefix) || state.services.store.is_installed().await {
        return next.run(req).await;
    }
    tracing::debug!(%path, "Not installed; redirecting to the wizard");
    (StatusCode::FOUND, [(header::LOCATION, INSTALL_PATH)]).into_response()
}
