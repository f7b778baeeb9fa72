//! Current-user resolution from the session cookie.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::http::server::AppState;
use crate::pipeline::CurrentUser;

/// Who is making the request, attached as a request extension.
#[derive(Debug, Clone, Default)]
pub struct Viewer {
    pub user: Option<CurrentUser>,
    /// Set only when the session resolved to an active user.
    pub session_id: Option<String>,
}

/// Resolve the session cookie. Unknown or expired sessions are ignored;
/// sessions of missing or deactivated users are destroyed.
pub async fn load_current_user(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let services = &state.services;
    let mut viewer = Viewer::default();

    if let Some(session_id) = services.sessions.session_id_from_headers(req.headers()) {
        match services.sessions.resolve(&session_id) {
            Ok(user_id) => match services.store.user_by_id(&user_id).await {
                Some(user) if user.is_active => {
                    viewer.user = Some(CurrentUser::from(&user));
                    viewer.session_id = Some(session_id);
                }
                Some(user) => {
                    tracing::info!(username = %user.username, "Session of deactivated user destroyed");
                    services.sessions.destroy(&session_id);
                }
                None => {
                    tracing::debug!(%user_id, "Session of missing user destroyed");
                    services.sessions.destroy(&session_id);
                }
            },
            Err(e) => tracing::debug!(error = %e, "Ignoring session cookie"),
        }
    }

    req.extensions_mut().insert(viewer);
    next.run(req).await
}
