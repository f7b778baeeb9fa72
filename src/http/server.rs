//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: static directories plus the dispatch fallback
//! - Wire up middleware (request ID, tracing, timeout, body limit, headers)
//! - Serve plain HTTP or TLS until shutdown is triggered

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Request},
    middleware, Router,
};
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{BlogConfig, TlsConfig};
use crate::lifecycle::{Application, Shutdown};
use crate::routing::RouteTable;
use crate::services::Services;

use super::{dispatch, middleware as mw, tls};

/// How long in-flight requests may take to finish after shutdown starts.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Application state injected into handlers and middleware.
#[derive(Debug, Clone)]
pub struct AppState {
    pub table: Arc<RouteTable>,
    pub services: Arc<Services>,
}

impl From<Application> for AppState {
    fn from(app: Application) -> Self {
        Self {
            table: app.table,
            services: app.services,
        }
    }
}

pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    pub fn new(app: Application) -> Self {
        let state = AppState::from(app);
        let router = Self::build_router(&state.services.config, state.clone());
        Self { router, state }
    }

    /// The fully layered router, for serving or for driving in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    #[allow(deprecated)]
    fn build_router(config: &BlogConfig, state: AppState) -> Router {
        let uploads_prefix = config.uploads.url_prefix.trim_end_matches('/').to_string();
        let x_request_id = HeaderName::from_static("x-request-id");

        let mut router = Router::new()
            .nest_service("/static", ServeDir::new(&config.static_files.dir))
            .nest_service(&uploads_prefix, ServeDir::new(&config.uploads.dir))
            .fallback(dispatch::dispatch)
            .layer(middleware::from_fn_with_state(state.clone(), mw::install_gate))
            .layer(middleware::from_fn_with_state(state.clone(), mw::load_current_user))
            .with_state(state);

        if config.security.enable_headers {
            router = router
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::X_FRAME_OPTIONS,
                    HeaderValue::from_static("DENY"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::REFERRER_POLICY,
                    HeaderValue::from_static("strict-origin-when-cross-origin"),
                ));
        }

        router
            .layer(DefaultBodyLimit::max(config.security.max_body_size))
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
            .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                let request_id = req
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "request",
                    method = %req.method(),
                    path = %req.uri().path(),
                    request_id = %request_id,
                )
            }))
            .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
    }

    /// Serve plain HTTP on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: &Shutdown) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let rx = shutdown.subscribe();
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(Shutdown::wait(rx))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve HTTPS on `addr` until `shutdown` fires.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls_config: &TlsConfig,
        shutdown: &Shutdown,
    ) -> std::io::Result<()> {
        let rustls = tls::load_rustls_config(tls_config).await?;
        let handle = axum_server::Handle::new();

        let mut rx = shutdown.subscribe();
        let drain = handle.clone();
        tokio::spawn(async move {
            let _ = rx.recv().await;
            drain.graceful_shutdown(Some(DRAIN_TIMEOUT));
        });

        tracing::info!(address = %addr, "HTTPS server starting");
        axum_server::bind_rustls(addr, rustls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}
