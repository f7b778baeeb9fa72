//! Startup orchestration.
//!
//! # Responsibilities
//! - Open the datastore and build the shared collaborators
//! - Scan the feature tree and build the route table
//! - Start background maintenance (expired-session purge)
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Routes are built once; the table is immutable while serving

use std::sync::Arc;
use std::time::Duration;

use crate::config::BlogConfig;
use crate::observability::metrics;
use crate::pipeline::StepRegistry;
use crate::routing::{BuildError, RouteTable, RouteTableBuilder};
use crate::services::Services;
use crate::steps;
use crate::store::StoreError;

use super::shutdown::Shutdown;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to open datastore: {0}")]
    Store(#[from] StoreError),
    #[error("failed to build routes: {0}")]
    Routes(#[from] BuildError),
}

/// Everything the HTTP layer serves from.
#[derive(Debug, Clone)]
pub struct Application {
    pub table: Arc<RouteTable>,
    pub services: Arc<Services>,
}

/// Build the application from `config` with every registered step.
pub fn build_application(config: BlogConfig) -> Result<Application, StartupError> {
    build_with_registry(config, &steps::registry())
}

pub fn build_with_registry(
    config: BlogConfig,
    registry: &StepRegistry,
) -> Result<Application, StartupError> {
    let features_root = config.features.root.clone();
    let services = Services::new(config)?;
    tracing::info!(
        persistent = services.config.storage.data_file.is_some(),
        "Datastore ready"
    );

    let table = RouteTableBuilder::new(registry).build_from_dir(&features_root)?;
    tracing::info!(
        root = %features_root.display(),
        routes = table.len(),
        "Route table built"
    );

    Ok(Application {
        table: Arc::new(table),
        services: Arc::new(services),
    })
}

/// Purge expired sessions every `every` until shutdown.
pub fn spawn_session_purger(services: Arc<Services>, shutdown: &Shutdown, every: Duration) {
    let mut rx = shutdown.subscribe();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let purged = services.sessions.purge_expired();
                    if purged > 0 {
                        tracing::debug!(purged, "Expired sessions purged");
                        metrics::record_sessions_purged(purged);
                    }
                }
                _ = rx.recv() => {
                    tracing::debug!("Session purger stopping");
                    break;
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_feature_root_is_fatal() {
        let mut config = BlogConfig::default();
        config.features.root = "/definitely/not/here".into();
        let err = build_application(config).unwrap_err();
        assert!(matches!(err, StartupError::Routes(_)));
    }

    #[test]
    fn test_builds_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let steps = dir.path().join("about/@get/steps");
        std::fs::create_dir_all(&steps).unwrap();
        std::fs::write(steps.join("100-prepare.toml"), "handler = \"about.prepare_data\"").unwrap();
        std::fs::write(steps.join("200-render.toml"), "handler = \"about.render\"").unwrap();

        let mut config = BlogConfig::default();
        config.features.root = dir.path().to_path_buf();
        let app = build_application(config).unwrap();
        assert_eq!(app.table.len(), 1);
        assert!(app.table.has_path("/about"));
    }
}
