//! Collaborators shared by every step.
//!
//! # Data Flow
//! ```text
//! BlogConfig
//!     → Services::new (open store, session table, hasher, uploads)
//!     → Arc<Services> held by the HTTP state
//!     → cloned into each StepRequest
//! ```
//!
//! # Design Decisions
//! - Created once at startup and never swapped; config changes need a restart
//! - Steps reach collaborators only through this bundle

pub mod markdown;
pub mod passwords;
pub mod session;
pub mod slug;
pub mod uploads;

use crate::config::BlogConfig;
use crate::store::{Store, StoreError};

pub use passwords::{PasswordError, PasswordHasher};
pub use session::{SessionError, SessionStore};
pub use uploads::{StoredUpload, UploadError, UploadStore};

/// Settings keys written by the install wizard and the admin settings page.
pub mod settings {
    pub const INSTALLED: &str = "installed";
    pub const BLOG_NAME: &str = "blog.name";
    pub const BLOG_DESCRIPTION: &str = "blog.description";
}

#[derive(Debug)]
pub struct Services {
    pub config: BlogConfig,
    pub store: Store,
    pub sessions: SessionStore,
    pub passwords: PasswordHasher,
    pub uploads: UploadStore,
}

impl Services {
    /// Build the bundle, opening the snapshot file when one is configured.
    pub fn new(config: BlogConfig) -> Result<Self, StoreError> {
        let store = match &config.storage.data_file {
            Some(path) => Store::open(path)?,
            None => Store::in_memory(),
        };
        Ok(Self::with_store(config, store))
    }

    /// Bundle over an empty in-memory store.
    pub fn in_memory(config: BlogConfig) -> Self {
        Self::with_store(config, Store::in_memory())
    }

    pub fn with_store(config: BlogConfig, store: Store) -> Self {
        Self {
            sessions: SessionStore::new(&config.session),
            passwords: PasswordHasher::new(config.auth.pbkdf2_iterations),
            uploads: UploadStore::new(&config.uploads),
            store,
            config,
        }
    }

    /// Blog name from settings, falling back to the configured site name.
    pub async fn blog_name(&self) -> String {
        self.store
            .setting(settings::BLOG_NAME)
            .await
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| self.config.site.name.clone())
    }

    pub async fn blog_description(&self) -> String {
        self.store
            .setting(settings::BLOG_DESCRIPTION)
            .await
            .unwrap_or_else(|| self.config.site.description.clone())
    }
}
