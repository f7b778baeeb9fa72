//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the blog.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the blog server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BlogConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Site identity used by views and the sitemap.
    pub site: SiteConfig,

    /// Location of the feature tree.
    pub features: FeaturesConfig,

    /// Datastore persistence.
    pub storage: StorageConfig,

    /// Session cookie settings.
    pub session: SessionConfig,

    /// Password hashing.
    pub auth: AuthConfig,

    /// Image uploads.
    pub uploads: UploadConfig,

    /// Static asset directory.
    pub static_files: StaticConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:5555").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:5555".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Name shown when the `blog.name` setting is absent.
    pub name: String,
    pub description: String,
    /// Absolute base URL for sitemap entries, without trailing slash.
    pub base_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "Stepwise Blog".to_string(),
            description: "A blog served by a step pipeline".to_string(),
            base_url: "http://localhost:5555".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeaturesConfig {
    /// Root of the route tree.
    pub root: PathBuf,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("features"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON snapshot file. Absent means data lives in memory only.
    pub data_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,
    /// Session lifetime in seconds.
    pub ttl_secs: u64,
    /// Add the `Secure` attribute to the cookie.
    pub secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "blog_session".to_string(),
            ttl_secs: 24 * 60 * 60,
            secure: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// PBKDF2-HMAC-SHA256 iteration count for new hashes.
    pub pbkdf2_iterations: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            pbkdf2_iterations: 100_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Directory uploaded images are written to.
    pub dir: PathBuf,
    /// URL prefix the directory is served under.
    pub url_prefix: String,
    /// Largest accepted image in bytes.
    pub max_file_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("public/uploads"),
            url_prefix: "/uploads".to_string(),
            max_file_bytes: 5 * 1024 * 1024, // 5MB
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticConfig {
    /// Served under `/static`.
    pub dir: PathBuf,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("public"),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// `pretty` or `json`.
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable security headers.
    pub enable_headers: bool,
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            max_body_size: 8 * 1024 * 1024, // 8MB, above the upload limit
        }
    }
}
