//! Structured logging.
//!
//! # Responsibilities
//! - Install the global `tracing` subscriber once at startup
//! - Pick the output format from config (`pretty` or `json`)
//!
//! # Design Decisions
//! - `RUST_LOG`, when set, overrides the configured level
//! - A second initialization is reported, not fatal, so tests and the CLI
//!   can call this freely

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::ObservabilityConfig;

/// Filter used when `RUST_LOG` is unset.
pub fn default_directives(level: &str) -> String {
    format!("stepwise_blog={level},tower_http={level},warn")
}

/// Install the global subscriber. Returns `false` if one was already set.
pub fn init_logging(config: &ObservabilityConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.log_level)));

    let json = config.log_format.eq_ignore_ascii_case("json");
    let json_layer = json.then(|| fmt::layer().json().with_current_span(true));
    let text_layer = (!json).then(fmt::layer);

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .is_ok()
}
