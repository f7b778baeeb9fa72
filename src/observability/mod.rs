//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! dispatch, executor, background tasks
//!     → logging.rs (structured `tracing` events, pretty or JSON)
//!     → metrics.rs (counters and histograms, Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - The request id set by the HTTP layer is attached to every dispatch span
//! - Metrics are off by default and cost nothing when disabled

pub mod logging;
pub mod metrics;
