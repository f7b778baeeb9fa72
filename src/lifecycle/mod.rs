//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Services (store, sessions, hasher) → feature tree → route table
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → server drains → background tasks exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then collaborators, then routes, then
//!   listeners
//! - Any startup error is fatal; the server never runs with a partial table

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{build_application, spawn_session_purger, Application, StartupError};
