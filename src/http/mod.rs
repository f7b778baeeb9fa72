//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, request ID, tracing, limits)
//!     → middleware/ (current user, installation gate)
//!     → /static, /uploads served from disk
//!     → dispatch.rs (decode body, match route, run pipeline)
//!     → Send to client
//! ```

pub mod dispatch;
pub mod middleware;
pub mod server;
pub mod tls;

pub use server::{AppState, HttpServer};
