//! Middleware run before dispatch.
//!
//! # Order
//! ```text
//! request → session.rs (resolve cookie into a Viewer)
//!         → install.rs (send everything to /install until set up)
//!         → static files or dispatch
//! ```

pub mod install;
pub mod session;

pub use install::install_gate;
pub use session::{load_current_user, Viewer};
