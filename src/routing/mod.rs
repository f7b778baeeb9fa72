//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     features/ directory
//!     → tree.rs (walk into typed entries)
//!     → template.rs (classify segments: @method, [param], literal)
//!     → builder.rs (group step files per method dir, resolve handlers)
//!     → router.rs (freeze as immutable RouteTable)
//!
//! Incoming Request (method, path)
//!     → router.rs (route lookup)
//!     → matcher.rs (segment trie, literal before parameter)
//!     → Return: PathMatch or no match
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path
//! - Deterministic: same input always matches same route
//! - Ambiguous definitions fail the build instead of being resolved by order

pub mod builder;
pub mod matcher;
pub mod router;
pub mod template;
pub mod tree;

pub use builder::{BuildError, RouteTableBuilder};
pub use router::{PathMatch, PathParams, RouteDefinition, RouteStep, RouteTable};
pub use template::{Method, PathTemplate, Segment};
pub use tree::{FeatureEntry, FeatureTree};
