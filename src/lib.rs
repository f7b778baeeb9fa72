//! Stepwise blog library.
//!
//! Every route is a directory in the feature tree whose step files name
//! handlers in a [`pipeline::StepRegistry`]. Requests are matched against the
//! built [`routing::RouteTable`] and run through the step pipeline.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pipeline;
pub mod routing;
pub mod services;
pub mod steps;
pub mod store;
pub mod views;

pub use config::BlogConfig;
pub use http::HttpServer;
pub use lifecycle::{build_application, Application, Shutdown};
pub use pipeline::{RequestContext, StepRegistry};
pub use routing::RouteTable;
