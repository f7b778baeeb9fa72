//! Step pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! PathMatch (route + params) + decoded request
//!     → executor.rs (fresh RequestContext, optional initializer)
//!     → step.rs (each Step runs against context, request, response)
//!     → response.rs (committing a response halts the pipeline)
//!     → PipelineOutcome or the failing step's error
//! ```
//!
//! # Design Decisions
//! - Steps are sequential within a request; requests run concurrently
//! - The short-circuit is explicit (`Flow::Halt`) and also detected from the
//!   response state, so either signal stops the pipeline
//! - Steps are looked up by name through `StepRegistry`, never by reflection

pub mod context;
pub mod executor;
pub mod registry;
pub mod request;
pub mod response;
pub mod step;

pub use context::{ContextError, RequestContext};
pub use executor::{execute, PipelineOutcome};
pub use registry::StepRegistry;
pub use request::{CurrentUser, FormData, StepRequest, UploadedFile};
pub use response::ResponseWriter;
pub use step::{Flow, Step, StepFuture};
