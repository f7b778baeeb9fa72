//! The step contract.

use std::future::Future;
use std::pin::Pin;

use super::context::RequestContext;
use super::request::StepRequest;
use super::response::ResponseWriter;

/// What the executor should do after a step returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Run the next step.
    Continue,
    /// A response has been written; skip the remaining steps.
    Halt,
}

/// Boxed future returned by a step.
pub type StepFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<Flow>> + Send + 'a>>;

/// One unit of work in a route's pipeline.
///
/// Plain functions with the matching signature implement this trait, so most
/// steps are written as
///
/// ```ignore
/// fn render<'a>(
///     ctx: &'a mut RequestContext,
///     req: &'a StepRequest,
///     res: &'a mut ResponseWriter,
/// ) -> StepFuture<'a> {
///     Box::pin(async move { Ok(res.html("...")) })
/// }
/// ```
pub trait Step: Send + Sync + 'static {
    fn run<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        req: &'a StepRequest,
        res: &'a mut ResponseWriter,
    ) -> StepFuture<'a>;
}

impl<F> Step for F
where
    F: for<'a> Fn(&'a mut RequestContext, &'a StepRequest, &'a mut ResponseWriter) -> StepFuture<'a>
        + Send
        + Sync
        + 'static,
{
    fn run<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        req: &'a StepRequest,
        res: &'a mut ResponseWriter,
    ) -> StepFuture<'a> {
        self(ctx, req, res)
    }
}
