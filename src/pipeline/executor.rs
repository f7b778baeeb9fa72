//! Step pipeline execution.
//!
//! # Responsibilities
//! - Create the request's context and run the optional initializer
//! - Run the route's steps strictly in order, one at a time
//! - Stop at the first step that halts, commits a response, or fails
//!
//! # Design Decisions
//! - The context lives on this function's stack; it is dropped on every exit
//!   path and never escapes to another request
//! - Failures are returned unchanged so callers can downcast them
//! - No retries and no rollback of side effects already performed

use super::context::RequestContext;
use super::request::StepRequest;
use super::response::ResponseWriter;
use super::step::Flow;
use crate::observability::metrics;
use crate::routing::{RouteDefinition, RouteStep};

/// How a pipeline ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Every step ran.
    Completed { steps_run: usize },
    /// `step` wrote a response or returned [`Flow::Halt`]; later steps were skipped.
    ShortCircuited { step: String, steps_run: usize },
}

impl PipelineOutcome {
    pub fn steps_run(&self) -> usize {
        match self {
            PipelineOutcome::Completed { steps_run } => *steps_run,
            PipelineOutcome::ShortCircuited { steps_run, .. } => *steps_run,
        }
    }
}

/// Run `route` for one request.
///
/// `steps_run` counts numbered steps only; an initializer that halts yields
/// `ShortCircuited { steps_run: 0 }`.
pub async fn execute(
    route: &RouteDefinition,
    req: &StepRequest,
    res: &mut ResponseWriter,
) -> anyhow::Result<PipelineOutcome> {
    let mut ctx = RequestContext::new();
    let label = route.template().to_string();

    if let Some(init) = route.initializer() {
        if run_step(&label, init, &mut ctx, req, res).await? {
            return Ok(short_circuit(&label, init, 0));
        }
    }

    let mut steps_run = 0;
    for step in route.steps() {
        if res.is_finished() {
            return Ok(short_circuit(&label, step, steps_run));
        }
        let halted = run_step(&label, step, &mut ctx, req, res).await?;
        steps_run += 1;
        if halted {
            return Ok(short_circuit(&label, step, steps_run));
        }
    }

    Ok(PipelineOutcome::Completed { steps_run })
}

/// Run one step; `true` means the pipeline must stop.
async fn run_step(
    label: &str,
    step: &RouteStep,
    ctx: &mut RequestContext,
    req: &StepRequest,
    res: &mut ResponseWriter,
) -> anyhow::Result<bool> {
    tracing::trace!(route = label, step = step.name(), handler = step.handler_key(), "Running step");
    match step.handler().run(ctx, req, res).await {
        Ok(flow) => Ok(flow == Flow::Halt || res.is_finished()),
        Err(e) => {
            tracing::warn!(
                route = label,
                step = step.name(),
                handler = step.handler_key(),
                error = %e,
                "Step failed; aborting pipeline"
            );
            metrics::record_step_failure(label, step.name());
            Err(e)
        }
    }
}

fn short_circuit(label: &str, step: &RouteStep, steps_run: usize) -> PipelineOutcome {
    tracing::debug!(route = label, step = step.name(), steps_run, "Pipeline short-circuited");
    metrics::record_short_circuit(label, step.name());
    PipelineOutcome::ShortCircuited {
        step: step.name().to_string(),
        steps_run,
    }
}
