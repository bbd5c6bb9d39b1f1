// jokko/src/pipeline/execution.rs

//! `Pipeline::run()`: walks the steps in order and applies each step's policy.

use super::definition::{Handler, Pipeline};
use super::{ContextData, PipelineControl, PipelineResult, StepPolicy};
use crate::error::PipelineError;
use tracing::{event, instrument, span, Instrument, Level};

enum StepOutcome<Err> {
  Done,
  Stopped,
  Failed(Err),
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<PipelineError> + Send + Sync + 'static,
{
  /// Executes every step against `ctx_data`.
  ///
  /// A required step with no handlers fails with `PipelineError::HandlerMissing`;
  /// a degradable one is skipped. Errors from a degradable step are reported to
  /// the degraded hooks and the run moves on to the next step.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(
      pipeline_context_data_type = %std::any::type_name::<TData>(),
      num_steps = self.steps.len(),
    ),
    err(Display)
  )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    event!(Level::DEBUG, "Pipeline execution starting.");
    let mut degraded = Vec::new();

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();
      let step_span = span!(
        Level::INFO,
        "pipeline_step",
        step_name,
        step_index = step_idx,
        policy = ?step_def.policy
      );

      if let Some(skip_if) = &step_def.skip_if {
        if skip_if(ctx_data.clone()) {
          event!(parent: &step_span, Level::DEBUG, "Step skipped due to 'skip_if' condition.");
          continue;
        }
      }

      let on_handlers = self.on.get(step_name).filter(|v| !v.is_empty());
      let after_handlers = self.after.get(step_name).filter(|v| !v.is_empty());

      if on_handlers.is_none() && after_handlers.is_none() {
        match step_def.policy {
          StepPolicy::Degradable => {
            event!(parent: &step_span, Level::DEBUG, "Degradable step has no handlers, skipping.");
            continue;
          }
          StepPolicy::Required => {
            event!(parent: &step_span, Level::ERROR, "Required step has no handlers.");
            return Err(Err::from(PipelineError::HandlerMissing {
              step_name: step_def.name.clone(),
            }));
          }
        }
      }

      let outcome = async {
        for handlers in [on_handlers, after_handlers].into_iter().flatten() {
          match run_handlers(handlers, &ctx_data).await {
            StepOutcome::Done => {}
            other => return other,
          }
        }
        StepOutcome::Done
      }
      .instrument(step_span.clone())
      .await;

      match outcome {
        StepOutcome::Done => {
          event!(parent: &step_span, Level::DEBUG, "Step finished.");
        }
        StepOutcome::Stopped => {
          event!(parent: &step_span, Level::INFO, "Pipeline stopped by a handler.");
          return Ok(PipelineResult::Stopped);
        }
        StepOutcome::Failed(err) => match step_def.policy {
          StepPolicy::Required => {
            event!(parent: &step_span, Level::ERROR, error = %err, "Required step failed.");
            return Err(err);
          }
          StepPolicy::Degradable => {
            event!(parent: &step_span, Level::WARN, error = %err, "Degradable step failed, continuing.");
            for hook in &self.degraded_hooks {
              hook(&ctx_data, step_name, &err);
            }
            degraded.push(step_def.name.clone());
          }
        },
      }
    }

    event!(Level::DEBUG, degraded = degraded.len(), "Pipeline execution completed.");
    Ok(PipelineResult::Completed { degraded })
  }
}

async fn run_handlers<TData, Err>(handlers: &[Handler<TData, Err>], ctx_data: &ContextData<TData>) -> StepOutcome<Err>
where
  TData: 'static + Send + Sync,
{
  for handler_fn in handlers {
    match handler_fn(ctx_data.clone()).await {
      Ok(PipelineControl::Continue) => {}
      Ok(PipelineControl::Stop) => return StepOutcome::Stopped,
      Err(e) => return StepOutcome::Failed(e),
    }
  }
  StepOutcome::Done
}
