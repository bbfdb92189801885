// src/pipeline/execution.rs

//! `Pipeline::run()`: walks the steps in order, runs each phase's handlers and
//! compensates completed steps in reverse order when a later step fails.

use crate::core::context_data::ContextData;
use crate::core::control::{PipelineControl, PipelineResult};
use crate::core::step::StepDef;
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;
use crate::pipeline::hooks::Phase;
use tracing::{event, instrument, span, Instrument, Level};

enum StepOutcome {
  Done,
  Skipped,
  Stopped,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Executes the pipeline against `ctx_data`.
  ///
  /// A handler returning `Stop` ends the run with `PipelineResult::Stopped` and
  /// no rollback. A handler error (or a required step with no handlers) rolls
  /// back every step that already completed, newest first, and then returns
  /// the original error.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(
      pipeline = %self.name,
      context_type = %std::any::type_name::<TData>(),
      num_steps = self.steps.len(),
    ),
    err(Display)
  )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    event!(Level::DEBUG, "Pipeline execution starting.");
    let mut completed: Vec<&str> = Vec::with_capacity(self.steps.len());

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_span = span!(
        Level::INFO,
        "pipeline_step",
        step_name = step_def.name.as_str(),
        step_index = step_idx,
        optional = step_def.optional
      );

      match self.run_step(step_def, &ctx_data).instrument(step_span).await {
        Ok(StepOutcome::Done) => completed.push(step_def.name.as_str()),
        Ok(StepOutcome::Skipped) => {}
        Ok(StepOutcome::Stopped) => {
          event!(Level::INFO, step_name = %step_def.name, "Pipeline stopped early.");
          return Ok(PipelineResult::Stopped);
        }
        Err(e) => {
          event!(Level::ERROR, step_name = %step_def.name, error = %e, "Step failed, rolling back.");
          self.roll_back(&completed, &ctx_data).await;
          return Err(e);
        }
      }
    }

    event!(Level::DEBUG, "Pipeline execution completed.");
    Ok(PipelineResult::Completed)
  }

  async fn run_step(&self, step_def: &StepDef<TData>, ctx_data: &ContextData<TData>) -> Result<StepOutcome, Err> {
    if step_def.should_skip(ctx_data) {
      event!(Level::INFO, "Step skipped by its skip condition.");
      return Ok(StepOutcome::Skipped);
    }

    if !self.has_handlers(&step_def.name) {
      if step_def.optional {
        event!(Level::DEBUG, "Optional step has no handlers, passing over it.");
        return Ok(StepOutcome::Skipped);
      }
      event!(Level::ERROR, "Required step has no handlers.");
      return Err(Err::from(FlowError::HandlerMissing {
        step_name: step_def.name.clone(),
      }));
    }

    for phase in Phase::ALL {
      for (handler_idx, handler_fn) in self.handlers_for(phase, &step_def.name).iter().enumerate() {
        let handler_span = span!(Level::DEBUG, "handler", phase = phase.label(), handler_index = handler_idx);
        match handler_fn(ctx_data.clone()).instrument(handler_span).await {
          Ok(PipelineControl::Continue) => {}
          Ok(PipelineControl::Stop) => {
            event!(Level::INFO, phase = phase.label(), "Handler requested stop.");
            return Ok(StepOutcome::Stopped);
          }
          Err(e) => {
            event!(Level::WARN, phase = phase.label(), error = %e, "Handler failed.");
            return Err(e);
          }
        }
      }
    }

    Ok(StepOutcome::Done)
  }

  async fn roll_back(&self, completed: &[&str], ctx_data: &ContextData<TData>) {
    for step_name in completed.iter().rev() {
      let Some(handlers) = self.rollback_handlers.get(*step_name) else {
        continue;
      };
      for handler_fn in handlers {
        let rollback_span = span!(Level::INFO, "rollback", step_name = *step_name);
        if let Err(e) = handler_fn(ctx_data.clone()).instrument(rollback_span).await {
          event!(Level::ERROR, step_name = *step_name, error = %e, "Rollback handler failed.");
        }
      }
    }
  }
}
