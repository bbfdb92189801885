// src/pipeline/hooks.rs

//! Registration of `before`, `on`, `after` and rollback handlers.
//!
//! User handlers may return any error type that converts into the pipeline's
//! `Err`; the conversion happens inside the boxed wrapper.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use crate::core::handler::{Handler, RollbackHandler};
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;
use std::future::Future;
use tracing::{event, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
  Before,
  On,
  After,
}

impl Phase {
  pub(crate) const ALL: [Phase; 3] = [Phase::Before, Phase::On, Phase::After];

  pub(crate) fn label(self) -> &'static str {
    match self {
      Phase::Before => "before",
      Phase::On => "on",
      Phase::After => "after",
    }
  }
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn before<F, E>(&mut self, step_name: &str, handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<PipelineControl, E>> + Send + 'static,
    E: Into<Err> + Send + Sync + 'static,
  {
    self.push_handler(Phase::Before, step_name, handler_fn);
  }

  pub fn on<F, E>(&mut self, step_name: &str, handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<PipelineControl, E>> + Send + 'static,
    E: Into<Err> + Send + Sync + 'static,
  {
    self.push_handler(Phase::On, step_name, handler_fn);
  }

  pub fn after<F, E>(&mut self, step_name: &str, handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<PipelineControl, E>> + Send + 'static,
    E: Into<Err> + Send + Sync + 'static,
  {
    self.push_handler(Phase::After, step_name, handler_fn);
  }

  /// Registers compensation for `step_name`. It runs only if the step
  /// completed and a later step returned an error.
  pub fn on_rollback<F, E>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<Err> + Send + Sync + 'static,
  {
    self.step_index(step_name);
    let wrapped: RollbackHandler<TData, Err> = Box::new(move |ctx| {
      let fut = handler_fn(ctx);
      Box::pin(async move { fut.await.map_err(Into::into) })
    });
    self
      .rollback_handlers
      .entry(step_name.to_string())
      .or_default()
      .push(wrapped);
    event!(Level::DEBUG, pipeline = %self.name, %step_name, "Rollback handler registered.");
  }

  /// Registers an already boxed handler, e.g. one shared between pipelines.
  pub fn on_boxed(&mut self, step_name: &str, handler: Handler<TData, Err>) {
    self.step_index(step_name);
    self.on_handlers.entry(step_name.to_string()).or_default().push(handler);
  }

  fn push_handler<F, E>(
    &mut self,
    phase: Phase,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, E>> + Send + 'static,
    E: Into<Err> + Send + Sync + 'static,
  {
    self.step_index(step_name);
    let wrapped: Handler<TData, Err> = Box::new(move |ctx| {
      let fut = handler_fn(ctx);
      Box::pin(async move { fut.await.map_err(Into::into) })
    });
    let map = match phase {
      Phase::Before => &mut self.before_handlers,
      Phase::On => &mut self.on_handlers,
      Phase::After => &mut self.after_handlers,
    };
    map.entry(step_name.to_string()).or_default().push(wrapped);
    event!(Level::DEBUG, pipeline = %self.name, %step_name, phase = phase.label(), "Handler registered.");
  }

  pub(crate) fn handlers_for(&self, phase: Phase, step_name: &str) -> &[Handler<TData, Err>] {
    let map = match phase {
      Phase::Before => &self.before_handlers,
      Phase::On => &self.on_handlers,
      Phase::After => &self.after_handlers,
    };
    map.get(step_name).map(Vec::as_slice).unwrap_or(&[])
  }
}
