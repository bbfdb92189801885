// src/pipeline/definition.rs

//! The `Pipeline<TData, Err>` struct and its step list.

use crate::core::handler::{Handler, RollbackHandler};
use crate::core::step::{SkipCondition, StepDef};
use crate::error::FlowError;
use std::collections::HashMap;

/// An ordered set of named steps over the context data type `TData`.
///
/// `Err` is the error type handlers return. It must absorb `FlowError` so the
/// engine can report setup problems (such as a required step without
/// handlers) through the same channel.
pub struct Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) name: String,
  pub(crate) steps: Vec<StepDef<TData>>,

  pub(crate) before_handlers: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) on_handlers: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) after_handlers: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) rollback_handlers: HashMap<String, Vec<RollbackHandler<TData, Err>>>,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Creates a pipeline from `(step_name, optional, skip_if)` tuples.
  pub fn new(name: &str, step_defs: &[(&str, bool, Option<SkipCondition<TData>>)]) -> Self {
    let mut pipeline = Self {
      name: name.to_string(),
      steps: Vec::with_capacity(step_defs.len()),
      before_handlers: HashMap::new(),
      on_handlers: HashMap::new(),
      after_handlers: HashMap::new(),
      rollback_handlers: HashMap::new(),
    };
    for (step_name, optional, skip_if) in step_defs {
      pipeline.ensure_step_not_exists(step_name);
      pipeline.steps.push(StepDef {
        name: (*step_name).to_string(),
        optional: *optional,
        skip_if: skip_if.clone(),
      });
    }
    pipeline
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  /// Replaces the skip condition of an existing step.
  pub fn set_skip_condition(&mut self, step_name: &str, skip_if: Option<SkipCondition<TData>>) {
    let idx = self.step_index(step_name);
    if let Some(step) = self.steps.get_mut(idx) {
      step.skip_if = skip_if;
    }
  }

  /// Returns the index of `step_name`. Panics on unknown names: a typo in a
  /// step name is a wiring bug, caught the first time the pipeline is built.
  pub(crate) fn step_index(&self, step_name: &str) -> usize {
    match self.steps.iter().position(|s| s.name == step_name) {
      Some(idx) => idx,
      None => panic!(
        "Stepflow setup error: step '{}' not found in pipeline '{}'.",
        step_name, self.name
      ),
    }
  }

  fn ensure_step_not_exists(&self, step_name: &str) {
    if self.steps.iter().any(|s| s.name == step_name) {
      panic!(
        "Stepflow setup error: step '{}' declared twice in pipeline '{}'.",
        step_name, self.name
      );
    }
  }

  pub(crate) fn has_handlers(&self, step_name: &str) -> bool {
    [&self.before_handlers, &self.on_handlers, &self.after_handlers]
      .iter()
      .any(|map| map.get(step_name).is_some_and(|v| !v.is_empty()))
  }
}
