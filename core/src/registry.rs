// src/registry.rs

//! `Stepflow<E>`: pipelines keyed by their context data type.
//!
//! Registering a `Pipeline<TData, E>` replaces any pipeline previously
//! registered for `TData`. `run` dispatches on the type of the context passed
//! in, so callers never name the pipeline they want.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineResult;
use crate::error::FlowError;
use crate::pipeline::Pipeline;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{event, Level};

#[async_trait]
trait ErasedPipeline<E>: Send + Sync
where
  E: std::error::Error + Send + Sync + 'static,
{
  async fn run_erased(&self, ctx_obj: Box<dyn Any + Send>) -> Result<PipelineResult, E>;
}

#[async_trait]
impl<TData, E> ErasedPipeline<E> for Pipeline<TData, E>
where
  TData: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  async fn run_erased(&self, ctx_obj: Box<dyn Any + Send>) -> Result<PipelineResult, E> {
    let ctx_data = match ctx_obj.downcast::<ContextData<TData>>() {
      Ok(boxed) => *boxed,
      Err(_) => {
        let expected_type = std::any::type_name::<ContextData<TData>>();
        event!(Level::ERROR, %expected_type, "Context type mismatch in registry dispatch.");
        return Err(E::from(FlowError::TypeMismatch { expected_type }));
      }
    };
    self.run(ctx_data).await
  }
}

pub struct Stepflow<E = FlowError>
where
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pipelines: RwLock<HashMap<TypeId, Arc<dyn ErasedPipeline<E>>>>,
}

impl<E> Stepflow<E>
where
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      pipelines: RwLock::new(HashMap::new()),
    }
  }

  pub fn register_pipeline<TData>(&self, pipeline: Pipeline<TData, E>)
  where
    TData: 'static + Send + Sync,
  {
    event!(
      Level::DEBUG,
      pipeline = %pipeline.name(),
      context_type = %std::any::type_name::<TData>(),
      "Registering pipeline."
    );
    self.pipelines.write().insert(TypeId::of::<TData>(), Arc::new(pipeline));
  }

  pub fn is_registered<TData: 'static>(&self) -> bool {
    self.pipelines.read().contains_key(&TypeId::of::<TData>())
  }

  /// Runs the pipeline registered for `TData`. The context handle is shared,
  /// so the caller's clone observes everything the handlers wrote.
  pub async fn run<TData>(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, E>
  where
    TData: 'static + Send + Sync,
  {
    let runner = self.pipelines.read().get(&TypeId::of::<TData>()).cloned();
    let Some(runner) = runner else {
      let context_type = std::any::type_name::<TData>();
      event!(Level::ERROR, %context_type, "No pipeline registered.");
      return Err(E::from(FlowError::PipelineNotRegistered { context_type }));
    };
    runner.run_erased(Box::new(ctx_data)).await
  }
}

impl<E> Default for Stepflow<E>
where
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}
