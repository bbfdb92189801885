// src/core/handler.rs

use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use std::future::Future;
use std::pin::Pin;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A step handler. It receives its own handle to the shared context, so it
/// can be `'static` and hold the handle across awaits (but never a guard).
pub type Handler<TData, Err> =
  Box<dyn Fn(ContextData<TData>) -> BoxFuture<'static, Result<PipelineControl, Err>> + Send + Sync>;

/// Compensation for a completed step. Failures are logged by the pipeline and
/// do not replace the error that triggered the rollback.
pub type RollbackHandler<TData, Err> =
  Box<dyn Fn(ContextData<TData>) -> BoxFuture<'static, Result<(), Err>> + Send + Sync>;
