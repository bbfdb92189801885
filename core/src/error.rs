// src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

/// Framework-level failures. Pipelines are generic over their own error type,
/// which must be constructible from `FlowError`.
#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("No pipeline registered for context type {context_type}")]
  PipelineNotRegistered { context_type: &'static str },

  #[error("Context type mismatch during registry dispatch (expected {expected_type})")]
  TypeMismatch { expected_type: &'static str },

  #[error("Step handler failed: {source}")]
  Handler {
    #[source]
    source: AnyhowError,
  },
}

impl From<AnyhowError> for FlowError {
  fn from(source: AnyhowError) -> Self {
    FlowError::Handler { source }
  }
}

pub type FlowResult<T, E = FlowError> = std::result::Result<T, E>;
