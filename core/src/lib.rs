// src/lib.rs

//! Stepflow: a small async workflow engine.
//!
//! A [`Pipeline`] is an ordered list of named steps run against one shared
//! [`ContextData`]. Each step can carry:
//!  - `before`, `on` and `after` handlers, run in that order;
//!  - a skip condition evaluated against the context;
//!  - an `optional` flag, so a step with no handlers is not a setup error;
//!  - rollback handlers, run in reverse step order for every step that
//!    completed when a later step fails.
//!
//! Handlers return [`PipelineControl::Continue`] or [`PipelineControl::Stop`].
//! A [`Stepflow`] registry keys pipelines by their context type so callers can
//! dispatch with nothing but a context value.

pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use crate::core::context_data::ContextData;
pub use crate::core::control::{PipelineControl, PipelineResult};
pub use crate::core::handler::{BoxFuture, Handler, RollbackHandler};
pub use crate::core::step::{SkipCondition, StepDef};

pub use crate::error::{FlowError, FlowResult};
pub use crate::pipeline::Pipeline;
pub use crate::registry::Stepflow;
