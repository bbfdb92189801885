// tests/registry_tests.rs
mod common;

use common::*;
use stepflow::{ContextData, FlowError, Pipeline, PipelineControl, PipelineResult, Stepflow};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct AlphaContext {
  val: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct BetaContext {
  num: i32,
}

#[tokio::test]
async fn test_registry_dispatches_on_context_type() {
  setup_tracing();
  let registry = Stepflow::<TestError>::new();

  let mut alpha = Pipeline::<AlphaContext, TestError>::new("alpha", &[("alpha_task", false, None)]);
  alpha.on("alpha_task", |ctx: ContextData<AlphaContext>| async move {
    ctx.write().val = "alpha_processed".to_string();
    Ok::<_, FlowError>(PipelineControl::Continue)
  });
  registry.register_pipeline(alpha);

  let mut beta = Pipeline::<BetaContext, TestError>::new("beta", &[("beta_task", false, None)]);
  beta.on("beta_task", |ctx: ContextData<BetaContext>| async move {
    ctx.write().num = 100;
    Ok::<_, FlowError>(PipelineControl::Continue)
  });
  registry.register_pipeline(beta);

  assert!(registry.is_registered::<AlphaContext>());
  assert!(registry.is_registered::<BetaContext>());

  let ctx_alpha = ContextData::new(AlphaContext::default());
  assert_eq!(registry.run(ctx_alpha.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(ctx_alpha.read().val, "alpha_processed");

  let ctx_beta = ContextData::new(BetaContext::default());
  assert_eq!(registry.run(ctx_beta.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(ctx_beta.read().num, 100);
}

#[tokio::test]
async fn test_registry_reports_unregistered_context() {
  setup_tracing();
  let registry = Stepflow::<TestError>::new();

  let err = registry.run(ContextData::new(AlphaContext::default())).await.unwrap_err();
  match err {
    TestError::Flow(msg) => assert!(msg.contains("AlphaContext"), "unexpected message: {msg}"),
    other => panic!("expected a flow error, got {other:?}"),
  }
}

#[tokio::test]
async fn test_registering_twice_replaces_pipeline() {
  setup_tracing();
  let registry = Stepflow::<TestError>::new();

  let mut first = Pipeline::<BetaContext, TestError>::new("first", &[("task", false, None)]);
  first.on("task", |ctx: ContextData<BetaContext>| async move {
    ctx.write().num = 1;
    Ok::<_, TestError>(PipelineControl::Continue)
  });
  registry.register_pipeline(first);

  let mut second = Pipeline::<BetaContext, TestError>::new("second", &[("task", false, None)]);
  second.on("task", |ctx: ContextData<BetaContext>| async move {
    ctx.write().num = 2;
    Ok::<_, TestError>(PipelineControl::Continue)
  });
  registry.register_pipeline(second);

  let ctx = ContextData::new(BetaContext::default());
  registry.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().num, 2);
}

#[tokio::test]
async fn test_registry_propagates_handler_errors() {
  setup_tracing();
  let registry = Stepflow::<TestError>::new();

  let mut pipeline = Pipeline::<TestContext, TestError>::new("errs", &[("bad", false, None)]);
  pipeline.on("bad", failing_handler("bad", "nope"));
  registry.register_pipeline(pipeline);

  let err = registry.run(ContextData::new(TestContext::default())).await.unwrap_err();
  assert_eq!(err, TestError::Handler("nope".to_string()));
}
