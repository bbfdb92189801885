// tests/pipeline_execution_tests.rs
mod common;

use common::*;
use serial_test::serial;
use std::sync::Arc;
use stepflow::{ContextData, Pipeline, PipelineControl, PipelineResult};

#[tokio::test]
#[serial]
async fn test_pipeline_runs_steps_in_order() {
  setup_tracing();
  let mut pipeline =
    Pipeline::<TestContext, TestError>::new("ordered", &[("s1", false, None), ("s2", false, None), ("s3", false, None)]);
  pipeline.on("s1", recording_handler("s1"));
  pipeline.on("s2", recording_handler("s2"));
  pipeline.on("s3", recording_handler("s3"));

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result.unwrap(), PipelineResult::Completed);
  let guard = ctx.read();
  assert_eq!(guard.counter, 3);
  assert_eq!(guard.trail, vec!["s1", "s2", "s3"]);
}

#[tokio::test]
#[serial]
async fn test_phases_run_before_on_after() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new("phases", &[("only", false, None)]);
  pipeline.after("only", recording_handler("after"));
  pipeline.on("only", recording_handler("on"));
  pipeline.before("only", recording_handler("before"));

  let ctx = ContextData::new(TestContext::default());
  pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(ctx.read().trail, vec!["before", "on", "after"]);
}

#[tokio::test]
#[serial]
async fn test_stop_ends_run_without_error() {
  setup_tracing();
  let mut pipeline =
    Pipeline::<TestContext, TestError>::new("stopping", &[("a", false, None), ("b", false, None), ("c", false, None)]);
  pipeline.on("a", recording_handler("a"));
  pipeline.on("b", recording_handler("b"));
  pipeline.on("c", recording_handler("c"));

  let ctx = ContextData::new(TestContext {
    stop_at: Some("b".to_string()),
    ..Default::default()
  });
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result.unwrap(), PipelineResult::Stopped);
  assert_eq!(ctx.read().trail, vec!["a", "b"]);
}

#[tokio::test]
#[serial]
async fn test_handler_error_is_propagated_and_later_steps_do_not_run() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(
    "failing",
    &[("good", false, None), ("bad", false, None), ("never", false, None)],
  );
  pipeline.on("good", recording_handler("good"));
  pipeline.on("bad", failing_handler("bad", "boom"));
  pipeline.on("never", recording_handler("never"));

  let ctx = ContextData::new(TestContext::default());
  let err = pipeline.run(ctx.clone()).await.unwrap_err();

  assert_eq!(err, TestError::Handler("boom".to_string()));
  assert_eq!(ctx.read().trail, vec!["good", "bad"]);
}

#[tokio::test]
#[serial]
async fn test_skip_condition_reads_context() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(
    "skipping",
    &[
      ("load", false, None),
      ("charge", false, Some(Arc::new(|c: &TestContext| c.skip_payment))),
      ("persist", false, None),
    ],
  );
  pipeline.on("load", |ctx: ContextData<TestContext>| async move {
    ctx.update(|c| {
      c.trail.push("load".to_string());
      c.skip_payment = true;
    });
    Ok::<_, TestError>(PipelineControl::Continue)
  });
  pipeline.on("charge", recording_handler("charge"));
  pipeline.on("persist", recording_handler("persist"));

  let ctx = ContextData::new(TestContext::default());
  pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(ctx.read().trail, vec!["load", "persist"]);
}

#[tokio::test]
#[serial]
async fn test_optional_step_without_handlers_is_passed_over() {
  setup_tracing();
  let mut pipeline =
    Pipeline::<TestContext, TestError>::new("optional", &[("a", false, None), ("notify", true, None), ("b", false, None)]);
  pipeline.on("a", recording_handler("a"));
  pipeline.on("b", recording_handler("b"));

  let ctx = ContextData::new(TestContext::default());
  assert_eq!(pipeline.run(ctx.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(ctx.read().trail, vec!["a", "b"]);
}

#[tokio::test]
#[serial]
async fn test_required_step_without_handlers_fails() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new("missing", &[("a", false, None), ("b", false, None)]);
  pipeline.on("a", recording_handler("a"));

  let err = pipeline.run(ContextData::new(TestContext::default())).await.unwrap_err();
  match err {
    TestError::Flow(msg) => assert!(msg.contains("b"), "unexpected message: {msg}"),
    other => panic!("expected a flow error, got {other:?}"),
  }
}

#[test]
#[should_panic(expected = "not found")]
fn test_registering_on_unknown_step_panics() {
  let mut pipeline = Pipeline::<TestContext, TestError>::new("typo", &[("a", false, None)]);
  pipeline.on("b", recording_handler("b"));
}

#[test]
#[should_panic(expected = "declared twice")]
fn test_duplicate_step_names_panic() {
  let _ = Pipeline::<TestContext, TestError>::new("dupes", &[("a", false, None), ("a", true, None)]);
}

#[test]
fn test_step_names_preserve_declaration_order() {
  let pipeline = Pipeline::<TestContext, TestError>::new("names", &[("x", false, None), ("y", true, None)]);
  assert_eq!(pipeline.step_names(), vec!["x", "y"]);
  assert_eq!(pipeline.name(), "names");
}
