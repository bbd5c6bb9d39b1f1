// tests/pipeline_execution_tests.rs
mod common;

use common::*;
use jokko::pipeline::SkipCondition;
use jokko::{ContextData, PipelineControl, PipelineError, PipelineResult, StepPolicy};
use jokko::Pipeline;
use parking_lot::Mutex;
use serial_test::serial;
use std::sync::Arc;

use StepPolicy::{Degradable, Required};

fn completed() -> PipelineResult {
  PipelineResult::Completed { degraded: Vec::new() }
}

#[tokio::test]
#[serial]
async fn test_pipeline_runs_steps_in_order() {
  setup_tracing();
  let mut pipeline =
    Pipeline::<TestContext, TestError>::new(&[("step1", Required, None), ("step2", Required, None), ("step3", Required, None)]);

  pipeline.on("step1", create_simple_handler("step1", " S1"));
  pipeline.on("step2", create_simple_handler("step2", " S2"));
  pipeline.on("step3", create_simple_handler("step3", " S3"));

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result.unwrap(), completed());

  let guard = ctx.read();
  assert_eq!(guard.counter, 3);
  assert_eq!(guard.message, " S1 S2 S3");
  assert_eq!(guard.steps_executed, vec!["step1", "step2", "step3"]);
}

#[tokio::test]
#[serial]
async fn test_pipeline_stops_on_pipeline_control_stop() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[
    ("stepA", Required, None),
    ("stopStep", Required, None),
    ("stepC", Required, None),
  ]);

  pipeline.on("stepA", create_simple_handler("stepA", "A"));
  pipeline.on("stopStep", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().steps_executed.push("stopStep".to_string());
      Ok::<PipelineControl, TestError>(PipelineControl::Stop)
    })
  });
  pipeline.on("stepC", create_simple_handler("stepC", "C"));

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result.unwrap(), PipelineResult::Stopped);

  let guard = ctx.read();
  assert_eq!(guard.counter, 1);
  assert_eq!(guard.message, "A");
  assert_eq!(guard.steps_executed, vec!["stepA", "stopStep"]);
}

#[tokio::test]
#[serial]
async fn test_stop_requested_through_context() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("first", Required, None), ("second", Required, None)]);
  pipeline.on("first", create_simple_handler("first", "1"));
  pipeline.on("second", create_simple_handler("second", "2"));

  let ctx = ContextData::new(TestContext {
    should_stop_at: Some("first".to_string()),
    ..Default::default()
  });
  let result = pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(result, PipelineResult::Stopped);
  assert_eq!(ctx.read().steps_executed, vec!["first"]);
}

#[tokio::test]
#[serial]
async fn test_pipeline_propagates_required_step_error() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[
    ("good_step", Required, None),
    ("bad_step", Required, None),
    ("another_step", Required, None),
  ]);

  pipeline.on("good_step", create_simple_handler("good_step", "Good"));
  pipeline.on("bad_step", create_failing_handler("bad_step", "I am a bad step!"));
  pipeline.on("another_step", create_simple_handler("another_step", "NeverRun"));

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await;

  match result {
    Err(TestError::Handler(msg)) => assert_eq!(msg, "I am a bad step!"),
    other => panic!("Expected TestError::Handler, got {:?}", other),
  }

  let guard = ctx.read();
  assert_eq!(guard.counter, 1);
  assert_eq!(guard.message, "Good");
  assert_eq!(guard.steps_executed, vec!["good_step", "bad_step"]);
}

#[tokio::test]
#[serial]
async fn test_degradable_step_error_is_absorbed() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[
    ("good_step", Required, None),
    ("flaky_step", Degradable, None),
    ("last_step", Required, None),
  ]);

  pipeline.on("good_step", create_simple_handler("good_step", "Good;"));
  pipeline.on("flaky_step", create_failing_handler("flaky_step", "backend down"));
  pipeline.on("last_step", create_simple_handler("last_step", "Last;"));

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await.unwrap();

  assert!(result.is_completed());
  assert_eq!(result.degraded_steps(), ["flaky_step".to_string()]);

  let guard = ctx.read();
  assert_eq!(guard.counter, 2);
  assert_eq!(guard.message, "Good;Last;");
  assert_eq!(guard.steps_executed, vec!["good_step", "flaky_step", "last_step"]);
}

#[tokio::test]
#[serial]
async fn test_degraded_hook_sees_step_and_error() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("flaky", Degradable, None), ("fine", Degradable, None)]);
  pipeline.on("flaky", create_failing_handler("flaky", "timeout"));
  pipeline.on("fine", create_simple_handler("fine", "ok"));

  let seen: Arc<Mutex<Vec<(String, TestError)>>> = Arc::new(Mutex::new(Vec::new()));
  let sink = seen.clone();
  pipeline.on_degraded(move |ctx: &ContextData<TestContext>, step: &str, err: &TestError| {
    ctx.write().message.push_str("[degraded]");
    sink.lock().push((step.to_string(), err.clone()));
  });

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(result.degraded_steps(), ["flaky".to_string()]);
  assert_eq!(
    *seen.lock(),
    vec![("flaky".to_string(), TestError::Handler("timeout".to_string()))]
  );
  assert_eq!(ctx.read().message, "[degraded]ok");
}

#[tokio::test]
#[serial]
async fn test_pipeline_skips_step_if_condition_met() {
  setup_tracing();
  let skip_after_first: SkipCondition<TestContext> = Arc::new(|ctx: ContextData<TestContext>| ctx.read().counter > 0);
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[
    ("step1", Required, None),
    ("step_to_skip", Required, Some(skip_after_first)),
    ("step3", Required, None),
  ]);

  pipeline.on("step1", create_simple_handler("step1", " S1"));
  pipeline.on("step_to_skip", create_simple_handler("step_to_skip", " SKIPPED_THIS"));
  pipeline.on("step3", create_simple_handler("step3", " S3"));

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result.unwrap(), completed());
  let guard = ctx.read();
  assert_eq!(guard.counter, 2);
  assert_eq!(guard.message, " S1 S3");
  assert_eq!(guard.steps_executed, vec!["step1", "step3"]);
}

#[tokio::test]
#[serial]
async fn test_skipped_required_step_without_handler_is_fine() {
  setup_tracing();
  let always: SkipCondition<TestContext> = Arc::new(|_| true);
  let pipeline = Pipeline::<TestContext, TestError>::new(&[("never", Required, Some(always))]);

  let result = pipeline.run(ContextData::new(TestContext::default())).await;
  assert_eq!(result.unwrap(), completed());
}

#[tokio::test]
#[serial]
async fn test_required_step_missing_handler_fails() {
  setup_tracing();
  let pipeline = Pipeline::<TestContext, TestError>::new(&[("step_with_no_handler", Required, None)]);

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await;

  if let Err(TestError::Framework(s)) = result {
    assert!(s.contains("HandlerMissing"));
    assert!(s.contains("step_with_no_handler"));
  } else {
    panic!("Expected PipelineError::HandlerMissing, got {:?}", result);
  }
}

#[tokio::test]
#[serial]
async fn test_degradable_step_missing_handler_succeeds() {
  setup_tracing();
  let pipeline = Pipeline::<TestContext, TestError>::new(&[("optional_step_no_handler", Degradable, None)]);

  let result = pipeline.run(ContextData::new(TestContext::default())).await;
  assert_eq!(result.unwrap(), completed());
}

#[tokio::test]
#[serial]
async fn test_on_then_after_execution_order() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("main_step", Required, None)]);

  pipeline.after("main_step", create_simple_handler("after_main", "After;"));
  pipeline.on("main_step", create_simple_handler("on_main", "On;"));
  pipeline.on("main_step", create_simple_handler("on_main_2", "On2;"));

  let ctx = ContextData::new(TestContext::default());
  pipeline.run(ctx.clone()).await.unwrap();

  let guard = ctx.read();
  assert_eq!(guard.counter, 3);
  assert_eq!(guard.message, "On;On2;After;");
  assert_eq!(guard.steps_executed, vec!["on_main", "on_main_2", "after_main"]);
}

#[tokio::test]
#[serial]
async fn test_after_handler_not_run_when_on_fails() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("step", Degradable, None), ("next", Required, None)]);
  pipeline.on("step", create_failing_handler("step", "nope"));
  pipeline.after("step", create_simple_handler("after_step", "ShouldNotRun"));
  pipeline.on("next", create_simple_handler("next", "Next"));

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(result.degraded_steps(), ["step".to_string()]);
  assert_eq!(ctx.read().steps_executed, vec!["step", "next"]);
}

#[tokio::test]
#[serial]
async fn test_structural_edits() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("a", Required, None), ("c", Required, None)]);
  pipeline.insert_after_step("a", "b", Degradable, None).unwrap();
  assert_eq!(pipeline.step_names(), vec!["a", "b", "c"]);

  pipeline.on("a", create_simple_handler("a", "a"));
  pipeline.on("b", create_failing_handler("b", "b failed"));
  pipeline.on("c", create_simple_handler("c", "c"));

  pipeline.set_policy("b", Required).unwrap();
  let ctx = ContextData::new(TestContext::default());
  assert!(pipeline.run(ctx).await.is_err());

  pipeline.remove_step("b");
  assert_eq!(pipeline.step_names(), vec!["a", "c"]);
  let ctx = ContextData::new(TestContext::default());
  assert_eq!(pipeline.run(ctx.clone()).await.unwrap(), completed());
  assert_eq!(ctx.read().message, "ac");

  match pipeline.set_policy("missing", Degradable) {
    Err(PipelineError::StepNotFound { step_name }) => assert_eq!(step_name, "missing"),
    other => panic!("Expected StepNotFound, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn test_skip_condition_can_be_attached_later() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("a", Required, None), ("b", Required, None)]);
  pipeline.on("a", create_simple_handler("a", "a"));
  pipeline.on("b", create_simple_handler("b", "b"));

  let counter_positive: SkipCondition<TestContext> = Arc::new(|ctx: ContextData<TestContext>| ctx.read().counter > 0);
  pipeline.set_skip_condition("b", Some(counter_positive)).unwrap();

  let ctx = ContextData::new(TestContext::default());
  pipeline.run(ctx.clone()).await.unwrap();
  assert_eq!(*ctx.map_read(|d| &d.message), "a");

  let data = ctx.try_unwrap().expect("last handle");
  assert_eq!(data.steps_executed, vec!["a"]);

  assert!(pipeline.set_skip_condition("missing", None).is_err());
}

#[test]
#[should_panic(expected = "step 'ghost' not found")]
fn test_registering_on_unknown_step_panics() {
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("real", Required, None)]);
  pipeline.on("ghost", create_simple_handler("ghost", ""));
}
