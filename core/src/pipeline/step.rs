// jokko/src/pipeline/step.rs

//! Defines the structure for a single step within a pipeline.

use super::ContextData;

/// Evaluated before a step runs; `true` skips the step.
pub type SkipCondition<TData> = std::sync::Arc<dyn Fn(ContextData<TData>) -> bool + Send + Sync + 'static>;

/// How a step's failure affects the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPolicy {
  /// A missing handler or a handler error fails the whole run.
  Required,
  /// Handler errors are logged, reported to the degraded hook and absorbed;
  /// the run continues with whatever the context held before the step.
  Degradable,
}

#[derive(Clone)]
pub struct StepDef<T: 'static + Send + Sync> {
  pub name: String,
  pub policy: StepPolicy,
  pub skip_if: Option<SkipCondition<T>>,
}

impl<T: 'static + Send + Sync> std::fmt::Debug for StepDef<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StepDef")
      .field("name", &self.name)
      .field("policy", &self.policy)
      .field("skip_if_present", &self.skip_if.is_some())
      .finish()
  }
}
