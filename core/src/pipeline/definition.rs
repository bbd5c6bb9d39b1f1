// jokko/src/pipeline/definition.rs

//! The `Pipeline<TData, Err>` struct and its structural operations.

use super::{ContextData, PipelineControl, SkipCondition, StepDef, StepPolicy};
use crate::error::PipelineError;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed async step handler.
pub type Handler<TData, Err> = Box<
  dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<PipelineControl, Err>> + Send>> + Send + Sync,
>;

/// Called with the step name and the absorbed error whenever a degradable step fails.
pub type DegradedHook<TData, Err> = Arc<dyn Fn(&ContextData<TData>, &str, &Err) + Send + Sync>;

/// Ordered steps plus the handlers attached to them.
///
/// `Err` is the error type handlers return; framework failures such as a
/// required step with no handler are converted into it via `From<PipelineError>`.
pub struct Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<PipelineError> + Send + Sync + 'static,
{
  pub(crate) steps: Vec<StepDef<TData>>,
  pub(crate) on: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) after: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) degraded_hooks: Vec<DegradedHook<TData, Err>>,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<PipelineError> + Send + Sync + 'static,
{
  pub fn new(step_defs: &[(&str, StepPolicy, Option<SkipCondition<TData>>)]) -> Self {
    let steps = step_defs
      .iter()
      .map(|(name, policy, skip_if)| StepDef {
        name: (*name).to_string(),
        policy: *policy,
        skip_if: skip_if.clone(),
      })
      .collect();

    Self {
      steps,
      on: HashMap::new(),
      after: HashMap::new(),
      degraded_hooks: Vec::new(),
    }
  }

  /// Panics on an unknown step name; a typo here is a wiring bug, not a runtime condition.
  pub(crate) fn ensure_step_exists(&self, step_name: &str) {
    if !self.steps.iter().any(|s| s.name == step_name) {
      panic!("Pipeline setup error: step '{}' not found in pipeline definition.", step_name);
    }
  }

  fn ensure_step_not_exists(&self, step_name: &str) {
    if self.steps.iter().any(|s| s.name == step_name) {
      panic!("Pipeline setup error: step '{}' already exists in pipeline definition.", step_name);
    }
  }

  fn position_of(&self, step_name: &str) -> Result<usize, PipelineError> {
    self
      .steps
      .iter()
      .position(|s| s.name == step_name)
      .ok_or_else(|| PipelineError::StepNotFound {
        step_name: step_name.to_string(),
      })
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  pub fn insert_after_step<S: Into<String>>(
    &mut self,
    existing_step_name: &str,
    new_step_name: S,
    policy: StepPolicy,
    skip_if: Option<SkipCondition<TData>>,
  ) -> Result<(), PipelineError> {
    let idx = self.position_of(existing_step_name)?;
    let name: String = new_step_name.into();
    self.ensure_step_not_exists(&name);
    self.steps.insert(idx + 1, StepDef { name, policy, skip_if });
    Ok(())
  }

  pub fn remove_step(&mut self, step_name: &str) {
    if let Ok(idx) = self.position_of(step_name) {
      self.steps.remove(idx);
      self.on.remove(step_name);
      self.after.remove(step_name);
    }
  }

  pub fn set_policy(&mut self, step_name: &str, policy: StepPolicy) -> Result<(), PipelineError> {
    let idx = self.position_of(step_name)?;
    self.steps[idx].policy = policy;
    Ok(())
  }

  pub fn set_skip_condition(
    &mut self,
    step_name: &str,
    skip_if: Option<SkipCondition<TData>>,
  ) -> Result<(), PipelineError> {
    let idx = self.position_of(step_name)?;
    self.steps[idx].skip_if = skip_if;
    Ok(())
  }
}
