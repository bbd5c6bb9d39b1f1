// jokko/src/pipeline/control.rs

//! Signals for controlling pipeline flow and the outcome of a pipeline run.

/// Returned by a handler to let the run go on or end it early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineControl {
  Continue,
  /// Halt the run. No further handlers or steps execute.
  Stop,
}

/// Outcome of a full pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineResult {
  /// Every step ran, or was skipped, or degraded.
  Completed {
    /// Degradable steps whose failure was absorbed, in execution order.
    degraded: Vec<String>,
  },
  /// A handler returned `PipelineControl::Stop`.
  Stopped,
}

impl PipelineResult {
  pub fn is_completed(&self) -> bool {
    matches!(self, PipelineResult::Completed { .. })
  }

  pub fn degraded_steps(&self) -> &[String] {
    match self {
      PipelineResult::Completed { degraded } => degraded,
      PipelineResult::Stopped => &[],
    }
  }
}
