// jokko/src/pipeline/mod.rs

//! A small named-step async pipeline.
//!
//! Request flows (provider listing, provider creation) are declared as an
//! ordered list of steps. Handlers are attached per step, share a
//! [`ContextData`] and may stop the run early. Steps marked
//! [`StepPolicy::Degradable`] may fail without failing the request.

pub mod context_data;
pub mod control;
pub mod definition;
pub mod execution;
pub mod hooks;
pub mod step;

pub use context_data::ContextData;
pub use control::{PipelineControl, PipelineResult};
pub use definition::{DegradedHook, Handler, Pipeline};
pub use step::{SkipCondition, StepDef, StepPolicy};
