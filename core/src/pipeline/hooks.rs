// jokko/src/pipeline/hooks.rs

//! Registration of step handlers and the degraded-step hook.

use super::definition::{Handler, Pipeline};
use super::{ContextData, PipelineControl};
use crate::error::PipelineError;
use std::future::Future;
use std::sync::Arc;

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<PipelineError> + Send + Sync + 'static,
{
  /// Registers the main handler(s) of a step. Several handlers on one step run
  /// in registration order.
  ///
  /// The handler may return any error convertible into the pipeline's `Err`.
  pub fn on<F, UserErr>(&mut self, step_name: &str, handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<PipelineControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    self.on.entry(step_name.to_string()).or_default().push(wrap(handler_fn));
  }

  /// Registers a handler that runs after all `on` handlers of the step succeeded.
  pub fn after<F, UserErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    self.after.entry(step_name.to_string()).or_default().push(wrap(handler_fn));
  }

  /// Observes failures absorbed by degradable steps.
  pub fn on_degraded(&mut self, hook: impl Fn(&ContextData<TData>, &str, &Err) + Send + Sync + 'static) {
    self.degraded_hooks.push(Arc::new(hook));
  }
}

fn wrap<TData, Err, F, UserErr>(handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static) -> Handler<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: 'static,
  F: Future<Output = Result<PipelineControl, UserErr>> + Send + 'static,
  UserErr: Into<Err> + Send + Sync + 'static,
{
  Box::new(move |ctx_data| {
    let user_fut = handler_fn(ctx_data);
    Box::pin(async move { user_fut.await.map_err(Into::into) })
  })
}
