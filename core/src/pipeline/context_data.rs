// jokko/src/pipeline/context_data.rs

//! Shared, lockable state threaded through every step of a pipeline run.

use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

/// Request-scoped state shared by all handlers of one pipeline run.
///
/// Cloning is cheap and every clone points at the same data. Guards are
/// blocking and MUST be dropped before any `.await` inside a handler:
/// copy what you need out of a read guard, await, then take a write guard
/// to store the result.
#[derive(Debug)]
pub struct ContextData<T: Send + Sync + 'static>(Arc<RwLock<T>>);

impl<T: Send + Sync + 'static> ContextData<T> {
  pub fn new(data: T) -> Self {
    ContextData(Arc::new(RwLock::new(data)))
  }

  pub fn read(&self) -> RwLockReadGuard<'_, T> {
    self.0.read()
  }

  pub fn write(&self) -> RwLockWriteGuard<'_, T> {
    self.0.write()
  }

  /// Read guard narrowed to one part of the state, e.g. `ctx.map_read(|d| &d.items)`.
  pub fn map_read<F, U: ?Sized>(&self, f: F) -> MappedRwLockReadGuard<'_, U>
  where
    F: FnOnce(&T) -> &U,
  {
    RwLockReadGuard::map(self.read(), f)
  }

  /// Consumes the handle and returns the data if this is the last reference,
  /// otherwise hands the handle back.
  pub fn try_unwrap(self) -> Result<T, Self> {
    Arc::try_unwrap(self.0).map(RwLock::into_inner).map_err(ContextData)
  }
}

impl<T: Send + Sync + 'static> Clone for ContextData<T> {
  fn clone(&self) -> Self {
    ContextData(Arc::clone(&self.0))
  }
}

impl<T: Send + Sync + 'static + Default> Default for ContextData<T> {
  fn default() -> Self {
    Self::new(Default::default())
  }
}
