// jokko-server/src/db/mod.rs

//! Postgres adapter for the referral store.

mod pg_store;

pub use pg_store::PgStore;

use jokko::StoreError;

/// SQLSTATE `undefined_column`.
const UNDEFINED_COLUMN: &str = "42703";

/// Maps a driver error onto the store's error kinds. A missing column is
/// reported separately so the connection resolver can fall back to the legacy
/// table shape.
pub fn store_error(err: sqlx::Error) -> StoreError {
  match &err {
    sqlx::Error::Database(db) if db.code().as_deref() == Some(UNDEFINED_COLUMN) => {
      StoreError::UndefinedColumn(db.message().to_string())
    }
    sqlx::Error::RowNotFound => StoreError::NotFound("row".to_string()),
    _ => StoreError::backend(err),
  }
}
