// jokko/src/models/connection.rs

use serde::Serialize;
use uuid::Uuid;

/// Which of the two historical connection table shapes the store carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionSchema {
  /// `user_a_id` / `user_b_id`, always accepted.
  Symmetric,
  /// `user_id` -> `connected_user_id` with `status = 'accepted'`.
  Legacy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct SymmetricConnection {
  pub user_a_id: Option<Uuid>,
  pub user_b_id: Option<Uuid>,
}

impl SymmetricConnection {
  /// The side of the edge that is not `user`.
  pub fn other_side(&self, user: Uuid) -> Option<Uuid> {
    if self.user_a_id == Some(user) {
      self.user_b_id
    } else {
      self.user_a_id
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct LegacyConnection {
  pub connected_user_id: Option<Uuid>,
}
