// jokko/src/models/event.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

pub const CONTACT_CLICK: &str = "contact_click";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct TrackedEvent {
  pub id: Uuid,
  pub event_type: String,
  pub user_id: Option<Uuid>,
  pub payload: serde_json::Value,
  pub created_at: DateTime<Utc>,
}

impl TrackedEvent {
  /// `provider_id` carried in the payload, when it is a valid id.
  pub fn provider_id(&self) -> Option<Uuid> {
    self
      .payload
      .get("provider_id")
      .and_then(|v| v.as_str())
      .and_then(|s| Uuid::parse_str(s).ok())
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTrackedEvent {
  pub event_type: String,
  pub user_id: Option<Uuid>,
  pub payload: serde_json::Value,
}
