// jokko/src/models/recommendation.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A recommendation joined with its recommender's display name.
/// `recommender_name` is `None` when the recommending user no longer resolves.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct RecommendationRecord {
  pub provider_id: Uuid,
  pub recommender_user_id: Option<Uuid>,
  pub recommender_name: Option<String>,
  pub note: Option<String>,
  pub created_at: DateTime<Utc>,
}

impl RecommendationRecord {
  pub fn display_name(&self) -> &str {
    self.recommender_name.as_deref().filter(|n| !n.is_empty()).unwrap_or("Unknown")
  }
}

/// Minimal recommendation row for activity metrics.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct RecommendationActivity {
  pub provider_id: Uuid,
  pub recommender_user_id: Option<Uuid>,
  pub created_at: DateTime<Utc>,
}
