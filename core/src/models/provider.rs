// jokko/src/models/provider.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A service listing. `phone_enc` holds the envelope text (`\x` + hex).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Provider {
  pub id: Uuid,
  pub name: String,
  pub service_type: String,
  pub city: Option<String>,
  pub photo_url: Option<String>,
  #[serde(skip_serializing)]
  pub phone_enc: Option<String>,
  #[serde(skip_serializing)]
  pub phone_hash: Option<String>,
  pub owner_user_id: Option<Uuid>,
  pub created_at: DateTime<Utc>,
  pub neighborhoods: Vec<String>,
  pub specialties: Vec<String>,
}

/// Insert payload produced by the provider creation pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProvider {
  pub name: String,
  pub service_type: String,
  pub city: String,
  pub phone_hash: String,
  pub phone_enc: Option<String>,
  pub owner_user_id: Option<Uuid>,
  pub neighborhoods: Vec<String>,
  pub specialties: Vec<String>,
}

/// Columns rewritten by a provider update. Phone columns change only when a
/// new phone number was submitted.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderChanges {
  pub name: String,
  pub service_type: String,
  pub city: String,
  pub phone: Option<PhoneColumns>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhoneColumns {
  pub phone_hash: String,
  pub phone_enc: Option<String>,
}
