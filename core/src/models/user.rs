// jokko/src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct User {
  pub id: Uuid,
  pub name: Option<String>,
  pub phone_e164: Option<String>,
  pub email: Option<String>,
  pub language: Option<String>,
  pub user_type: Option<String>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
  Seeker,
  Provider,
  Unknown,
}

impl UserType {
  pub fn parse(raw: Option<&str>) -> Self {
    match raw {
      Some("seeker") => UserType::Seeker,
      Some("provider") => UserType::Provider,
      _ => UserType::Unknown,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      UserType::Seeker => "seeker",
      UserType::Provider => "provider",
      UserType::Unknown => "unknown",
    }
  }
}

impl User {
  pub fn declared_type(&self) -> UserType {
    UserType::parse(self.user_type.as_deref())
  }

  /// The phone number, if present and non-empty.
  pub fn phone(&self) -> Option<&str> {
    self.phone_e164.as_deref().filter(|p| !p.is_empty())
  }
}
