// jokko/src/users.rs

//! Admin user roster and role detection.

use crate::dedupe::dedupe_by_phone;
use crate::error::ReferralResult;
use crate::models::{User, UserType};
use crate::store::{ProviderFilter, ReferralStore, UserFilter};
use serde::Serialize;
use std::collections::HashSet;
use tracing::instrument;
use uuid::Uuid;

pub const DEFAULT_USER_ROSTER_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Seeker,
  Provider,
}

/// Declared `user_type` wins; an untyped user is a provider iff they ever recommended someone.
pub fn detect_role(user: &User, recommenders: &HashSet<Uuid>) -> Role {
  match user.declared_type() {
    UserType::Provider => Role::Provider,
    UserType::Seeker => Role::Seeker,
    UserType::Unknown if recommenders.contains(&user.id) => Role::Provider,
    UserType::Unknown => Role::Seeker,
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RoleFilter {
  #[default]
  All,
  Seeker,
  Provider,
}

impl RoleFilter {
  /// Unknown values mean no filtering.
  pub fn parse(raw: Option<&str>) -> Self {
    match raw {
      Some("seeker") => RoleFilter::Seeker,
      Some("provider") => RoleFilter::Provider,
      _ => RoleFilter::All,
    }
  }

  fn admits(&self, role: Role) -> bool {
    match self {
      RoleFilter::All => true,
      RoleFilter::Seeker => role == Role::Seeker,
      RoleFilter::Provider => role == Role::Provider,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserRosterQuery<'a> {
  pub page: usize,
  pub limit: usize,
  pub search: Option<&'a str>,
  pub role: RoleFilter,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRosterRow {
  #[serde(flatten)]
  pub user: User,
  pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRoster {
  pub users: Vec<UserRosterRow>,
  /// Users matching the role filter, across all pages.
  pub total: usize,
  pub seekers_count: usize,
  /// Rows in the provider table, not users with the provider role.
  pub providers_count: i64,
  pub page: usize,
  pub total_pages: usize,
  pub limit: usize,
}

/// Deduplicated users with detected roles, newest first.
pub async fn users_with_roles(store: &dyn ReferralStore, filter: &UserFilter) -> ReferralResult<Vec<UserRosterRow>> {
  let mut users = dedupe_by_phone(store.list_users(filter).await?);
  users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
  let recommenders = store.recommender_ids().await?;
  Ok(
    users
      .into_iter()
      .map(|user| {
        let role = detect_role(&user, &recommenders);
        UserRosterRow { user, role }
      })
      .collect(),
  )
}

#[instrument(name = "users::roster", skip(store), err(Display))]
pub async fn user_roster(store: &dyn ReferralStore, query: UserRosterQuery<'_>) -> ReferralResult<UserRoster> {
  let page = query.page.max(1);
  let limit = if query.limit == 0 { DEFAULT_USER_ROSTER_LIMIT } else { query.limit };
  let filter = UserFilter {
    search: query.search.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string),
    ..UserFilter::default()
  };

  let rows = users_with_roles(store, &filter).await?;
  let seekers_count = rows.iter().filter(|r| r.role == Role::Seeker).count();
  let providers_count = store.count_providers(&ProviderFilter::default()).await?;

  let matching: Vec<UserRosterRow> = rows.into_iter().filter(|r| query.role.admits(r.role)).collect();
  let total = matching.len();
  let users = matching.into_iter().skip(page.saturating_sub(1).saturating_mul(limit)).take(limit).collect();

  Ok(UserRoster {
    users,
    total,
    seekers_count,
    providers_count,
    page,
    total_pages: total.div_ceil(limit),
    limit,
  })
}
