// jokko/src/store/mod.rs

//! The storage seam. The core only talks to a [`ReferralStore`]; the server
//! provides a Postgres implementation and [`MemoryStore`] backs tests and
//! benchmarks.

pub mod memory;

pub use memory::{MemoryStore, StoreOp};

use crate::error::StoreResult;
use crate::models::{
  LegacyConnection, NewProvider, NewTrackedEvent, Provider, ProviderChanges, RecommendationActivity,
  RecommendationRecord, SymmetricConnection, TrackedEvent, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Row offset of a 1-based `page` of `page_size` rows, saturating at `i64::MAX`.
pub fn page_offset(page: usize, page_size: usize) -> i64 {
  let rows = page.max(1).saturating_sub(1).saturating_mul(page_size);
  i64::try_from(rows).unwrap_or(i64::MAX)
}

/// Number of pages needed for `total` rows, never overflowing for huge page sizes.
pub fn page_count(total: i64, page_size: usize) -> i64 {
  let size = i64::try_from(page_size.max(1)).unwrap_or(i64::MAX);
  if total <= 0 {
    0
  } else {
    (total - 1) / size + 1
  }
}

/// Provider search criteria. Every present field narrows the result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderFilter {
  /// Case-insensitive substring of the name.
  pub name_contains: Option<String>,
  /// Exact service type (a category slug).
  pub service_type: Option<String>,
  /// Exact city.
  pub city: Option<String>,
  /// Case-insensitive substring of name, service type or city.
  pub text: Option<String>,
  pub created_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserFilter {
  /// Case-insensitive substring of name, email or phone.
  pub search: Option<String>,
  pub created_until: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait ReferralStore: Send + Sync {
  /// Providers matching `filter`, newest first.
  async fn list_providers(&self, filter: &ProviderFilter, offset: i64, limit: i64) -> StoreResult<Vec<Provider>>;

  async fn count_providers(&self, filter: &ProviderFilter) -> StoreResult<i64>;

  async fn provider_by_id(&self, id: Uuid) -> StoreResult<Option<Provider>>;

  /// Id of a provider owned by `owner` with `service_type`, ignoring `excluding`.
  async fn find_owned_provider(
    &self,
    owner: Uuid,
    service_type: &str,
    excluding: Option<Uuid>,
  ) -> StoreResult<Option<Uuid>>;

  async fn service_category_exists(&self, slug: &str) -> StoreResult<bool>;

  /// Inserts the provider and its neighborhood/specialty rows.
  async fn insert_provider(&self, provider: NewProvider) -> StoreResult<Provider>;

  async fn update_provider(&self, id: Uuid, changes: ProviderChanges) -> StoreResult<Provider>;

  async fn providers_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Provider>>;

  async fn user_names(&self, ids: &[Uuid]) -> StoreResult<HashMap<Uuid, String>>;

  async fn recommendation_counts(&self, provider_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, i64>>;

  /// Symmetric-shape edges touching `user` on either side. Fails with
  /// `StoreError::UndefinedColumn` when the store carries the legacy shape.
  async fn symmetric_connections(&self, user: Uuid) -> StoreResult<Vec<SymmetricConnection>>;

  /// Accepted legacy-shape edges starting at `user`.
  async fn legacy_connections(&self, user: Uuid) -> StoreResult<Vec<LegacyConnection>>;

  /// All recommendations of the given providers joined with recommender names.
  async fn recommendations_for(&self, provider_ids: &[Uuid]) -> StoreResult<Vec<RecommendationRecord>>;

  /// Distinct ids of users who made at least one recommendation.
  async fn recommender_ids(&self) -> StoreResult<HashSet<Uuid>>;

  async fn recommendation_activity(&self, since: Option<DateTime<Utc>>) -> StoreResult<Vec<RecommendationActivity>>;

  /// Users matching `filter`, newest first.
  async fn list_users(&self, filter: &UserFilter) -> StoreResult<Vec<User>>;

  async fn insert_event(&self, event: NewTrackedEvent) -> StoreResult<TrackedEvent>;

  /// Events of one type, newest first.
  async fn events_of_type(&self, event_type: &str, since: Option<DateTime<Utc>>) -> StoreResult<Vec<TrackedEvent>>;
}
