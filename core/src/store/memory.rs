// jokko/src/store/memory.rs

//! In-process [`ReferralStore`] used by tests and benchmarks.
//!
//! It can impersonate either connection table shape and inject backend
//! failures per operation, so degraded paths can be exercised without a
//! database.

use super::{ProviderFilter, ReferralStore, UserFilter};
use crate::error::{StoreError, StoreResult};
use crate::models::{
  ConnectionSchema, LegacyConnection, NewProvider, NewTrackedEvent, Provider, ProviderChanges,
  RecommendationActivity, RecommendationRecord, SymmetricConnection, TrackedEvent, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Store operations that can be counted or made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
  ListProviders,
  SymmetricConnections,
  LegacyConnections,
  Recommendations,
  ListUsers,
  Events,
}

#[derive(Debug, Clone)]
struct StoredRecommendation {
  provider_id: Uuid,
  recommender_user_id: Option<Uuid>,
  note: Option<String>,
  created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct LegacyEdge {
  user_id: Uuid,
  connected_user_id: Option<Uuid>,
  status: String,
}

#[derive(Debug, Default)]
struct Tables {
  users: Vec<User>,
  providers: Vec<Provider>,
  recommendations: Vec<StoredRecommendation>,
  symmetric: Vec<SymmetricConnection>,
  legacy: Vec<LegacyEdge>,
  categories: HashSet<String>,
  events: Vec<TrackedEvent>,
}

#[derive(Debug)]
pub struct MemoryStore {
  schema: ConnectionSchema,
  tables: RwLock<Tables>,
  failing: RwLock<HashSet<StoreOp>>,
  calls: RwLock<HashMap<StoreOp, usize>>,
}

impl Default for MemoryStore {
  fn default() -> Self {
    Self::new(ConnectionSchema::Symmetric)
  }
}

impl MemoryStore {
  /// An empty store whose connection table has the given shape.
  pub fn new(schema: ConnectionSchema) -> Self {
    Self {
      schema,
      tables: RwLock::new(Tables::default()),
      failing: RwLock::new(HashSet::new()),
      calls: RwLock::new(HashMap::new()),
    }
  }

  pub fn schema(&self) -> ConnectionSchema {
    self.schema
  }

  pub fn add_user(&self, user: User) {
    self.tables.write().users.push(user);
  }

  pub fn add_provider(&self, provider: Provider) {
    self.tables.write().providers.push(provider);
  }

  pub fn add_category(&self, slug: &str) {
    self.tables.write().categories.insert(slug.to_string());
  }

  pub fn add_recommendation(&self, provider_id: Uuid, recommender: Option<Uuid>, note: Option<&str>, at: DateTime<Utc>) {
    self.tables.write().recommendations.push(StoredRecommendation {
      provider_id,
      recommender_user_id: recommender,
      note: note.map(str::to_string),
      created_at: at,
    });
  }

  /// Records an accepted mutual connection in whichever shape this store carries.
  pub fn connect(&self, a: Uuid, b: Uuid) {
    let mut tables = self.tables.write();
    match self.schema {
      ConnectionSchema::Symmetric => tables.symmetric.push(SymmetricConnection {
        user_a_id: Some(a),
        user_b_id: Some(b),
      }),
      ConnectionSchema::Legacy => {
        for (from, to) in [(a, b), (b, a)] {
          tables.legacy.push(LegacyEdge {
            user_id: from,
            connected_user_id: Some(to),
            status: "accepted".to_string(),
          });
        }
      }
    }
  }

  /// Adds one directed legacy edge with an arbitrary status.
  pub fn add_legacy_edge(&self, user_id: Uuid, connected_user_id: Option<Uuid>, status: &str) {
    self.tables.write().legacy.push(LegacyEdge {
      user_id,
      connected_user_id,
      status: status.to_string(),
    });
  }

  /// Adds a raw symmetric row, possibly with a missing side.
  pub fn add_symmetric_edge(&self, user_a_id: Option<Uuid>, user_b_id: Option<Uuid>) {
    self.tables.write().symmetric.push(SymmetricConnection { user_a_id, user_b_id });
  }

  /// Makes every later call of `op` fail with a backend error.
  pub fn fail(&self, op: StoreOp) {
    self.failing.write().insert(op);
  }

  pub fn recover(&self, op: StoreOp) {
    self.failing.write().remove(&op);
  }

  pub fn calls(&self, op: StoreOp) -> usize {
    self.calls.read().get(&op).copied().unwrap_or(0)
  }

  /// Stores an event row as-is, keeping its id and timestamp.
  pub fn add_event(&self, event: TrackedEvent) {
    self.tables.write().events.push(event);
  }

  pub fn events(&self) -> Vec<TrackedEvent> {
    self.tables.read().events.clone()
  }

  fn enter(&self, op: StoreOp) -> StoreResult<()> {
    *self.calls.write().entry(op).or_insert(0) += 1;
    if self.failing.read().contains(&op) {
      return Err(StoreError::backend(anyhow::anyhow!("injected failure for {:?}", op)));
    }
    Ok(())
  }
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
  haystack.is_some_and(|h| h.to_lowercase().contains(&needle.to_lowercase()))
}

fn provider_matches(p: &Provider, filter: &ProviderFilter) -> bool {
  if let Some(name) = &filter.name_contains {
    if !contains_ci(Some(&p.name), name) {
      return false;
    }
  }
  if let Some(service) = &filter.service_type {
    if &p.service_type != service {
      return false;
    }
  }
  if let Some(city) = &filter.city {
    if p.city.as_deref() != Some(city.as_str()) {
      return false;
    }
  }
  if let Some(text) = &filter.text {
    let hit =
      contains_ci(Some(&p.name), text) || contains_ci(Some(&p.service_type), text) || contains_ci(p.city.as_deref(), text);
    if !hit {
      return false;
    }
  }
  if let Some(until) = filter.created_until {
    if p.created_at > until {
      return false;
    }
  }
  true
}

fn newest_first<T>(rows: &mut [T], created_at: impl Fn(&T) -> DateTime<Utc>) {
  rows.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
}

#[async_trait]
impl ReferralStore for MemoryStore {
  async fn list_providers(&self, filter: &ProviderFilter, offset: i64, limit: i64) -> StoreResult<Vec<Provider>> {
    self.enter(StoreOp::ListProviders)?;
    let tables = self.tables.read();
    let mut rows: Vec<Provider> = tables.providers.iter().filter(|p| provider_matches(p, filter)).cloned().collect();
    newest_first(&mut rows, |p| p.created_at);
    Ok(
      rows
        .into_iter()
        .skip(usize::try_from(offset.max(0)).unwrap_or(usize::MAX))
        .take(usize::try_from(limit.max(0)).unwrap_or(usize::MAX))
        .collect(),
    )
  }

  async fn count_providers(&self, filter: &ProviderFilter) -> StoreResult<i64> {
    let tables = self.tables.read();
    Ok(tables.providers.iter().filter(|p| provider_matches(p, filter)).count() as i64)
  }

  async fn provider_by_id(&self, id: Uuid) -> StoreResult<Option<Provider>> {
    Ok(self.tables.read().providers.iter().find(|p| p.id == id).cloned())
  }

  async fn find_owned_provider(
    &self,
    owner: Uuid,
    service_type: &str,
    excluding: Option<Uuid>,
  ) -> StoreResult<Option<Uuid>> {
    let tables = self.tables.read();
    Ok(
      tables
        .providers
        .iter()
        .find(|p| p.owner_user_id == Some(owner) && p.service_type == service_type && Some(p.id) != excluding)
        .map(|p| p.id),
    )
  }

  async fn service_category_exists(&self, slug: &str) -> StoreResult<bool> {
    Ok(self.tables.read().categories.contains(slug))
  }

  async fn insert_provider(&self, provider: NewProvider) -> StoreResult<Provider> {
    let row = Provider {
      id: Uuid::new_v4(),
      name: provider.name,
      service_type: provider.service_type,
      city: Some(provider.city),
      photo_url: None,
      phone_enc: provider.phone_enc,
      phone_hash: Some(provider.phone_hash),
      owner_user_id: provider.owner_user_id,
      created_at: Utc::now(),
      neighborhoods: provider.neighborhoods,
      specialties: provider.specialties,
    };
    self.tables.write().providers.push(row.clone());
    Ok(row)
  }

  async fn update_provider(&self, id: Uuid, changes: ProviderChanges) -> StoreResult<Provider> {
    let mut tables = self.tables.write();
    let row = tables
      .providers
      .iter_mut()
      .find(|p| p.id == id)
      .ok_or_else(|| StoreError::NotFound(format!("provider {}", id)))?;
    row.name = changes.name;
    row.service_type = changes.service_type;
    row.city = Some(changes.city);
    if let Some(phone) = changes.phone {
      row.phone_hash = Some(phone.phone_hash);
      row.phone_enc = phone.phone_enc;
    }
    Ok(row.clone())
  }

  async fn providers_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Provider>> {
    let tables = self.tables.read();
    Ok(tables.providers.iter().filter(|p| ids.contains(&p.id)).cloned().collect())
  }

  async fn user_names(&self, ids: &[Uuid]) -> StoreResult<HashMap<Uuid, String>> {
    let tables = self.tables.read();
    Ok(
      tables
        .users
        .iter()
        .filter(|u| ids.contains(&u.id))
        .filter_map(|u| u.name.clone().map(|name| (u.id, name)))
        .collect(),
    )
  }

  async fn recommendation_counts(&self, provider_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, i64>> {
    let tables = self.tables.read();
    let mut counts = HashMap::new();
    for rec in tables.recommendations.iter().filter(|r| provider_ids.contains(&r.provider_id)) {
      *counts.entry(rec.provider_id).or_insert(0) += 1;
    }
    Ok(counts)
  }

  async fn symmetric_connections(&self, user: Uuid) -> StoreResult<Vec<SymmetricConnection>> {
    self.enter(StoreOp::SymmetricConnections)?;
    if self.schema == ConnectionSchema::Legacy {
      return Err(StoreError::UndefinedColumn("user_a_id".to_string()));
    }
    let tables = self.tables.read();
    Ok(
      tables
        .symmetric
        .iter()
        .filter(|c| c.user_a_id == Some(user) || c.user_b_id == Some(user))
        .cloned()
        .collect(),
    )
  }

  async fn legacy_connections(&self, user: Uuid) -> StoreResult<Vec<LegacyConnection>> {
    self.enter(StoreOp::LegacyConnections)?;
    if self.schema == ConnectionSchema::Symmetric {
      return Err(StoreError::UndefinedColumn("connected_user_id".to_string()));
    }
    let tables = self.tables.read();
    Ok(
      tables
        .legacy
        .iter()
        .filter(|e| e.user_id == user && e.status == "accepted")
        .map(|e| LegacyConnection {
          connected_user_id: e.connected_user_id,
        })
        .collect(),
    )
  }

  async fn recommendations_for(&self, provider_ids: &[Uuid]) -> StoreResult<Vec<RecommendationRecord>> {
    self.enter(StoreOp::Recommendations)?;
    let tables = self.tables.read();
    let name_of = |id: Option<Uuid>| -> Option<String> {
      let id = id?;
      tables.users.iter().find(|u| u.id == id).and_then(|u| u.name.clone())
    };
    Ok(
      tables
        .recommendations
        .iter()
        .filter(|r| provider_ids.contains(&r.provider_id))
        .map(|r| RecommendationRecord {
          provider_id: r.provider_id,
          recommender_user_id: r.recommender_user_id,
          recommender_name: name_of(r.recommender_user_id),
          note: r.note.clone(),
          created_at: r.created_at,
        })
        .collect(),
    )
  }

  async fn recommender_ids(&self) -> StoreResult<HashSet<Uuid>> {
    let tables = self.tables.read();
    Ok(tables.recommendations.iter().filter_map(|r| r.recommender_user_id).collect())
  }

  async fn recommendation_activity(&self, since: Option<DateTime<Utc>>) -> StoreResult<Vec<RecommendationActivity>> {
    let tables = self.tables.read();
    Ok(
      tables
        .recommendations
        .iter()
        .filter(|r| since.map_or(true, |s| r.created_at >= s))
        .map(|r| RecommendationActivity {
          provider_id: r.provider_id,
          recommender_user_id: r.recommender_user_id,
          created_at: r.created_at,
        })
        .collect(),
    )
  }

  async fn list_users(&self, filter: &UserFilter) -> StoreResult<Vec<User>> {
    self.enter(StoreOp::ListUsers)?;
    let tables = self.tables.read();
    let mut rows: Vec<User> = tables
      .users
      .iter()
      .filter(|u| {
        filter.search.as_deref().map_or(true, |s| {
          contains_ci(u.name.as_deref(), s) || contains_ci(u.email.as_deref(), s) || contains_ci(u.phone_e164.as_deref(), s)
        })
      })
      .filter(|u| filter.created_until.map_or(true, |until| u.created_at <= until))
      .cloned()
      .collect();
    newest_first(&mut rows, |u| u.created_at);
    Ok(rows)
  }

  async fn insert_event(&self, event: NewTrackedEvent) -> StoreResult<TrackedEvent> {
    self.enter(StoreOp::Events)?;
    let row = TrackedEvent {
      id: Uuid::new_v4(),
      event_type: event.event_type,
      user_id: event.user_id,
      payload: event.payload,
      created_at: Utc::now(),
    };
    self.tables.write().events.push(row.clone());
    Ok(row)
  }

  async fn events_of_type(&self, event_type: &str, since: Option<DateTime<Utc>>) -> StoreResult<Vec<TrackedEvent>> {
    self.enter(StoreOp::Events)?;
    let tables = self.tables.read();
    let mut rows: Vec<TrackedEvent> = tables
      .events
      .iter()
      .filter(|e| e.event_type == event_type && since.map_or(true, |s| e.created_at >= s))
      .cloned()
      .collect();
    newest_first(&mut rows, |e| e.created_at);
    Ok(rows)
  }
}
