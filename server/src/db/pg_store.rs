// jokko-server/src/db/pg_store.rs

use super::store_error;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jokko::error::{StoreError, StoreResult};
use jokko::models::{
  LegacyConnection, NewProvider, NewTrackedEvent, Provider, ProviderChanges, RecommendationActivity,
  RecommendationRecord, SymmetricConnection, TrackedEvent, User,
};
use jokko::store::{ProviderFilter, ReferralStore, UserFilter};
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use tracing::{instrument, warn};
use uuid::Uuid;

// `phone_enc` is bytea; reading it as text yields the `\x` + hex envelope.
const PROVIDER_SELECT: &str = "SELECT p.id, p.name, p.service_type, p.city, p.photo_url, \
  p.phone_enc::text AS phone_enc, p.phone_hash, p.owner_user_id, p.created_at, \
  ARRAY(SELECT pn.neighborhood::text FROM provider_neighborhoods pn WHERE pn.provider_id = p.id) AS neighborhoods, \
  ARRAY(SELECT ps.specialty::text FROM provider_specialties ps WHERE ps.provider_id = p.id) AS specialties \
  FROM provider p";

const PROVIDER_FILTER: &str = " WHERE ($1::text IS NULL OR p.name ILIKE '%' || $1 || '%') \
  AND ($2::text IS NULL OR p.service_type = $2) \
  AND ($3::text IS NULL OR p.city = $3) \
  AND ($4::text IS NULL OR p.name ILIKE '%' || $4 || '%' OR p.service_type ILIKE '%' || $4 || '%' OR p.city ILIKE '%' || $4 || '%') \
  AND ($5::timestamptz IS NULL OR p.created_at <= $5)";

const EVENT_COLUMNS: &str = "id, event_type, user_id, event_payload AS payload, created_at";

#[derive(Debug, Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  async fn fetch_provider(&self, id: Uuid) -> StoreResult<Provider> {
    self
      .provider_by_id(id)
      .await?
      .ok_or_else(|| StoreError::NotFound(format!("provider {}", id)))
  }
}

#[async_trait]
impl ReferralStore for PgStore {
  #[instrument(name = "PgStore::list_providers", skip(self), err(Display))]
  async fn list_providers(&self, filter: &ProviderFilter, offset: i64, limit: i64) -> StoreResult<Vec<Provider>> {
    let sql = format!("{PROVIDER_SELECT}{PROVIDER_FILTER} ORDER BY p.created_at DESC OFFSET $6 LIMIT $7");
    sqlx::query_as::<_, Provider>(&sql)
      .bind(filter.name_contains.as_deref())
      .bind(filter.service_type.as_deref())
      .bind(filter.city.as_deref())
      .bind(filter.text.as_deref())
      .bind(filter.created_until)
      .bind(offset)
      .bind(limit)
      .fetch_all(&self.pool)
      .await
      .map_err(store_error)
  }

  async fn count_providers(&self, filter: &ProviderFilter) -> StoreResult<i64> {
    let sql = format!("SELECT COUNT(*) FROM provider p{PROVIDER_FILTER}");
    sqlx::query_scalar::<_, i64>(&sql)
      .bind(filter.name_contains.as_deref())
      .bind(filter.service_type.as_deref())
      .bind(filter.city.as_deref())
      .bind(filter.text.as_deref())
      .bind(filter.created_until)
      .fetch_one(&self.pool)
      .await
      .map_err(store_error)
  }

  async fn provider_by_id(&self, id: Uuid) -> StoreResult<Option<Provider>> {
    let sql = format!("{PROVIDER_SELECT} WHERE p.id = $1");
    sqlx::query_as::<_, Provider>(&sql)
      .bind(id)
      .fetch_optional(&self.pool)
      .await
      .map_err(store_error)
  }

  async fn find_owned_provider(
    &self,
    owner: Uuid,
    service_type: &str,
    excluding: Option<Uuid>,
  ) -> StoreResult<Option<Uuid>> {
    sqlx::query_scalar::<_, Uuid>(
      "SELECT id FROM provider WHERE owner_user_id = $1 AND service_type = $2 AND ($3::uuid IS NULL OR id <> $3) LIMIT 1",
    )
    .bind(owner)
    .bind(service_type)
    .bind(excluding)
    .fetch_optional(&self.pool)
    .await
    .map_err(store_error)
  }

  async fn service_category_exists(&self, slug: &str) -> StoreResult<bool> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM service_categories WHERE slug = $1)")
      .bind(slug)
      .fetch_one(&self.pool)
      .await
      .map_err(store_error)
  }

  #[instrument(name = "PgStore::insert_provider", skip_all, fields(service_type = %provider.service_type), err(Display))]
  async fn insert_provider(&self, provider: NewProvider) -> StoreResult<Provider> {
    let mut tx = self.pool.begin().await.map_err(store_error)?;

    let id: Uuid = sqlx::query_scalar(
      "INSERT INTO provider (name, service_type, city, phone_hash, phone_enc, owner_user_id) \
       VALUES ($1, $2, $3, $4, $5::text::bytea, $6) RETURNING id",
    )
    .bind(&provider.name)
    .bind(&provider.service_type)
    .bind(&provider.city)
    .bind(&provider.phone_hash)
    .bind(provider.phone_enc.as_deref())
    .bind(provider.owner_user_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(store_error)?;

    if !provider.neighborhoods.is_empty() {
      sqlx::query("INSERT INTO provider_neighborhoods (provider_id, neighborhood) SELECT $1, UNNEST($2::text[])")
        .bind(id)
        .bind(&provider.neighborhoods)
        .execute(&mut *tx)
        .await
        .map_err(store_error)?;
    }
    if !provider.specialties.is_empty() {
      sqlx::query("INSERT INTO provider_specialties (provider_id, specialty) SELECT $1, UNNEST($2::text[])")
        .bind(id)
        .bind(&provider.specialties)
        .execute(&mut *tx)
        .await
        .map_err(store_error)?;
    }

    tx.commit().await.map_err(store_error)?;
    self.fetch_provider(id).await
  }

  #[instrument(name = "PgStore::update_provider", skip(self, changes), err(Display))]
  async fn update_provider(&self, id: Uuid, changes: ProviderChanges) -> StoreResult<Provider> {
    let result = match &changes.phone {
      Some(phone) => {
        sqlx::query(
          "UPDATE provider SET name = $2, service_type = $3, city = $4, phone_hash = $5, phone_enc = $6::text::bytea \
           WHERE id = $1",
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.service_type)
        .bind(&changes.city)
        .bind(&phone.phone_hash)
        .bind(phone.phone_enc.as_deref())
        .execute(&self.pool)
        .await
      }
      None => {
        sqlx::query("UPDATE provider SET name = $2, service_type = $3, city = $4 WHERE id = $1")
          .bind(id)
          .bind(&changes.name)
          .bind(&changes.service_type)
          .bind(&changes.city)
          .execute(&self.pool)
          .await
      }
    }
    .map_err(store_error)?;

    if result.rows_affected() == 0 {
      return Err(StoreError::NotFound(format!("provider {}", id)));
    }
    self.fetch_provider(id).await
  }

  async fn providers_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Provider>> {
    if ids.is_empty() {
      return Ok(Vec::new());
    }
    let sql = format!("{PROVIDER_SELECT} WHERE p.id = ANY($1)");
    sqlx::query_as::<_, Provider>(&sql)
      .bind(ids)
      .fetch_all(&self.pool)
      .await
      .map_err(store_error)
  }

  async fn user_names(&self, ids: &[Uuid]) -> StoreResult<HashMap<Uuid, String>> {
    if ids.is_empty() {
      return Ok(HashMap::new());
    }
    let rows: Vec<(Uuid, String)> =
      sqlx::query_as("SELECT id, name FROM users WHERE id = ANY($1) AND name IS NOT NULL")
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;
    Ok(rows.into_iter().collect())
  }

  async fn recommendation_counts(&self, provider_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, i64>> {
    if provider_ids.is_empty() {
      return Ok(HashMap::new());
    }
    let rows: Vec<(Uuid, i64)> = sqlx::query_as(
      "SELECT provider_id, COUNT(*) FROM recommendation WHERE provider_id = ANY($1) GROUP BY provider_id",
    )
    .bind(provider_ids)
    .fetch_all(&self.pool)
    .await
    .map_err(store_error)?;
    Ok(rows.into_iter().collect())
  }

  async fn symmetric_connections(&self, user: Uuid) -> StoreResult<Vec<SymmetricConnection>> {
    sqlx::query_as::<_, SymmetricConnection>(
      "SELECT user_a_id, user_b_id FROM connection WHERE user_a_id = $1 OR user_b_id = $1",
    )
    .bind(user)
    .fetch_all(&self.pool)
    .await
    .map_err(store_error)
  }

  async fn legacy_connections(&self, user: Uuid) -> StoreResult<Vec<LegacyConnection>> {
    sqlx::query_as::<_, LegacyConnection>(
      "SELECT connected_user_id FROM connection WHERE user_id = $1 AND status = 'accepted'",
    )
    .bind(user)
    .fetch_all(&self.pool)
    .await
    .map_err(store_error)
  }

  async fn recommendations_for(&self, provider_ids: &[Uuid]) -> StoreResult<Vec<RecommendationRecord>> {
    if provider_ids.is_empty() {
      return Ok(Vec::new());
    }
    sqlx::query_as::<_, RecommendationRecord>(
      "SELECT r.provider_id, r.recommender_user_id, u.name AS recommender_name, r.note, r.created_at \
       FROM recommendation r LEFT JOIN users u ON u.id = r.recommender_user_id \
       WHERE r.provider_id = ANY($1)",
    )
    .bind(provider_ids)
    .fetch_all(&self.pool)
    .await
    .map_err(store_error)
  }

  async fn recommender_ids(&self) -> StoreResult<HashSet<Uuid>> {
    let ids: Vec<Uuid> = sqlx::query_scalar(
      "SELECT DISTINCT recommender_user_id FROM recommendation WHERE recommender_user_id IS NOT NULL",
    )
    .fetch_all(&self.pool)
    .await
    .map_err(store_error)?;
    Ok(ids.into_iter().collect())
  }

  async fn recommendation_activity(&self, since: Option<DateTime<Utc>>) -> StoreResult<Vec<RecommendationActivity>> {
    sqlx::query_as::<_, RecommendationActivity>(
      "SELECT provider_id, recommender_user_id, created_at FROM recommendation \
       WHERE ($1::timestamptz IS NULL OR created_at >= $1)",
    )
    .bind(since)
    .fetch_all(&self.pool)
    .await
    .map_err(store_error)
  }

  #[instrument(name = "PgStore::list_users", skip(self), err(Display))]
  async fn list_users(&self, filter: &UserFilter) -> StoreResult<Vec<User>> {
    sqlx::query_as::<_, User>(
      "SELECT id, name, phone_e164, email, language, user_type, created_at FROM users \
       WHERE ($1::text IS NULL OR name ILIKE '%' || $1 || '%' OR email ILIKE '%' || $1 || '%' OR phone_e164 ILIKE '%' || $1 || '%') \
       AND ($2::timestamptz IS NULL OR created_at <= $2) \
       ORDER BY created_at DESC",
    )
    .bind(filter.search.as_deref())
    .bind(filter.created_until)
    .fetch_all(&self.pool)
    .await
    .map_err(store_error)
  }

  async fn insert_event(&self, event: NewTrackedEvent) -> StoreResult<TrackedEvent> {
    let sql = format!("INSERT INTO events (event_type, event_payload, user_id) VALUES ($1, $2, $3) RETURNING {EVENT_COLUMNS}");
    sqlx::query_as::<_, TrackedEvent>(&sql)
      .bind(&event.event_type)
      .bind(&event.payload)
      .bind(event.user_id)
      .fetch_one(&self.pool)
      .await
      .map_err(|e| {
        warn!(error = %e, event_type = %event.event_type, "Failed to persist tracked event.");
        store_error(e)
      })
  }

  async fn events_of_type(&self, event_type: &str, since: Option<DateTime<Utc>>) -> StoreResult<Vec<TrackedEvent>> {
    let sql = format!(
      "SELECT {EVENT_COLUMNS} FROM events WHERE event_type = $1 AND ($2::timestamptz IS NULL OR created_at >= $2) \
       ORDER BY created_at DESC"
    );
    sqlx::query_as::<_, TrackedEvent>(&sql)
      .bind(event_type)
      .bind(since)
      .fetch_all(&self.pool)
      .await
      .map_err(store_error)
  }
}
