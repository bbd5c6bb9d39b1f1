// jokko/src/network.rs

//! Resolves a caller's network: the users they share an accepted connection with.

use crate::error::{StoreError, StoreResult};
use crate::models::ConnectionSchema;
use crate::store::ReferralStore;
use parking_lot::RwLock;
use std::collections::HashSet;
use tracing::{event, instrument, Level};
use uuid::Uuid;

/// Ids of the caller's accepted connections. Never contains the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Network(HashSet<Uuid>);

impl Network {
  pub fn contains(&self, id: &Uuid) -> bool {
    self.0.contains(id)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Uuid> {
    self.0.iter()
  }

  fn collect_for(caller: Uuid, ids: impl IntoIterator<Item = Option<Uuid>>) -> Self {
    Network(ids.into_iter().flatten().filter(|id| *id != caller).collect())
  }
}

impl FromIterator<Uuid> for Network {
  fn from_iter<I: IntoIterator<Item = Uuid>>(iter: I) -> Self {
    Network(iter.into_iter().collect())
  }
}

/// Resolves networks against whichever connection shape the store carries.
///
/// The shape is detected once and cached. If a cached symmetric shape later
/// reports a missing column, the cache flips to legacy for good.
#[derive(Debug, Default)]
pub struct NetworkResolver {
  schema: RwLock<Option<ConnectionSchema>>,
}

impl NetworkResolver {
  pub fn new() -> Self {
    Self::default()
  }

  /// A resolver that trusts `schema` without probing.
  pub fn with_schema(schema: ConnectionSchema) -> Self {
    Self {
      schema: RwLock::new(Some(schema)),
    }
  }

  pub fn schema(&self) -> Option<ConnectionSchema> {
    *self.schema.read()
  }

  /// Probes the store with the symmetric query and caches the result.
  #[instrument(name = "NetworkResolver::detect", skip_all, err(Display))]
  pub async fn detect(&self, store: &dyn ReferralStore) -> StoreResult<ConnectionSchema> {
    let schema = match store.symmetric_connections(Uuid::nil()).await {
      Ok(_) => ConnectionSchema::Symmetric,
      Err(StoreError::UndefinedColumn(column)) => {
        event!(Level::INFO, %column, "Symmetric connection columns missing, using legacy shape.");
        ConnectionSchema::Legacy
      }
      Err(err) => return Err(err),
    };
    *self.schema.write() = Some(schema);
    event!(Level::INFO, ?schema, "Connection schema detected.");
    Ok(schema)
  }

  /// The caller's network. A guest (no caller) gets an empty network without
  /// touching the store.
  #[instrument(name = "NetworkResolver::resolve", skip(self, store), fields(schema = tracing::field::Empty), err(Display))]
  pub async fn resolve(&self, store: &dyn ReferralStore, caller: Option<Uuid>) -> StoreResult<Network> {
    let Some(caller) = caller else {
      return Ok(Network::default());
    };

    let cached = self.schema();
    tracing::Span::current().record("schema", tracing::field::debug(&cached));

    if cached == Some(ConnectionSchema::Legacy) {
      return resolve_legacy(store, caller).await;
    }

    match resolve_symmetric(store, caller).await {
      Ok(network) => {
        if cached.is_none() {
          *self.schema.write() = Some(ConnectionSchema::Symmetric);
        }
        Ok(network)
      }
      Err(StoreError::UndefinedColumn(column)) => {
        event!(Level::WARN, %column, "Symmetric connection query failed, switching to legacy shape.");
        *self.schema.write() = Some(ConnectionSchema::Legacy);
        resolve_legacy(store, caller).await
      }
      Err(err) => Err(err),
    }
  }
}

async fn resolve_symmetric(store: &dyn ReferralStore, caller: Uuid) -> StoreResult<Network> {
  let rows = store.symmetric_connections(caller).await?;
  Ok(Network::collect_for(caller, rows.iter().map(|row| row.other_side(caller))))
}

async fn resolve_legacy(store: &dyn ReferralStore, caller: Uuid) -> StoreResult<Network> {
  let rows = store.legacy_connections(caller).await?;
  Ok(Network::collect_for(caller, rows.into_iter().map(|row| row.connected_user_id)))
}
