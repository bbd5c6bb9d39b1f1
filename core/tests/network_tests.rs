// tests/network_tests.rs
mod common;

use common::*;
use jokko::models::ConnectionSchema;
use jokko::store::StoreOp;
use jokko::{NetworkResolver, StoreError};
use serial_test::serial;
use uuid::Uuid;

#[tokio::test]
#[serial]
async fn test_symmetric_network_from_either_side() {
  setup_tracing();
  let store = memory_store(ConnectionSchema::Symmetric);
  let (me, a, b, stranger) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
  store.connect(me, a);
  store.connect(b, me);
  store.connect(a, stranger);

  let network = NetworkResolver::new().resolve(store.as_ref(), Some(me)).await.unwrap();
  assert_eq!(network.len(), 2);
  assert!(network.contains(&a));
  assert!(network.contains(&b));
  assert!(!network.contains(&stranger));
}

#[tokio::test]
#[serial]
async fn test_network_excludes_caller_and_missing_ids() {
  setup_tracing();
  let store = memory_store(ConnectionSchema::Symmetric);
  let (me, friend) = (Uuid::new_v4(), Uuid::new_v4());
  store.add_symmetric_edge(Some(me), None);
  store.add_symmetric_edge(Some(me), Some(me));
  store.add_symmetric_edge(None, Some(me));
  store.connect(me, friend);

  let network = NetworkResolver::new().resolve(store.as_ref(), Some(me)).await.unwrap();
  assert_eq!(network.iter().copied().collect::<Vec<_>>(), vec![friend]);
}

#[tokio::test]
#[serial]
async fn test_guest_gets_empty_network_without_queries() {
  setup_tracing();
  let store = memory_store(ConnectionSchema::Symmetric);
  let network = NetworkResolver::new().resolve(store.as_ref(), None).await.unwrap();
  assert!(network.is_empty());
  assert_eq!(store.calls(StoreOp::SymmetricConnections), 0);
  assert_eq!(store.calls(StoreOp::LegacyConnections), 0);
}

#[tokio::test]
#[serial]
async fn test_missing_symmetric_columns_fall_back_to_legacy() {
  setup_tracing();
  let store = memory_store(ConnectionSchema::Legacy);
  let (me, friend, pending) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
  store.connect(me, friend);
  store.add_legacy_edge(me, Some(pending), "pending");
  store.add_legacy_edge(me, None, "accepted");

  let resolver = NetworkResolver::new();
  let network = resolver.resolve(store.as_ref(), Some(me)).await.unwrap();

  assert_eq!(network.iter().copied().collect::<Vec<_>>(), vec![friend]);
  assert_eq!(resolver.schema(), Some(ConnectionSchema::Legacy));
  assert_eq!(store.calls(StoreOp::SymmetricConnections), 1);
  assert_eq!(store.calls(StoreOp::LegacyConnections), 1);
}

#[tokio::test]
#[serial]
async fn test_legacy_shape_is_remembered() {
  setup_tracing();
  let store = memory_store(ConnectionSchema::Legacy);
  let (me, friend) = (Uuid::new_v4(), Uuid::new_v4());
  store.connect(me, friend);

  let resolver = NetworkResolver::new();
  for _ in 0..3 {
    let network = resolver.resolve(store.as_ref(), Some(me)).await.unwrap();
    assert!(network.contains(&friend));
  }
  assert_eq!(store.calls(StoreOp::SymmetricConnections), 1);
  assert_eq!(store.calls(StoreOp::LegacyConnections), 3);
}

#[tokio::test]
#[serial]
async fn test_legacy_edges_are_directed() {
  setup_tracing();
  let store = memory_store(ConnectionSchema::Legacy);
  let (me, follower) = (Uuid::new_v4(), Uuid::new_v4());
  store.add_legacy_edge(follower, Some(me), "accepted");

  let resolver = NetworkResolver::with_schema(ConnectionSchema::Legacy);
  assert!(resolver.resolve(store.as_ref(), Some(me)).await.unwrap().is_empty());
  assert!(resolver.resolve(store.as_ref(), Some(follower)).await.unwrap().contains(&me));
}

#[tokio::test]
#[serial]
async fn test_detect_probes_once() {
  setup_tracing();
  let symmetric = memory_store(ConnectionSchema::Symmetric);
  let legacy = memory_store(ConnectionSchema::Legacy);

  let resolver = NetworkResolver::new();
  assert_eq!(resolver.schema(), None);
  assert_eq!(resolver.detect(symmetric.as_ref()).await.unwrap(), ConnectionSchema::Symmetric);
  assert_eq!(resolver.schema(), Some(ConnectionSchema::Symmetric));

  let resolver = NetworkResolver::new();
  assert_eq!(resolver.detect(legacy.as_ref()).await.unwrap(), ConnectionSchema::Legacy);

  let me = Uuid::new_v4();
  resolver.resolve(legacy.as_ref(), Some(me)).await.unwrap();
  assert_eq!(legacy.calls(StoreOp::SymmetricConnections), 1);
}

#[tokio::test]
#[serial]
async fn test_cached_symmetric_flips_to_legacy_on_missing_column() {
  setup_tracing();
  let store = memory_store(ConnectionSchema::Legacy);
  let (me, friend) = (Uuid::new_v4(), Uuid::new_v4());
  store.connect(me, friend);

  let resolver = NetworkResolver::with_schema(ConnectionSchema::Symmetric);
  let network = resolver.resolve(store.as_ref(), Some(me)).await.unwrap();
  assert!(network.contains(&friend));
  assert_eq!(resolver.schema(), Some(ConnectionSchema::Legacy));
}

#[tokio::test]
#[serial]
async fn test_backend_failure_is_reported() {
  setup_tracing();
  let store = memory_store(ConnectionSchema::Symmetric);
  store.fail(StoreOp::SymmetricConnections);

  let resolver = NetworkResolver::new();
  let err = resolver.resolve(store.as_ref(), Some(Uuid::new_v4())).await.unwrap_err();
  assert!(matches!(err, StoreError::Backend { .. }));
  assert_eq!(resolver.schema(), None);
  assert_eq!(store.calls(StoreOp::LegacyConnections), 0);

  store.recover(StoreOp::SymmetricConnections);
  assert!(resolver.resolve(store.as_ref(), Some(Uuid::new_v4())).await.is_ok());
  assert_eq!(resolver.schema(), Some(ConnectionSchema::Symmetric));
}
