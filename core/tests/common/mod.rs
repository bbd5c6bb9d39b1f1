// tests/common/mod.rs
#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use jokko::models::{ConnectionSchema, Provider, User};
use jokko::pipeline::Handler;
use jokko::{ContextData, PipelineControl, PipelineError};
use jokko::store::MemoryStore;
use once_cell::sync::Lazy;
use std::sync::Arc;
use tracing::Level;
use uuid::Uuid;

pub const TEST_KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";
pub const OTHER_KEY_HEX: &str = "ffeeddccbbaa99887766554433221100ffeeddccbbaa99887766554433221100";

// --- Pipeline engine fixtures ---
#[derive(Clone, Debug, Default)]
pub struct TestContext {
  pub counter: i32,
  pub message: String,
  pub steps_executed: Vec<String>,
  pub should_stop_at: Option<String>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("Pipeline framework error: {0}")]
  Framework(String),

  #[error("Test handler failed: {0}")]
  Handler(String),
}

impl From<PipelineError> for TestError {
  fn from(err: PipelineError) -> Self {
    TestError::Framework(format!("{:?}", err))
  }
}

pub fn create_simple_handler(step_name: &'static str, message_to_append: &'static str) -> Handler<TestContext, TestError> {
  Box::new(move |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.counter += 1;
      guard.message.push_str(message_to_append);
      guard.steps_executed.push(step_name.to_string());
      if guard.should_stop_at.as_deref() == Some(step_name) {
        return Ok(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    })
  })
}

pub fn create_failing_handler(step_name: &'static str, error_message: &'static str) -> Handler<TestContext, TestError> {
  Box::new(move |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().steps_executed.push(step_name.to_string());
      Err(TestError::Handler(error_message.to_string()))
    })
  })
}

// --- Tracing ---
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Domain fixtures ---
pub fn base_time() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2025, 3, 12, 10, 0, 0).unwrap()
}

/// `base_time()` shifted by `minutes` (negative = earlier).
pub fn at(minutes: i64) -> DateTime<Utc> {
  base_time() + Duration::minutes(minutes)
}

pub fn days_ago(days: i64) -> DateTime<Utc> {
  base_time() - Duration::days(days)
}

pub fn user(name: &str, phone: Option<&str>, created_at: DateTime<Utc>) -> User {
  User {
    id: Uuid::new_v4(),
    name: Some(name.to_string()),
    phone_e164: phone.map(str::to_string),
    email: Some(format!("{}@example.com", name.to_lowercase())),
    language: Some("fr".to_string()),
    user_type: None,
    created_at,
  }
}

pub fn typed_user(name: &str, phone: Option<&str>, user_type: &str, created_at: DateTime<Utc>) -> User {
  User {
    user_type: Some(user_type.to_string()),
    ..user(name, phone, created_at)
  }
}

pub fn provider(name: &str, service_type: &str, created_at: DateTime<Utc>) -> Provider {
  Provider {
    id: Uuid::new_v4(),
    name: name.to_string(),
    service_type: service_type.to_string(),
    city: Some("Dakar".to_string()),
    photo_url: None,
    phone_enc: None,
    phone_hash: None,
    owner_user_id: None,
    created_at,
    neighborhoods: vec!["Plateau".to_string()],
    specialties: Vec::new(),
  }
}

/// Hex of the UTF-8 bytes, as legacy unencrypted rows store phones.
pub fn legacy_hex(phone: &str) -> String {
  format!("\\x{}", hex::encode(phone.as_bytes()))
}

pub fn memory_store(schema: ConnectionSchema) -> Arc<MemoryStore> {
  Arc::new(MemoryStore::new(schema))
}

pub fn store_with_categories(schema: ConnectionSchema) -> Arc<MemoryStore> {
  let store = memory_store(schema);
  for slug in jokko::listing::SERVICE_SLUGS {
    store.add_category(slug);
  }
  store
}
