// jokko-server/src/state.rs
use crate::config::AppConfig;
use jokko::{EventLog, NetworkResolver, PhoneCipher, ProviderCatalog, ProviderListing, ReferralStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn ReferralStore>,
  pub listing: Arc<ProviderListing>,
  pub catalog: Arc<ProviderCatalog>,
  pub resolver: Arc<NetworkResolver>,
  pub events: Arc<EventLog>,
}

impl AppState {
  /// Wires the core services over one store. The listing pipeline reports
  /// degraded steps into `events`.
  pub fn new(store: Arc<dyn ReferralStore>, resolver: Arc<NetworkResolver>, config: &AppConfig) -> Self {
    let cipher = Arc::new(PhoneCipher::from_key_hex(config.encryption_key_hex.as_deref()));
    let events = Arc::new(EventLog::new(config.monitoring_capacity));
    Self {
      listing: Arc::new(ProviderListing::new(store.clone(), resolver.clone(), Some(events.clone()))),
      catalog: Arc::new(ProviderCatalog::new(store.clone(), cipher)),
      store,
      resolver,
      events,
    }
  }
}
