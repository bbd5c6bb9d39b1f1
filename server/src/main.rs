// jokko-server/src/main.rs

mod config;
mod db;
mod errors;
mod state;
mod web;

use crate::config::AppConfig;
use crate::db::PgStore;
use crate::state::AppState;

use actix_web::{web as actix_data, App, HttpServer};
use jokko::{NetworkResolver, ReferralStore};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting Jokko referral server...");

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
    }
  };

  let db_pool = match PgPool::connect(&app_config.database_url).await {
    Ok(pool) => {
      tracing::info!("Successfully connected to the database.");
      pool
    }
    Err(e) => {
      tracing::error!(error = %e, "Failed to connect to the database.");
      return Err(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, e.to_string()));
    }
  };

  let store: Arc<dyn ReferralStore> = Arc::new(PgStore::new(db_pool));
  let resolver = Arc::new(NetworkResolver::new());
  if app_config.detect_connection_schema {
    // On failure the resolver detects the shape on the first signed-in listing instead.
    if let Err(e) = resolver.detect(store.as_ref()).await {
      tracing::warn!(error = %e, "Connection schema detection failed at startup.");
    }
  }

  let app_state = AppState::new(store, resolver, &app_config);
  app_state.events.info("Server started", "startup");

  let server_address = app_config.bind_address();
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
