// jokko-server/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;

pub const DEFAULT_MONITORING_CAPACITY: usize = 1000;

#[derive(Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,

  /// 64 hex chars. Without it phones are stored as hashes only.
  pub encryption_key_hex: Option<String>,

  pub monitoring_capacity: usize,

  /// Detect the connection table shape at startup instead of on first use.
  pub detect_connection_schema: bool,
}

impl std::fmt::Debug for AppConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AppConfig")
      .field("server_host", &self.server_host)
      .field("server_port", &self.server_port)
      .field("database_url", &"[REDACTED]")
      .field("encryption_key_hex", &self.encryption_key_hex.as_ref().map(|_| "[REDACTED]"))
      .field("monitoring_capacity", &self.monitoring_capacity)
      .field("detect_connection_schema", &self.detect_connection_schema)
      .finish()
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|_| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let database_url = get_env("DATABASE_URL")?;

    let encryption_key_hex = get_env("ENCRYPTION_KEY_HEX").ok().filter(|k| !k.trim().is_empty());
    if encryption_key_hex.is_none() {
      tracing::warn!("ENCRYPTION_KEY_HEX not set, provider phones will not be encrypted.");
    }

    let monitoring_capacity = get_env("MONITORING_CAPACITY")
      .unwrap_or_else(|_| DEFAULT_MONITORING_CAPACITY.to_string())
      .parse::<usize>()
      .map_err(|e| AppError::Config(format!("Invalid MONITORING_CAPACITY: {}", e)))?;

    let detect_connection_schema = get_env("DETECT_CONNECTION_SCHEMA")
      .unwrap_or_else(|_| "true".to_string())
      .parse::<bool>()
      .map_err(|e| AppError::Config(format!("Invalid DETECT_CONNECTION_SCHEMA value: {}", e)))?;

    let config = Self {
      server_host,
      server_port,
      database_url,
      encryption_key_hex,
      monitoring_capacity,
      detect_connection_schema,
    };
    tracing::info!(config = ?config, "Application configuration loaded successfully.");
    Ok(config)
  }

  pub fn bind_address(&self) -> String {
    format!("{}:{}", self.server_host, self.server_port)
  }
}
