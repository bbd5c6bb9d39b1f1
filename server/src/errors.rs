// jokko-server/src/errors.rs

use actix_web::{HttpResponse, ResponseError};
use jokko::{ReferralError, StoreError, ValidationErrors};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(ValidationErrors),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Unsupported Operation: {0}")]
  Unsupported(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Referral Workflow Error: {source}")]
  Referral {
    #[source]
    source: ReferralError,
  },
}

impl From<ReferralError> for AppError {
  fn from(err: ReferralError) -> Self {
    match err {
      ReferralError::Validation(errors) => AppError::Validation(errors),
      ReferralError::NotFound(what) => AppError::NotFound(format!("{} not found", what)),
      ReferralError::Conflict(m) => AppError::Conflict(m),
      ReferralError::Unsupported(m) => AppError::Unsupported(m),
      ReferralError::Store(StoreError::NotFound(what)) => AppError::NotFound(what),
      other => AppError::Referral { source: other },
    }
  }
}

impl ResponseError for AppError {
  fn error_response(&self) -> HttpResponse {
    tracing::error!(application_error = %self, "Responding with error");
    match self {
      AppError::Validation(errors) => HttpResponse::BadRequest().json(json!({
        "error": "Validation failed",
        "details": errors.to_string(),
        "fields": errors,
      })),
      AppError::NotFound(m) => HttpResponse::NotFound().json(json!({"error": m})),
      AppError::Conflict(m) => HttpResponse::Conflict().json(json!({"error": m})),
      AppError::Unsupported(m) => HttpResponse::BadRequest().json(json!({"error": m})),
      AppError::Config(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "Configuration issue", "detail": m}))
      }
      AppError::Referral { source } => {
        tracing::error!(referral_error_source = ?source, "Referral workflow error details");
        HttpResponse::InternalServerError().json(json!({"error": "Internal server error"}))
      }
    }
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
