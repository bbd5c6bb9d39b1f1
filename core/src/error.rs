// jokko/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

/// Failures raised by the pipeline engine itself.
#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("Step not found: {step_name}")]
  StepNotFound { step_name: String },

  #[error("Handler missing for required step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("Error in handler or external operation. Source: {source}")]
  HandlerError {
    #[source]
    source: AnyhowError,
  },

  #[error("Internal pipeline error: {0}")]
  Internal(String),
}

impl From<AnyhowError> for PipelineError {
  fn from(err: AnyhowError) -> Self {
    PipelineError::HandlerError { source: err }
  }
}

/// Failures reported by a [`ReferralStore`](crate::store::ReferralStore).
#[derive(Debug, Error)]
pub enum StoreError {
  /// The backend rejected a query because a referenced column does not exist.
  /// The connection resolver uses this to detect the legacy connection shape.
  #[error("Column does not exist: {0}")]
  UndefinedColumn(String),

  #[error("Record not found: {0}")]
  NotFound(String),

  #[error("Storage backend error: {source}")]
  Backend {
    #[source]
    source: AnyhowError,
  },
}

impl StoreError {
  pub fn backend(err: impl Into<AnyhowError>) -> Self {
    StoreError::Backend { source: err.into() }
  }

  pub fn is_undefined_column(&self) -> bool {
    matches!(self, StoreError::UndefinedColumn(_))
  }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
  #[error("Encryption key not configured")]
  MissingKey,

  #[error("Encryption key must be {expected} hex characters")]
  InvalidKey { expected: usize },

  #[error("Phone encryption failed")]
  Encrypt,
}

/// One rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FieldError {
  pub field: String,
  pub message: String,
}

/// All field errors of one request, reported together.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
  pub fn push(&mut self, field: &str, message: impl Into<String>) {
    self.0.push(FieldError {
      field: field.to_string(),
      message: message.into(),
    });
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn single(field: &str, message: impl Into<String>) -> Self {
    let mut errors = Self::default();
    errors.push(field, message);
    errors
  }

  pub fn has_field(&self, field: &str) -> bool {
    self.0.iter().any(|e| e.field == field)
  }
}

impl std::fmt::Display for ValidationErrors {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let messages: Vec<&str> = self.0.iter().map(|e| e.message.as_str()).collect();
    f.write_str(&messages.join(", "))
  }
}

/// Domain error returned by every public operation of this crate.
#[derive(Debug, Error)]
pub enum ReferralError {
  #[error("Validation failed: {0}")]
  Validation(ValidationErrors),

  #[error("{0} not found")]
  NotFound(String),

  #[error("{0}")]
  Conflict(String),

  #[error("{0}")]
  Unsupported(String),

  #[error(transparent)]
  Store(#[from] StoreError),

  #[error(transparent)]
  Codec(#[from] CodecError),

  #[error(transparent)]
  Pipeline(#[from] PipelineError),
}

impl From<ValidationErrors> for ReferralError {
  fn from(errors: ValidationErrors) -> Self {
    ReferralError::Validation(errors)
  }
}

impl From<AnyhowError> for ReferralError {
  fn from(err: AnyhowError) -> Self {
    ReferralError::Pipeline(PipelineError::from(err))
  }
}

pub type ReferralResult<T, E = ReferralError> = std::result::Result<T, E>;
pub type StoreResult<T> = std::result::Result<T, StoreError>;
