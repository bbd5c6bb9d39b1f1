// jokko-server/src/web/identity.rs

use actix_web::{FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The caller as asserted by the upstream identity layer. Requests without a
/// valid `x-user-id` header are guests; extraction never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerIdentity(pub Option<Uuid>);

impl CallerIdentity {
  pub fn user_id(&self) -> Option<Uuid> {
    self.0
  }

  pub fn is_guest(&self) -> bool {
    self.0.is_none()
  }

  fn from_header(req: &HttpRequest) -> Self {
    let parsed = req
      .headers()
      .get(USER_ID_HEADER)
      .and_then(|value| value.to_str().ok())
      .and_then(|raw| Uuid::parse_str(raw.trim()).ok());
    if parsed.is_none() && req.headers().contains_key(USER_ID_HEADER) {
      debug!("Ignoring malformed x-user-id header, treating caller as guest.");
    }
    CallerIdentity(parsed)
  }
}

impl FromRequest for CallerIdentity {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    ready(Ok(Self::from_header(req)))
  }
}
