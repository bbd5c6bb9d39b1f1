// jokko-server/src/web/handlers/event_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TrackEventPayload {
  #[serde(default)]
  pub event_type: String,
  pub payload: Option<Value>,
}

#[instrument(name = "handler::track_event", skip(app_state, req_payload), fields(event_type = %req_payload.event_type))]
pub async fn track_event_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<TrackEventPayload>,
) -> Result<HttpResponse, AppError> {
  let TrackEventPayload { event_type, payload } = req_payload.into_inner();

  let stored = match jokko::events::track_event(app_state.store.as_ref(), &event_type, payload).await {
    Ok(stored) => stored,
    Err(err) => {
      app_state.events.error(format!("Event tracking failed: {}", err), "track_event");
      return Err(err.into());
    }
  };
  info!(event_id = %stored.id, "Event tracked.");

  Ok(HttpResponse::Ok().json(json!({
      "success": true,
      "event": stored
  })))
}
