// jokko-server/src/web/handlers/admin_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use jokko::events::{contact_click_chart, contact_clicks, ClickWindow};
use jokko::metrics::{kpis, user_growth};
use jokko::providers::{ProviderInput, ProviderUpdate, RosterQuery};
use jokko::users::{user_roster, RoleFilter, UserRosterQuery};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::identity::CallerIdentity;

/// Lenient positive integer parameter: anything unparsable or zero is `default`.
fn count_param(raw: Option<&str>, default: usize) -> usize {
  raw
    .and_then(|v| v.trim().parse::<usize>().ok())
    .filter(|v| *v > 0)
    .unwrap_or(default)
}

#[derive(Deserialize, Debug, Default)]
pub struct RosterParams {
  pub page: Option<String>,
  pub limit: Option<String>,
  pub search: Option<String>,
  pub role: Option<String>,
}

#[instrument(name = "handler::admin_list_providers", skip(app_state, query_params))]
pub async fn list_providers_handler(
  app_state: web::Data<AppState>,
  query_params: web::Query<RosterParams>,
) -> Result<HttpResponse, AppError> {
  let params = query_params.into_inner();
  let roster = app_state
    .catalog
    .roster(RosterQuery {
      page: count_param(params.page.as_deref(), 1),
      limit: count_param(params.limit.as_deref(), jokko::providers::DEFAULT_ROSTER_LIMIT),
      search: params.search.as_deref(),
    })
    .await?;
  info!(rows = roster.providers.len(), total = roster.total, "Provider roster served.");
  Ok(HttpResponse::Ok().json(roster))
}

#[instrument(name = "handler::admin_create_provider", skip(app_state, req_payload, caller))]
pub async fn create_provider_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<ProviderInput>,
  caller: CallerIdentity,
) -> Result<HttpResponse, AppError> {
  let provider = app_state.catalog.create(req_payload.into_inner()).await?;
  app_state.events.security(
    format!("Provider {} created", provider.id),
    caller.user_id(),
    json!({ "provider_id": provider.id, "action": "create_provider" }),
  );
  info!(provider_id = %provider.id, "Provider created.");
  Ok(HttpResponse::Created().json(json!({ "provider": provider })))
}

#[instrument(name = "handler::admin_update_provider", skip(app_state, path, req_payload, caller), fields(provider_id = %path.as_ref()))]
pub async fn update_provider_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  req_payload: web::Json<ProviderUpdate>,
  caller: CallerIdentity,
) -> Result<HttpResponse, AppError> {
  let provider_id = path.into_inner();
  let provider = app_state.catalog.update(provider_id, req_payload.into_inner()).await?;
  app_state.events.security(
    format!("Provider {} updated", provider.id),
    caller.user_id(),
    json!({ "provider_id": provider.id, "action": "update_provider" }),
  );
  Ok(HttpResponse::Ok().json(json!({ "provider": provider })))
}

#[instrument(name = "handler::admin_list_users", skip(app_state, query_params))]
pub async fn list_users_handler(
  app_state: web::Data<AppState>,
  query_params: web::Query<RosterParams>,
) -> Result<HttpResponse, AppError> {
  let params = query_params.into_inner();
  let roster = user_roster(
    app_state.store.as_ref(),
    UserRosterQuery {
      page: count_param(params.page.as_deref(), 1),
      limit: count_param(params.limit.as_deref(), jokko::users::DEFAULT_USER_ROSTER_LIMIT),
      search: params.search.as_deref(),
      role: RoleFilter::parse(params.role.as_deref()),
    },
  )
  .await?;
  Ok(HttpResponse::Ok().json(roster))
}

#[instrument(name = "handler::admin_kpis", skip(app_state))]
pub async fn kpis_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let figures = kpis(app_state.store.as_ref(), Utc::now()).await?;
  Ok(HttpResponse::Ok().json(figures))
}

#[instrument(name = "handler::admin_user_growth", skip(app_state))]
pub async fn user_growth_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let growth = user_growth(app_state.store.as_ref(), Utc::now()).await?;
  Ok(HttpResponse::Ok().json(growth))
}

#[derive(Deserialize, Debug, Default)]
pub struct ClickParams {
  pub filter: Option<String>,
}

/// `?filter=<slug>` picks the chart's service; `service_type` is accepted as an alias.
#[derive(Deserialize, Debug, Default)]
pub struct ChartParams {
  pub filter: Option<String>,
  pub service_type: Option<String>,
}

impl ChartParams {
  fn service(&self) -> Option<&str> {
    self.filter.as_deref().or(self.service_type.as_deref())
  }
}

#[instrument(name = "handler::admin_contact_clicks", skip(app_state, query_params))]
pub async fn contact_clicks_handler(
  app_state: web::Data<AppState>,
  query_params: web::Query<ClickParams>,
) -> Result<HttpResponse, AppError> {
  let window = ClickWindow::parse(query_params.filter.as_deref());
  let clicks = contact_clicks(app_state.store.as_ref(), window, Utc::now()).await?;
  Ok(HttpResponse::Ok().json(clicks))
}

#[instrument(name = "handler::admin_contact_clicks_chart", skip(app_state, query_params))]
pub async fn contact_clicks_chart_handler(
  app_state: web::Data<AppState>,
  query_params: web::Query<ChartParams>,
) -> Result<HttpResponse, AppError> {
  let chart = contact_click_chart(app_state.store.as_ref(), query_params.service(), Utc::now()).await?;
  Ok(HttpResponse::Ok().json(chart))
}

#[instrument(name = "handler::admin_monitoring", skip(app_state))]
pub async fn monitoring_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  Ok(HttpResponse::Ok().json(app_state.events.report(Utc::now())))
}
