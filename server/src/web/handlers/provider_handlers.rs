// jokko-server/src/web/handlers/provider_handlers.rs

use actix_web::{web, HttpResponse};
use jokko::ProviderQuery;
use serde::Deserialize;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::identity::CallerIdentity;

#[derive(Deserialize, Debug, Default)]
pub struct ListProvidersQuery {
  pub q: Option<String>,
  pub service: Option<String>,
  pub city: Option<String>,
  pub page: Option<String>,
}

#[instrument(
  name = "handler::list_providers",
  skip(app_state, query_params, caller),
  fields(guest = caller.is_guest())
)]
pub async fn list_providers_handler(
  app_state: web::Data<AppState>,
  query_params: web::Query<ListProvidersQuery>,
  caller: CallerIdentity,
) -> Result<HttpResponse, AppError> {
  let params = query_params.into_inner();
  let query = ProviderQuery::from_params(
    params.q.as_deref(),
    params.service.as_deref(),
    params.city.as_deref(),
    params.page.as_deref(),
  );

  let page = app_state.listing.list(query, caller.user_id()).await?;
  info!(items = page.items.len(), has_more = page.has_more, "Provider page served.");

  Ok(HttpResponse::Ok().json(page))
}
