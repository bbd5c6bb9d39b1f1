// jokko-server/src/web/routes.rs

use actix_web::web;

use crate::state::AppState;
use crate::web::handlers::{admin_handlers, event_handlers, provider_handlers};

async fn health_check_handler(app_state: web::Data<AppState>) -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({
    "status": "ok",
    "connection_schema": app_state.resolver.schema(),
  }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .route("/providers", web::get().to(provider_handlers::list_providers_handler))
      .route("/track-event", web::post().to(event_handlers::track_event_handler))
      // Admin access control lives in the upstream gateway.
      .service(
        web::scope("/admin")
          .route("/providers", web::get().to(admin_handlers::list_providers_handler))
          .route("/providers", web::post().to(admin_handlers::create_provider_handler))
          .route("/providers/{provider_id}", web::patch().to(admin_handlers::update_provider_handler))
          .route("/users", web::get().to(admin_handlers::list_users_handler))
          .route("/kpis", web::get().to(admin_handlers::kpis_handler))
          .route("/user-growth", web::get().to(admin_handlers::user_growth_handler))
          .route("/contact-clicks", web::get().to(admin_handlers::contact_clicks_handler))
          .route("/contact-clicks-chart", web::get().to(admin_handlers::contact_clicks_chart_handler))
          .route("/monitoring", web::get().to(admin_handlers::monitoring_handler)),
      ),
  );
}
