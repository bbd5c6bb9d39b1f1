// jokko-server/src/web/handlers/mod.rs

pub mod admin_handlers;
pub mod event_handlers;
pub mod provider_handlers;
