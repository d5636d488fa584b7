// Route path constants - single source of truth for all API paths

use axum::{
    Router,
    routing::{any, get},
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub const ROOT: &str = "/";
pub const SHORT_PATH: &str = "/{*short_path}";
pub const REGISTER: &str = "/api/regist";
pub const HEALTH: &str = "/api/health";
pub const OPENAPI: &str = "/api/openapi.json";

/// Build the service router
///
/// Registration and the operational endpoints match exactly and win over the
/// catch-all short path route. `/` goes straight to the home page.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(REGISTER, any(handlers::register_handler))
        .route(HEALTH, get(handlers::health_handler))
        .route(OPENAPI, get(handlers::openapi_handler))
        .route(ROOT, any(handlers::home_handler))
        .route(SHORT_PATH, any(handlers::redirect_handler))
        .fallback(handlers::home_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
