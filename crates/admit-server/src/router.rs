use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Default request body limit when none is configured.
pub const DEFAULT_BODY_LIMIT: usize = 8 * 1024 * 1024;

/// Build the axum router with all Admit endpoints.
pub fn build_router(state: AppState) -> Router {
    build_router_with_limit(state, DEFAULT_BODY_LIMIT)
}

pub fn build_router_with_limit(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/info", get(handler::info_handler))
        .route("/v1/activate", post(handler::activate_handler))
        .route("/v1/verify", post(handler::verify_handler))
        .route("/v1/confirm", post(handler::confirm_handler))
        .route("/v1/import", post(handler::import_handler))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
