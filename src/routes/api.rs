use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::api;
use crate::state::AppState;
use std::sync::Arc;

/// Create the API key management router
///
/// Rate limiting and CORS are applied in main.rs over the merged router.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/save_api_keys", post(api::save_api_keys))
        .route("/validate_api_keys", get(api::validate_api_keys))
        .layer(TraceLayer::new_for_http())
}

/// Health check, outside the rate limiter
pub fn create_public_router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(api::health_check))
}
