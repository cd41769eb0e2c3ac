use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::api;
use crate::state::AppState;
use std::sync::Arc;

/// Create the HTTP API router
///
/// # Endpoints
///
/// - `GET /` - Built-in browser client for manual testing
/// - `GET /health` - Health check with the live-session count
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(api::index))
        .route("/health", get(api::health_check))
        .layer(TraceLayer::new_for_http())
}
