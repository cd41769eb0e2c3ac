//! HTTP API handlers

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::Html;
use serde_json::{Value, json};

use crate::state::AppState;

/// Serve the built-in browser client for manual testing.
pub async fn index() -> Html<&'static str> {
    Html(include_str!("../../assets/index.html"))
}

/// Health check with the current live-session count.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "voicelive-bridge",
        "active_sessions": state.sessions.len(),
    }))
}
