//! Voice session WebSocket route configuration
//!
//! This module configures the WebSocket endpoint that bridges a browser
//! to an Azure Voice Live realtime session.

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::session::session_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the voice session WebSocket router
///
/// # Endpoint
///
/// `GET /ws` - WebSocket upgrade for a bidirectional voice session
///
/// # Protocol
///
/// After WebSocket upgrade, clients send:
/// - `audio` messages carrying base64 PCM 16-bit, 24kHz, mono microphone
///   audio
/// - `interrupt` to cut off assistant playback
/// - `stop` to end the session
///
/// Server responds with:
/// - `session_ready` when the Voice Live session is configured
/// - `speech_started` / `speech_stopped` as the user talks
/// - `response_started`, `audio`, `response_audio_done`, `response_done`
///   while the assistant answers
/// - `error` on failures
///
/// # Example
///
/// ```json
/// // Client sends microphone audio
/// {"type": "audio", "audio": "<base64 pcm16>"}
///
/// // Server streams back assistant audio
/// {"type": "audio", "audio": "<base64 pcm16>"}
///
/// // Client cuts the assistant off mid-response
/// {"type": "interrupt"}
/// ```
pub fn create_session_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ws", get(session_handler))
        .layer(TraceLayer::new_for_http())
}
