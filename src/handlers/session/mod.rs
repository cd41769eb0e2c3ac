//! Voice session WebSocket handlers
//!
//! This module provides the WebSocket handler that bridges a browser to the
//! Azure Voice Live realtime endpoint, one session per connection.
//!
//! # Protocol
//!
//! The envelope protocol is deliberately small; everything provider-shaped
//! stays on the server side.
//!
//! ## Client → Server
//!
//! - **audio**: Caller audio chunk (base64 PCM 16-bit, 24kHz, mono)
//! - **interrupt**: Barge in over assistant playback
//! - **stop**: End the session
//!
//! ## Server → Client
//!
//! - **session_ready**: Session configured, audio may flow
//! - **speech_started** / **speech_stopped**: Server VAD events
//! - **response_started**: Assistant response generation started
//! - **audio**: Assistant audio chunk (base64 PCM 16-bit, 24kHz, mono)
//! - **response_audio_done**: Audio stream for the response complete
//! - **response_done**: Response fully complete
//! - **error**: Error message

mod handler;
pub mod messages;

pub use handler::session_handler;
