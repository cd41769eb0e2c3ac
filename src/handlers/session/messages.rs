//! Browser-facing WebSocket message types.
//!
//! This is the envelope protocol one page speaks to its bridge session. It
//! deliberately exposes none of the remote protocol's surface: the browser
//! can send audio, barge in, or stop, and everything else is narrated to it
//! as simple lifecycle events.

use serde::{Deserialize, Serialize};

/// Maximum allowed size for one base64 audio payload (8 MB)
pub const MAX_AUDIO_PAYLOAD_SIZE: usize = 8 * 1024 * 1024;

// =============================================================================
// Incoming Messages (Browser -> Bridge)
// =============================================================================

/// Incoming WebSocket messages from the browser
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum SessionIncomingMessage {
    /// Caller audio chunk (base64 encoded PCM16)
    #[serde(rename = "audio")]
    Audio {
        /// Audio content (base64 encoded PCM16)
        audio: String,
    },

    /// Caller barge-in over assistant playback
    #[serde(rename = "interrupt")]
    Interrupt,

    /// End the session cleanly
    #[serde(rename = "stop")]
    Stop,

    /// Any message type the bridge does not know; ignored
    #[serde(other)]
    Unknown,
}

// =============================================================================
// Outgoing Messages (Bridge -> Browser)
// =============================================================================

/// Outgoing WebSocket messages to the browser
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum SessionOutgoingMessage {
    /// Session configured and ready for audio
    #[serde(rename = "session_ready")]
    SessionReady {
        /// Remote-assigned session identifier
        session_id: String,
    },

    /// Caller speech detected
    #[serde(rename = "speech_started")]
    SpeechStarted,

    /// Caller speech ended
    #[serde(rename = "speech_stopped")]
    SpeechStopped,

    /// Assistant response generation started
    #[serde(rename = "response_started")]
    ResponseStarted,

    /// Assistant audio chunk (base64 encoded PCM16)
    #[serde(rename = "audio")]
    Audio {
        /// Audio content (base64 encoded PCM16)
        audio: String,
    },

    /// Audio stream for the current response complete
    #[serde(rename = "response_audio_done")]
    ResponseAudioDone,

    /// Assistant response fully complete
    #[serde(rename = "response_done")]
    ResponseDone,

    /// Error message
    #[serde(rename = "error")]
    Error {
        /// Error code (optional)
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        /// Error message
        message: String,
    },
}

// =============================================================================
// Message Routing
// =============================================================================

/// Messages routed through the browser sender task
pub enum SessionMessageRoute {
    /// JSON text message
    Outgoing(SessionOutgoingMessage),
    /// Close connection
    Close,
}

// =============================================================================
// Validation
// =============================================================================

/// Error type for message validation failures
#[derive(Debug, Clone)]
pub enum SessionValidationError {
    /// Audio payload exceeds maximum allowed size
    AudioTooLarge { size: usize, max: usize },
}

impl std::fmt::Display for SessionValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AudioTooLarge { size, max } => {
                write!(
                    f,
                    "Audio payload too large: {} bytes (max: {} bytes)",
                    size, max
                )
            }
        }
    }
}

impl std::error::Error for SessionValidationError {}

impl SessionIncomingMessage {
    /// Validates message field sizes to prevent resource exhaustion attacks.
    pub fn validate_size(&self) -> Result<(), SessionValidationError> {
        match self {
            SessionIncomingMessage::Audio { audio } => {
                let size = audio.len();
                if size > MAX_AUDIO_PAYLOAD_SIZE {
                    return Err(SessionValidationError::AudioTooLarge {
                        size,
                        max: MAX_AUDIO_PAYLOAD_SIZE,
                    });
                }
            }
            SessionIncomingMessage::Interrupt
            | SessionIncomingMessage::Stop
            | SessionIncomingMessage::Unknown => {}
        }
        Ok(())
    }
}
