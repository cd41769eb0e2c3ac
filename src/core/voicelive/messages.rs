//! Azure Voice Live WebSocket message types.
//!
//! The service speaks an OpenAI-realtime-style JSON protocol. Only the
//! events the bridge actually relays are modeled; everything else falls
//! into [`ServerEvent::Unknown`] and is skipped.
//!
//! Client events (sent to the service):
//! - session.update - Configure the session (sent once during setup)
//! - input_audio_buffer.append - Append caller audio
//! - response.cancel - Cancel the in-flight response
//!
//! Server events (received from the service):
//! - session.created / session.updated - Session lifecycle
//! - input_audio_buffer.speech_started / speech_stopped - Server-side VAD
//! - response.created - Response generation started
//! - response.audio.delta - Audio chunk (base64 PCM16)
//! - response.audio.done - Audio stream for the response complete
//! - response.done - Response fully complete
//! - error - Error report

use base64::prelude::*;
use serde::{Deserialize, Serialize};

use super::config::VoiceLiveConfig;

// =============================================================================
// Session Configuration
// =============================================================================

/// Session configuration sent inside `session.update`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Output modalities, e.g. `["text", "audio"]`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<String>>,
    /// System instructions for the assistant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    /// Voice for generated audio
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<VoiceConfig>,
    /// Input audio format (always `pcm16` here)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_format: Option<String>,
    /// Output audio format (always `pcm16` here)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_format: Option<String>,
    /// Turn detection configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_detection: Option<TurnDetection>,
}

impl SessionConfig {
    /// The fixed bridge contract: text+audio modalities, PCM16 in both
    /// directions, server-side VAD with the stock thresholds.
    pub fn for_bridge(config: &VoiceLiveConfig) -> Self {
        SessionConfig {
            modalities: Some(vec!["text".to_string(), "audio".to_string()]),
            instructions: Some(config.instructions.clone()),
            voice: Some(VoiceConfig::from_name(&config.voice)),
            input_audio_format: Some("pcm16".to_string()),
            output_audio_format: Some("pcm16".to_string()),
            turn_detection: Some(TurnDetection::default()),
        }
    }
}

/// Voice selector.
///
/// Azure standard voices are addressed by an object carrying the voice
/// type; OpenAI voices by their bare name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum VoiceConfig {
    /// OpenAI voice (alloy, echo, fable, onyx, nova, shimmer)
    Named(String),
    /// Azure standard voice
    Azure {
        /// Locale-qualified voice name, e.g. `en-US-AvaNeural`
        name: String,
        /// Always `azure-standard`
        #[serde(rename = "type")]
        voice_type: String,
    },
}

impl VoiceConfig {
    /// Classify a configured voice name. Azure standard voices carry
    /// locale-qualified names containing `-`; bare names are OpenAI voices.
    pub fn from_name(name: &str) -> Self {
        if name.contains('-') {
            VoiceConfig::Azure {
                name: name.to_string(),
                voice_type: "azure-standard".to_string(),
            }
        } else {
            VoiceConfig::Named(name.to_string())
        }
    }
}

/// Turn detection mode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum TurnDetection {
    /// Server-side voice activity detection
    #[serde(rename = "server_vad")]
    ServerVad {
        /// Activation threshold (0.0 - 1.0)
        threshold: f32,
        /// Audio included before detected speech (ms)
        prefix_padding_ms: u32,
        /// Silence required to end a turn (ms)
        silence_duration_ms: u32,
    },
}

impl Default for TurnDetection {
    fn default() -> Self {
        TurnDetection::ServerVad {
            threshold: 0.5,
            prefix_padding_ms: 300,
            silence_duration_ms: 500,
        }
    }
}

// =============================================================================
// Client Events (sent to the service)
// =============================================================================

/// Client events sent to the Voice Live service.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Configure the session
    #[serde(rename = "session.update")]
    SessionUpdate {
        /// Session configuration
        session: SessionConfig,
    },

    /// Append audio to the input buffer
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend {
        /// Audio content (base64 encoded PCM16)
        audio: String,
    },

    /// Cancel the current response
    #[serde(rename = "response.cancel")]
    ResponseCancel,
}

impl ClientEvent {
    /// Create an audio append event from raw PCM bytes.
    pub fn audio_append(data: &[u8]) -> Self {
        ClientEvent::InputAudioBufferAppend {
            audio: BASE64_STANDARD.encode(data),
        }
    }
}

// =============================================================================
// Server Events (received from the service)
// =============================================================================

/// Server events received from the Voice Live service.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Error report
    #[serde(rename = "error")]
    Error {
        /// Error information
        error: ApiError,
    },

    /// Session created (precedes the configuration ack)
    #[serde(rename = "session.created")]
    SessionCreated {
        /// Session information
        session: SessionInfo,
    },

    /// Session configuration acknowledged
    #[serde(rename = "session.updated")]
    SessionUpdated {
        /// Session information
        session: SessionInfo,
    },

    /// Server VAD detected the start of user speech
    #[serde(rename = "input_audio_buffer.speech_started")]
    SpeechStarted {
        /// Milliseconds into the audio buffer
        #[serde(default)]
        audio_start_ms: Option<u64>,
    },

    /// Server VAD detected the end of user speech
    #[serde(rename = "input_audio_buffer.speech_stopped")]
    SpeechStopped {
        /// Milliseconds into the audio buffer
        #[serde(default)]
        audio_end_ms: Option<u64>,
    },

    /// Response generation started
    #[serde(rename = "response.created")]
    ResponseCreated {
        /// Response information
        #[serde(default)]
        response: Option<ResponseInfo>,
    },

    /// Audio chunk of the response
    #[serde(rename = "response.audio.delta")]
    AudioDelta {
        /// Audio content (base64 encoded PCM16)
        delta: String,
        /// Response this chunk belongs to
        #[serde(default)]
        response_id: Option<String>,
    },

    /// Audio stream for the response complete
    #[serde(rename = "response.audio.done")]
    AudioDone {
        /// Response the stream belonged to
        #[serde(default)]
        response_id: Option<String>,
    },

    /// Response fully complete (also acknowledges a cancellation)
    #[serde(rename = "response.done")]
    ResponseDone {
        /// Response information
        #[serde(default)]
        response: Option<ResponseInfo>,
    },

    /// Any event type the bridge does not relay
    #[serde(other)]
    Unknown,
}

impl ServerEvent {
    /// Decode base64 audio from an AudioDelta event.
    pub fn decode_audio_delta(delta: &str) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64_STANDARD.decode(delta)
    }
}

// =============================================================================
// Supporting Types
// =============================================================================

/// Error information attached to an `error` event.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    /// Error type
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    /// Error code
    #[serde(default)]
    pub code: Option<String>,
    /// Human-readable message
    pub message: String,
}

/// Session information attached to session lifecycle events.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionInfo {
    /// Remote-assigned session identifier
    pub id: String,
    /// Model serving the session
    #[serde(default)]
    pub model: Option<String>,
}

/// Response information attached to response lifecycle events.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseInfo {
    /// Response identifier
    #[serde(default)]
    pub id: Option<String>,
    /// Terminal status (`completed`, `cancelled`, `failed`, ...)
    #[serde(default)]
    pub status: Option<String>,
}
