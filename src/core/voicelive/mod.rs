//! Azure Voice Live integration.
//!
//! This module owns everything that touches the Voice Live service: the
//! connection URL and session defaults, the JSON wire protocol, and the
//! WebSocket client that one bridge session holds for its lifetime.
//!
//! # Audio Format
//!
//! Both directions carry PCM 16-bit signed little-endian mono at 24kHz,
//! base64 encoded inside JSON events.
//!
//! # Example
//!
//! ```rust,ignore
//! use voicelive_bridge::core::voicelive::{self, VoiceLiveConfig};
//!
//! let config = VoiceLiveConfig {
//!     endpoint: "my-resource.cognitiveservices.azure.com".to_string(),
//!     api_key: "...".to_string(),
//!     model: voicelive::DEFAULT_MODEL.to_string(),
//!     voice: voicelive::DEFAULT_VOICE.to_string(),
//!     instructions: voicelive::DEFAULT_INSTRUCTIONS.to_string(),
//! };
//!
//! let (handle, mut events) = voicelive::connect(&config).await?;
//! handle.configure(&config).await?;
//! while let Some(event) = events.recv().await {
//!     // relay to the browser
//! }
//! ```

mod client;
mod config;
mod messages;

pub use client::{VoiceLiveHandle, connect};
pub use config::{
    DEFAULT_INSTRUCTIONS, DEFAULT_MODEL, DEFAULT_VOICE, VOICELIVE_API_VERSION,
    VOICELIVE_SAMPLE_RATE, VoiceLiveConfig,
};
pub use messages::{
    ApiError, ClientEvent, ResponseInfo, ServerEvent, SessionConfig, SessionInfo, TurnDetection,
    VoiceConfig,
};
