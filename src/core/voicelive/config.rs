//! Azure Voice Live connection configuration and constants

use url::Url;

use crate::errors::{SessionError, SessionResult};

/// API version appended to the connection URL
pub const VOICELIVE_API_VERSION: &str = "2024-02-15";

/// Fixed sample rate for audio in both directions (PCM16 mono)
pub const VOICELIVE_SAMPLE_RATE: u32 = 24000;

/// Default realtime model
pub const DEFAULT_MODEL: &str = "gpt-4o-realtime-preview";

/// Default voice for generated audio
pub const DEFAULT_VOICE: &str = "alloy";

/// Default assistant instructions
pub const DEFAULT_INSTRUCTIONS: &str = "You are a helpful AI assistant. \
     Respond naturally and conversationally. Keep your responses concise \
     but engaging.";

/// Connection parameters for one session's remote endpoint.
///
/// Values come exclusively from server-held configuration; nothing here is
/// ever accepted from a client.
#[derive(Debug, Clone)]
pub struct VoiceLiveConfig {
    /// Endpoint as configured: a bare host or a full URL
    pub endpoint: String,
    /// API key, sent in the `api-key` handshake header
    pub api_key: String,
    /// Realtime model identifier
    pub model: String,
    /// Voice name
    pub voice: String,
    /// System instructions
    pub instructions: String,
}

impl VoiceLiveConfig {
    /// Build the WebSocket URL for this configuration.
    ///
    /// A bare host gets a `wss://` scheme; `http`/`https` are mapped to
    /// `ws`/`wss` so tests can point the client at a plaintext local server.
    /// The `api-version` and `model` query parameters are appended last.
    pub fn ws_url(&self) -> SessionResult<Url> {
        let trimmed = self.endpoint.trim();
        let with_scheme = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("wss://{trimmed}")
        };

        let mut url = Url::parse(&with_scheme).map_err(|e| {
            SessionError::Configuration(format!(
                "Invalid Voice Live endpoint '{}': {e}",
                self.endpoint
            ))
        })?;

        match url.scheme() {
            "ws" | "wss" => {}
            "http" => {
                let _ = url.set_scheme("ws");
            }
            "https" => {
                let _ = url.set_scheme("wss");
            }
            other => {
                return Err(SessionError::Configuration(format!(
                    "Unsupported Voice Live endpoint scheme '{other}'"
                )));
            }
        }

        url.query_pairs_mut()
            .append_pair("api-version", VOICELIVE_API_VERSION)
            .append_pair("model", &self.model);

        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_endpoint(endpoint: &str) -> VoiceLiveConfig {
        VoiceLiveConfig {
            endpoint: endpoint.to_string(),
            api_key: "test-key".to_string(),
            model: DEFAULT_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
        }
    }

    #[test]
    fn test_ws_url_bare_host_gets_wss() {
        let config = config_with_endpoint("my-resource.cognitiveservices.azure.com");
        let url = config.ws_url().unwrap();

        assert_eq!(url.scheme(), "wss");
        assert_eq!(
            url.host_str(),
            Some("my-resource.cognitiveservices.azure.com")
        );
    }

    #[test]
    fn test_ws_url_appends_api_version_and_model() {
        let config = config_with_endpoint("example.azure.com");
        let url = config.ws_url().unwrap();

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert!(
            pairs.contains(&("api-version".to_string(), VOICELIVE_API_VERSION.to_string()))
        );
        assert!(pairs.contains(&("model".to_string(), DEFAULT_MODEL.to_string())));
    }

    #[test]
    fn test_ws_url_keeps_explicit_ws_scheme() {
        let config = config_with_endpoint("ws://127.0.0.1:9001");
        let url = config.ws_url().unwrap();

        assert_eq!(url.scheme(), "ws");
        assert_eq!(url.port(), Some(9001));
    }

    #[test]
    fn test_ws_url_maps_https_to_wss() {
        let config = config_with_endpoint("https://example.azure.com");
        let url = config.ws_url().unwrap();

        assert_eq!(url.scheme(), "wss");
    }

    #[test]
    fn test_ws_url_rejects_unsupported_scheme() {
        let config = config_with_endpoint("ftp://example.com");
        let err = config.ws_url().unwrap_err();

        assert!(matches!(err, SessionError::Configuration(_)));
    }

    #[test]
    fn test_ws_url_rejects_garbage() {
        let config = config_with_endpoint("not a host name");
        assert!(config.ws_url().is_err());
    }

    #[test]
    fn test_sample_rate_is_24khz() {
        assert_eq!(VOICELIVE_SAMPLE_RATE, 24000);
    }
}
