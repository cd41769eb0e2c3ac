//! Server configuration
//!
//! Configuration values are resolved with the following precedence:
//! YAML file (when `--config` is given) > environment variables > `.env`
//! file (loaded by `main` before anything reads the environment) > built-in
//! defaults. The Voice Live API key is held server-side only and zeroized
//! on drop; it is never taken from, or echoed to, a client.

pub mod yaml;

use std::env;
use std::path::PathBuf;

use zeroize::Zeroize;

use crate::core::voicelive::{
    DEFAULT_INSTRUCTIONS, DEFAULT_MODEL, DEFAULT_VOICE, VoiceLiveConfig,
};
use crate::errors::{SessionError, SessionResult};
use yaml::YamlConfig;

/// Default bind host
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default bind port
pub const DEFAULT_PORT: u16 = 8080;

/// Runtime configuration for the bridge server
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Azure Voice Live endpoint (bare host or full URL)
    pub voicelive_endpoint: Option<String>,
    /// Azure Voice Live API key (zeroized on drop)
    pub voicelive_api_key: Option<String>,
    /// Realtime model identifier
    pub model: String,
    /// Voice name for generated audio
    pub voice: String,
    /// System instructions for the assistant
    pub instructions: String,
    /// CORS allowed origins (comma-separated list, "*", or unset for
    /// same-origin only)
    pub cors_allowed_origins: Option<String>,
}

impl Drop for BridgeConfig {
    fn drop(&mut self) {
        if let Some(ref mut key) = self.voicelive_api_key {
            key.zeroize();
        }
    }
}

impl BridgeConfig {
    /// Load configuration from environment variables, applying defaults for
    /// anything unset. Empty-string values are treated as unset, matching
    /// how `.env` templates ship placeholder lines.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let host = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| DEFAULT_PORT.to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT value: {e}"))?;

        let config = Self {
            host,
            port,
            voicelive_endpoint: env::var("AZURE_VOICELIVE_ENDPOINT")
                .ok()
                .filter(|v| !v.is_empty()),
            voicelive_api_key: env::var("AZURE_VOICELIVE_API_KEY")
                .ok()
                .filter(|v| !v.is_empty()),
            model: env::var("VOICELIVE_MODEL")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            voice: env::var("VOICELIVE_VOICE")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_VOICE.to_string()),
            instructions: env::var("VOICELIVE_INSTRUCTIONS")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_INSTRUCTIONS.to_string()),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .ok()
                .filter(|v| !v.is_empty()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file layered over the environment.
    /// File values override environment values.
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = Self::from_env()?;
        let yaml = YamlConfig::from_file(path)?;

        if let Some(server) = yaml.server {
            if let Some(host) = server.host {
                config.host = host;
            }
            if let Some(port) = server.port {
                config.port = port;
            }
        }

        if let Some(voicelive) = yaml.voicelive {
            if let Some(endpoint) = voicelive.endpoint {
                config.voicelive_endpoint = Some(endpoint);
            }
            if let Some(api_key) = voicelive.api_key {
                config.voicelive_api_key = Some(api_key);
            }
            if let Some(model) = voicelive.model {
                config.model = model;
            }
            if let Some(voice) = voicelive.voice {
                config.voice = voice;
            }
            if let Some(instructions) = voicelive.instructions {
                config.instructions = instructions;
            }
        }

        if let Some(security) = yaml.security {
            if let Some(origins) = security.cors_allowed_origins {
                config.cors_allowed_origins = Some(origins);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Basic structural validation of the loaded configuration
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.host.is_empty() {
            return Err("Host cannot be empty".into());
        }
        if self.model.is_empty() {
            return Err("Model cannot be empty".into());
        }
        if self.voice.is_empty() {
            return Err("Voice cannot be empty".into());
        }
        Ok(())
    }

    /// Server bind address as `host:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether both Voice Live credentials are present
    pub fn has_credentials(&self) -> bool {
        self.voicelive_endpoint.is_some() && self.voicelive_api_key.is_some()
    }

    /// Extract the per-session Voice Live configuration, failing closed when
    /// either credential is missing.
    pub fn voicelive(&self) -> SessionResult<VoiceLiveConfig> {
        let (Some(endpoint), Some(api_key)) =
            (self.voicelive_endpoint.clone(), self.voicelive_api_key.clone())
        else {
            return Err(SessionError::Configuration(
                "Server not configured. Missing Azure credentials.".to_string(),
            ));
        };

        Ok(VoiceLiveConfig {
            endpoint,
            api_key,
            model: self.model.clone(),
            voice: self.voice.clone(),
            instructions: self.instructions.clone(),
        })
    }
}
