use serde::Deserialize;
use std::path::PathBuf;

/// YAML configuration file structure
///
/// All fields are optional so a file can override any subset of the
/// environment-derived configuration. YAML values take precedence over
/// environment variables.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 8080
///
/// voicelive:
///   endpoint: "my-resource.cognitiveservices.azure.com"
///   api_key: "your-azure-key"
///   model: "gpt-4o-realtime-preview"
///   voice: "en-US-AvaNeural"
///   instructions: "You are a terse assistant."
///
/// security:
///   cors_allowed_origins: "https://example.com,https://app.example.com"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub voicelive: Option<VoiceLiveYaml>,
    pub security: Option<SecurityYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Azure Voice Live configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct VoiceLiveYaml {
    /// Azure Voice Live endpoint, either a bare host
    /// (`my-resource.cognitiveservices.azure.com`) or a full `wss://` URL
    pub endpoint: Option<String>,
    /// Azure Voice Live API key
    /// (Azure Portal → AI Services resource → Keys and Endpoint)
    pub api_key: Option<String>,
    /// Realtime model identifier
    pub model: Option<String>,
    /// Voice name; names containing `-` are Azure standard voices,
    /// plain names (alloy, echo, ...) are OpenAI voices
    pub voice: Option<String>,
    /// System instructions for the assistant
    pub instructions: Option<String>,
}

/// Security configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    /// CORS allowed origins (comma-separated list or "*" for all)
    pub cors_allowed_origins: Option<String>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the YAML is malformed.
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}
