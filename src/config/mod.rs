//! Configuration module for the Parley gateway
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! Provider API keys are deliberately *not* part of [`ServerConfig`]. They live in the
//! [`CredentialStore`](crate::credentials::CredentialStore), which can be rewritten and
//! reloaded at runtime without restarting the server.
//!
//! # Modules
//! - `env`: Environment variable loading
//! - `yaml`: YAML configuration file loading
//!
//! # Example
//! ```rust,no_run
//! use parley_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

mod env;
mod yaml;

pub use env::ConfigError;

/// Default path of the persisted API key bundle
pub const DEFAULT_SECRETS_PATH: &str = "api_keys.json";

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Voice pipeline settings shared by every connection
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceConfig {
    /// Sample rate of the PCM audio callers stream in (Hz)
    pub stt_sample_rate: u32,
    /// Language hint for the transcription model
    pub stt_language: String,
    /// Conversational model name
    pub llm_model: String,
    /// Speech synthesis voice
    pub tts_voice_id: String,
    /// Speech synthesis container format (MP3, WAV, ...)
    pub tts_audio_format: String,
    /// How many sentences may be synthesized ahead of the one being sent.
    /// 1 means strictly sequential synthesis.
    pub synthesis_concurrency: usize,
    /// Upper bound for a single webpage fetch
    pub page_fetch_timeout_seconds: u64,
    /// Upper bound for model, search and synthesis requests
    pub backend_timeout_seconds: u64,
    /// Let URL summaries fetch loopback and private-network pages
    pub allow_private_page_fetch: bool,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            stt_sample_rate: 16000,
            stt_language: "en".to_string(),
            llm_model: "gemini-1.5-flash".to_string(),
            tts_voice_id: "en-US-natalie".to_string(),
            tts_audio_format: "MP3".to_string(),
            synthesis_concurrency: 1,
            page_fetch_timeout_seconds: 10,
            backend_timeout_seconds: 30,
            allow_private_page_fetch: false,
        }
    }
}

impl VoiceConfig {
    pub fn page_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.page_fetch_timeout_seconds)
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_timeout_seconds)
    }
}

/// Server configuration
///
/// Contains all configuration needed to run the gateway:
/// - Server settings (host, port, TLS)
/// - Location of the API key bundle
/// - Voice pipeline settings
/// - Security settings (CORS, rate limiting)
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    /// Where `POST /save_api_keys` persists the key bundle and where the
    /// credential store looks first on (re)load
    pub secrets_path: PathBuf,

    pub voice: VoiceConfig,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: None (CORS disabled, same-origin only)
    pub cors_allowed_origins: Option<String>,

    // Rate limiting configuration
    /// Maximum requests per second per IP address
    /// Default: 60
    pub rate_limit_requests_per_second: u32,
    /// Maximum burst size for rate limiting
    /// Default: 10
    pub rate_limit_burst_size: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            tls: None,
            secrets_path: PathBuf::from(DEFAULT_SECRETS_PATH),
            voice: VoiceConfig::default(),
            cors_allowed_origins: None,
            rate_limit_requests_per_second: 60,
            rate_limit_burst_size: 10,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables (and defaults)
    ///
    /// The `.env` file is loaded in `main.rs` before this is called, so its
    /// values are visible here as ordinary environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = env::load_from_env(Self::default())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;

        let base = env::load_from_env(Self::default())?;
        let config = yaml_config.apply(base);

        config.validate()?;
        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.voice.stt_sample_rate == 0 {
            return Err(ConfigError::Invalid(
                "STT sample rate must be greater than zero".to_string(),
            ));
        }
        if self.voice.page_fetch_timeout_seconds == 0 || self.voice.backend_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "Backend timeouts must be at least one second".to_string(),
            ));
        }
        if let Some(tls) = &self.tls {
            if tls.cert_path.as_os_str().is_empty() || tls.key_path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(
                    "TLS requires both a certificate path and a key path".to_string(),
                ));
            }
        }
        Ok(())
    }
}
