use serde::Deserialize;
use std::path::PathBuf;

use super::{ConfigError, ServerConfig, TlsConfig};

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present in
/// the file override whatever the environment provided.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 8000
///   tls:
///     cert_path: "/etc/parley/cert.pem"
///     key_path: "/etc/parley/key.pem"
///
/// credentials:
///   path: "/var/lib/parley/api_keys.json"
///
/// voice:
///   stt_sample_rate: 16000
///   stt_language: "en"
///   llm_model: "gemini-1.5-flash"
///   tts_voice_id: "en-US-natalie"
///   tts_audio_format: "MP3"
///   synthesis_concurrency: 1
///   page_fetch_timeout_seconds: 10
///   backend_timeout_seconds: 30
///   allow_private_page_fetch: false
///
/// security:
///   cors_allowed_origins: "https://app.example.com"
///   rate_limit_requests_per_second: 60
///   rate_limit_burst_size: 10
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub credentials: Option<CredentialsYaml>,
    pub voice: Option<VoiceYaml>,
    pub security: Option<SecurityYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls: Option<TlsYaml>,
}

/// TLS configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

/// Credential bundle location from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CredentialsYaml {
    pub path: Option<String>,
}

/// Voice pipeline settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct VoiceYaml {
    pub stt_sample_rate: Option<u32>,
    pub stt_language: Option<String>,
    pub llm_model: Option<String>,
    pub tts_voice_id: Option<String>,
    pub tts_audio_format: Option<String>,
    pub synthesis_concurrency: Option<usize>,
    pub page_fetch_timeout_seconds: Option<u64>,
    pub backend_timeout_seconds: Option<u64>,
    pub allow_private_page_fetch: Option<bool>,
}

/// Security settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    pub cors_allowed_origins: Option<String>,
    pub rate_limit_requests_per_second: Option<u32>,
    pub rate_limit_burst_size: Option<u32>,
}

impl YamlConfig {
    /// Load YAML configuration from a file
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;

        let config: YamlConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Apply every value present in the file on top of `config`
    pub fn apply(self, mut config: ServerConfig) -> ServerConfig {
        if let Some(server) = self.server {
            if let Some(host) = server.host {
                config.host = host;
            }
            if let Some(port) = server.port {
                config.port = port;
            }
            if let Some(TlsYaml {
                cert_path: Some(cert),
                key_path: Some(key),
            }) = server.tls
            {
                config.tls = Some(TlsConfig {
                    cert_path: PathBuf::from(cert),
                    key_path: PathBuf::from(key),
                });
            }
        }

        if let Some(path) = self.credentials.and_then(|c| c.path) {
            config.secrets_path = PathBuf::from(path);
        }

        if let Some(voice) = self.voice {
            let target = &mut config.voice;
            if let Some(rate) = voice.stt_sample_rate {
                target.stt_sample_rate = rate;
            }
            if let Some(language) = voice.stt_language {
                target.stt_language = language;
            }
            if let Some(model) = voice.llm_model {
                target.llm_model = model;
            }
            if let Some(voice_id) = voice.tts_voice_id {
                target.tts_voice_id = voice_id;
            }
            if let Some(format) = voice.tts_audio_format {
                target.tts_audio_format = format;
            }
            if let Some(concurrency) = voice.synthesis_concurrency {
                target.synthesis_concurrency = concurrency.max(1);
            }
            if let Some(secs) = voice.page_fetch_timeout_seconds {
                target.page_fetch_timeout_seconds = secs;
            }
            if let Some(secs) = voice.backend_timeout_seconds {
                target.backend_timeout_seconds = secs;
            }
            if let Some(allow) = voice.allow_private_page_fetch {
                target.allow_private_page_fetch = allow;
            }
        }

        if let Some(security) = self.security {
            if let Some(origins) = security.cors_allowed_origins {
                config.cors_allowed_origins = Some(origins);
            }
            if let Some(rps) = security.rate_limit_requests_per_second {
                config.rate_limit_requests_per_second = rps;
            }
            if let Some(burst) = security.rate_limit_burst_size {
                config.rate_limit_burst_size = burst;
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_keeps_base_values() {
        let yaml: YamlConfig = serde_yaml::from_str("server:\n  port: 9000\n").unwrap();
        let config = yaml.apply(ServerConfig::default());

        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.voice.llm_model, "gemini-1.5-flash");
    }

    #[test]
    fn test_incomplete_tls_is_ignored() {
        let yaml: YamlConfig =
            serde_yaml::from_str("server:\n  tls:\n    cert_path: \"/c.pem\"\n").unwrap();
        let config = yaml.apply(ServerConfig::default());

        assert!(config.tls.is_none());
    }

    #[test]
    fn test_empty_document() {
        let yaml: YamlConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(yaml.apply(ServerConfig::default()), ServerConfig::default());
    }
}
