use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use super::{ServerConfig, TlsConfig};

/// Errors raised while assembling a [`ServerConfig`]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Read a non-empty environment variable
fn env_string(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_parse<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env_string(name) {
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { name, value }),
        None => Ok(None),
    }
}

/// Overlay environment variables onto `config`
pub(super) fn load_from_env(mut config: ServerConfig) -> Result<ServerConfig, ConfigError> {
    if let Some(host) = env_string("HOST") {
        config.host = host;
    }
    if let Some(port) = env_parse::<u16>("PORT")? {
        config.port = port;
    }

    config.tls = match (env_string("TLS_CERT_PATH"), env_string("TLS_KEY_PATH")) {
        (Some(cert), Some(key)) => Some(TlsConfig {
            cert_path: PathBuf::from(cert),
            key_path: PathBuf::from(key),
        }),
        (None, None) => config.tls,
        _ => {
            return Err(ConfigError::Invalid(
                "TLS_CERT_PATH and TLS_KEY_PATH must be set together".to_string(),
            ));
        }
    };

    if let Some(path) = env_string("API_KEYS_PATH") {
        config.secrets_path = PathBuf::from(path);
    }

    let voice = &mut config.voice;
    if let Some(rate) = env_parse::<u32>("STT_SAMPLE_RATE")? {
        voice.stt_sample_rate = rate;
    }
    if let Some(language) = env_string("STT_LANGUAGE") {
        voice.stt_language = language;
    }
    if let Some(model) = env_string("LLM_MODEL") {
        voice.llm_model = model;
    }
    if let Some(voice_id) = env_string("TTS_VOICE_ID") {
        voice.tts_voice_id = voice_id;
    }
    if let Some(format) = env_string("TTS_AUDIO_FORMAT") {
        voice.tts_audio_format = format;
    }
    if let Some(concurrency) = env_parse::<usize>("SYNTHESIS_CONCURRENCY")? {
        voice.synthesis_concurrency = concurrency.max(1);
    }
    if let Some(secs) = env_parse::<u64>("PAGE_FETCH_TIMEOUT_SECONDS")? {
        voice.page_fetch_timeout_seconds = secs;
    }
    if let Some(secs) = env_parse::<u64>("BACKEND_TIMEOUT_SECONDS")? {
        voice.backend_timeout_seconds = secs;
    }
    if let Some(allow) = env_parse::<bool>("ALLOW_PRIVATE_PAGE_FETCH")? {
        voice.allow_private_page_fetch = allow;
    }

    if let Some(origins) = env_string("CORS_ALLOWED_ORIGINS") {
        config.cors_allowed_origins = Some(origins);
    }
    if let Some(rps) = env_parse::<u32>("RATE_LIMIT_REQUESTS_PER_SECOND")? {
        config.rate_limit_requests_per_second = rps;
    }
    if let Some(burst) = env_parse::<u32>("RATE_LIMIT_BURST_SIZE")? {
        config.rate_limit_burst_size = burst;
    }

    Ok(config)
}
