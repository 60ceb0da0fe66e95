use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;

pub type TTSResult<T> = Result<T, TTSError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TTSError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Audio generation failed: {0}")]
    AudioGenerationFailed(String),
}

impl From<reqwest::Error> for TTSError {
    fn from(e: reqwest::Error) -> Self {
        let e = e.without_url();
        if e.is_timeout() {
            TTSError::NetworkError(format!("Request timed out: {e}"))
        } else {
            TTSError::NetworkError(e.to_string())
        }
    }
}

/// Provider-agnostic synthesis settings.
#[derive(Clone)]
pub struct TTSConfig {
    pub api_key: String,
    pub voice_id: Option<String>,
    /// Container/codec name, e.g. "MP3" or "WAV"
    pub audio_format: Option<String>,
    pub sample_rate: Option<u32>,
    pub model: String,
    /// Upper bound for one synthesis request, download included
    pub request_timeout: Duration,
}

impl Default for TTSConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            voice_id: None,
            audio_format: None,
            sample_rate: None,
            model: String::new(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl fmt::Debug for TTSConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TTSConfig")
            .field("api_key", &"[REDACTED]")
            .field("voice_id", &self.voice_id)
            .field("audio_format", &self.audio_format)
            .field("sample_rate", &self.sample_rate)
            .field("model", &self.model)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Encoded audio for one piece of text.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioData {
    pub data: Bytes,
    /// e.g. "mp3", "wav"
    pub format: String,
    pub sample_rate: Option<u32>,
}

impl AudioData {
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Request-response text-to-speech provider.
#[async_trait::async_trait]
pub trait BaseTTS: Send + Sync {
    /// Synthesize `text` into one encoded audio buffer.
    async fn synthesize(&self, text: &str) -> TTSResult<AudioData>;

    fn get_provider_info(&self) -> &'static str;
}
