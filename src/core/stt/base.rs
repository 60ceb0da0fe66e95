use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;

/// Errors raised by streaming transcription providers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum STTError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid audio format: {0}")]
    InvalidAudioFormat(String),

    #[error("Provider error: {0}")]
    ProviderError(String),
}

/// Lifecycle of one streaming transcription session.
///
/// ```text
/// Idle -> Connecting -> Connected -> Closed
///              \            \
///               +--> Failed(reason)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum STTConnectionState {
    Idle,
    Connecting,
    Connected,
    Closed,
    Failed(String),
}

impl STTConnectionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Failed(_))
    }
}

/// Provider-agnostic session settings.
#[derive(Clone)]
pub struct STTConfig {
    pub api_key: String,
    /// Language hint (e.g. "en", "en-US", "fr")
    pub language: String,
    /// Sample rate of the incoming PCM audio in Hz
    pub sample_rate: u32,
    pub channels: u16,
    /// Audio encoding name (e.g. "linear16", "pcm_s16le", "mulaw")
    pub encoding: String,
    /// Provider model name; empty selects the provider default
    pub model: String,
}

impl Default for STTConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            language: "en".to_string(),
            sample_rate: 16000,
            channels: 1,
            encoding: "linear16".to_string(),
            model: String::new(),
        }
    }
}

impl fmt::Debug for STTConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("STTConfig")
            .field("api_key", &"[REDACTED]")
            .field("language", &self.language)
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("encoding", &self.encoding)
            .field("model", &self.model)
            .finish()
    }
}

/// A finalized transcript delivered by a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct STTResult {
    pub transcript: String,
    pub is_final: bool,
    pub confidence: f32,
}

impl STTResult {
    pub fn new(transcript: impl Into<String>, is_final: bool, confidence: f32) -> Self {
        Self {
            transcript: transcript.into(),
            is_final,
            confidence,
        }
    }
}

pub type STTResultCallback =
    Arc<dyn Fn(STTResult) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub type STTErrorCallback =
    Arc<dyn Fn(STTError) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Common interface of streaming speech-to-text providers.
///
/// A provider owns one remote session. Results are pushed to the registered
/// result callback from the provider's own I/O task, asynchronously with
/// respect to [`send_audio`](BaseSTT::send_audio).
#[async_trait::async_trait]
pub trait BaseSTT: Send + Sync {
    fn new(config: STTConfig) -> Result<Self, STTError>
    where
        Self: Sized;

    /// Open the remote session. Resolves once the provider accepted it.
    async fn connect(&mut self) -> Result<(), STTError>;

    /// Close the remote session. Calling it again is a no-op.
    async fn disconnect(&mut self) -> Result<(), STTError>;

    fn is_ready(&self) -> bool;

    fn connection_state(&self) -> STTConnectionState;

    /// Forward one chunk of caller audio. Only valid while connected; once the
    /// session failed the recorded failure is returned.
    async fn send_audio(&mut self, audio_data: Bytes) -> Result<(), STTError>;

    async fn on_result(&mut self, callback: STTResultCallback) -> Result<(), STTError>;

    async fn on_error(&mut self, callback: STTErrorCallback) -> Result<(), STTError>;

    fn get_config(&self) -> Option<&STTConfig>;

    fn get_provider_info(&self) -> &'static str;
}
