//! Per-connection backend construction.
//!
//! Every voice session builds its clients from the credential snapshot taken
//! when the session starts, so a key saved through the HTTP API applies to
//! the next connection without touching sessions already running.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::config::VoiceConfig;
use crate::core::llm::{GeminiClient, GeminiConfig, LLMError};
use crate::core::router::ResponseRouter;
use crate::core::search::{SearchError, SerpApiClient, SerpApiConfig};
use crate::core::stt::{AssemblyAISTT, BaseSTT, STTConfig, STTError};
use crate::core::tts::{MurfTTS, SpeechSynthesizer, TTSConfig, TTSError};
use crate::core::web::{FetchConfig, HttpPageFetcher};
use crate::credentials::{SecretName, SecretSet};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Missing API key {0}")]
    MissingSecret(SecretName),

    #[error("Transcription setup failed: {0}")]
    Transcription(#[from] STTError),

    #[error("Language model setup failed: {0}")]
    Model(#[from] LLMError),

    #[error("Search setup failed: {0}")]
    Search(#[from] SearchError),

    #[error("Speech synthesis setup failed: {0}")]
    Synthesis(#[from] TTSError),

    #[error("HTTP client setup failed: {0}")]
    HttpClient(String),
}

/// Backends owned by one voice connection.
pub struct VoiceSession {
    /// Not yet connected
    pub transcriber: Box<dyn BaseSTT>,
    pub router: ResponseRouter,
    pub synthesizer: SpeechSynthesizer,
}

/// Builds the backends of a voice session.
pub trait VoiceServices: Send + Sync {
    fn build_session(
        &self,
        secrets: &SecretSet,
        voice: &VoiceConfig,
    ) -> Result<VoiceSession, ServiceError>;
}

/// Production backends: AssemblyAI, Gemini, SerpAPI, Murf and HTTP page
/// fetching, all HTTP traffic going through one pooled client.
#[derive(Clone)]
pub struct ProviderServices {
    http: reqwest::Client,
}

impl ProviderServices {
    pub fn new() -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .use_rustls_tls()
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ServiceError::HttpClient(e.to_string()))?;
        Ok(Self { http })
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

fn required(secrets: &SecretSet, name: SecretName) -> Result<String, ServiceError> {
    secrets
        .get(name)
        .map(str::to_string)
        .ok_or(ServiceError::MissingSecret(name))
}

impl VoiceServices for ProviderServices {
    fn build_session(
        &self,
        secrets: &SecretSet,
        voice: &VoiceConfig,
    ) -> Result<VoiceSession, ServiceError> {
        let transcriber = AssemblyAISTT::new(STTConfig {
            api_key: required(secrets, SecretName::SpeechToText)?,
            language: voice.stt_language.clone(),
            sample_rate: voice.stt_sample_rate,
            channels: 1,
            encoding: "pcm_s16le".to_string(),
            model: String::new(),
        })?;

        let mut gemini = GeminiConfig::new(required(secrets, SecretName::LanguageModel)?);
        gemini.model = voice.llm_model.clone();
        gemini.request_timeout = voice.backend_timeout();
        let model = GeminiClient::new(self.http.clone(), gemini)?;

        let mut serp = SerpApiConfig::new(required(secrets, SecretName::Search)?);
        serp.request_timeout = voice.backend_timeout();
        let search = SerpApiClient::new(self.http.clone(), serp)?;

        let fetcher = HttpPageFetcher::new(
            self.http.clone(),
            FetchConfig {
                timeout: voice.page_fetch_timeout(),
                allow_private_addresses: voice.allow_private_page_fetch,
                ..FetchConfig::default()
            },
        );

        let tts = MurfTTS::new(
            self.http.clone(),
            TTSConfig {
                api_key: required(secrets, SecretName::SpeechSynthesis)?,
                voice_id: Some(voice.tts_voice_id.clone()),
                audio_format: Some(voice.tts_audio_format.clone()),
                request_timeout: voice.backend_timeout(),
                ..TTSConfig::default()
            },
        )?;

        debug!(
            model = %voice.llm_model,
            voice = %voice.tts_voice_id,
            "Built voice session backends"
        );

        Ok(VoiceSession {
            transcriber: Box::new(transcriber),
            router: ResponseRouter::new(Arc::new(model), Arc::new(search), Arc::new(fetcher)),
            synthesizer: SpeechSynthesizer::new(Arc::new(tts)),
        })
    }
}
