//! Murf TTS provider.
//!
//! # API Reference
//!
//! - Endpoint: `POST https://api.murf.ai/v1/speech/generate`
//! - Auth: `api-key` header
//! - With `encodeAsBase64` the audio comes back inline in `encodedAudio`;
//!   otherwise only an `audioFile` URL is returned and has to be downloaded.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::config::MurfTTSConfig;
use crate::core::tts::base::{AudioData, BaseTTS, TTSConfig, TTSError, TTSResult};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    voice_id: &'a str,
    text: &'a str,
    format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sample_rate: Option<u32>,
    model_version: &'a str,
    encode_as_base64: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    encoded_audio: Option<String>,
    #[serde(default)]
    audio_file: Option<String>,
    #[serde(default)]
    audio_length_in_seconds: Option<f64>,
}

pub struct MurfTTS {
    client: reqwest::Client,
    config: MurfTTSConfig,
}

impl MurfTTS {
    pub fn new(client: reqwest::Client, config: TTSConfig) -> TTSResult<Self> {
        Self::with_config(client, MurfTTSConfig::from_base(config))
    }

    pub fn with_config(client: reqwest::Client, config: MurfTTSConfig) -> TTSResult<Self> {
        if config.base.api_key.is_empty() {
            return Err(TTSError::InvalidConfiguration(
                "API key is required for Murf TTS".to_string(),
            ));
        }
        Ok(Self { client, config })
    }

    /// Build the generate request for `text`.
    fn build_http_request(&self, text: &str) -> reqwest::RequestBuilder {
        let body = GenerateRequest {
            voice_id: &self.config.voice_id,
            text,
            format: self.config.format.as_str(),
            sample_rate: self.config.base.sample_rate,
            model_version: &self.config.model_version,
            encode_as_base64: true,
        };

        self.client
            .post(self.config.generate_url())
            .header("api-key", &self.config.base.api_key)
            .header("Accept", "application/json")
            .timeout(self.config.base.request_timeout)
            .json(&body)
    }

    async fn download(&self, url: &str) -> TTSResult<Bytes> {
        let response = self
            .client
            .get(url)
            .timeout(self.config.base.request_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TTSError::ProviderError(format!(
                "Murf audio download failed with status {status}"
            )));
        }
        Ok(response.bytes().await?)
    }
}

#[async_trait::async_trait]
impl BaseTTS for MurfTTS {
    async fn synthesize(&self, text: &str) -> TTSResult<AudioData> {
        let response = self.build_http_request(text).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TTSError::ProviderError(format!(
                "Murf returned {status}: {body}"
            )));
        }

        let generated: GenerateResponse = response.json().await.map_err(|e| {
            TTSError::ProviderError(format!("Malformed Murf response: {}", e.without_url()))
        })?;

        let data = match (generated.encoded_audio, generated.audio_file) {
            (Some(encoded), _) if !encoded.is_empty() => {
                Bytes::from(BASE64.decode(encoded.as_bytes()).map_err(|e| {
                    TTSError::AudioGenerationFailed(format!("Invalid base64 audio from Murf: {e}"))
                })?)
            }
            (_, Some(url)) if !url.is_empty() => {
                debug!("Murf returned audio by URL, downloading");
                self.download(&url).await?
            }
            _ => {
                warn!("Murf response carried no audio");
                return Err(TTSError::AudioGenerationFailed(
                    "Murf response carried no audio".to_string(),
                ));
            }
        };

        debug!(
            bytes = data.len(),
            seconds = generated.audio_length_in_seconds.unwrap_or_default(),
            "Murf synthesis complete"
        );

        Ok(AudioData {
            data,
            format: self.config.format.extension().to_string(),
            sample_rate: self.config.base.sample_rate,
        })
    }

    fn get_provider_info(&self) -> &'static str {
        "Murf Speech Generation API"
    }
}
