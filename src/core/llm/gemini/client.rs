use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use tracing::{debug, error, warn};

use super::messages::{ApiErrorBody, GenerateContentRequest, GenerateContentResponse};
use crate::core::llm::{
    ASSISTANT_PERSONA, ConversationHistory, ConversationModel, LLMError, LLMResult,
};

/// Google Generative Language API base URL
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub system_instruction: String,
    pub request_timeout: Duration,
    /// Replaces [`GEMINI_API_BASE`] (tests point this at a mock server)
    pub endpoint_override: Option<String>,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            system_instruction: ASSISTANT_PERSONA.to_string(),
            request_timeout: Duration::from_secs(30),
            endpoint_override: None,
        }
    }

    pub fn generate_url(&self) -> String {
        let base = self
            .endpoint_override
            .as_deref()
            .unwrap_or(GEMINI_API_BASE)
            .trim_end_matches('/');
        format!("{base}/v1beta/models/{}:generateContent", self.model)
    }
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("request_timeout", &self.request_timeout)
            .field("endpoint_override", &self.endpoint_override)
            .finish_non_exhaustive()
    }
}

pub struct GeminiClient {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(client: reqwest::Client, config: GeminiConfig) -> LLMResult<Self> {
        if config.api_key.is_empty() {
            return Err(LLMError::InvalidConfiguration(
                "API key is required for Gemini".to_string(),
            ));
        }
        if config.model.is_empty() {
            return Err(LLMError::InvalidConfiguration(
                "Gemini model name is empty".to_string(),
            ));
        }
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn error_for_status(status: StatusCode, body: &str) -> LLMError {
        let message = serde_json::from_str::<ApiErrorBody>(body)
            .map(|b| format!("{} ({})", b.error.message, b.error.status))
            .unwrap_or_else(|_| body.chars().take(200).collect());

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                LLMError::AuthenticationFailed(message)
            }
            StatusCode::TOO_MANY_REQUESTS => LLMError::RateLimited(message),
            // Gemini reports a bad key as 400 INVALID_ARGUMENT
            StatusCode::BAD_REQUEST if message.contains("API key") => {
                LLMError::AuthenticationFailed(message)
            }
            _ => LLMError::ProviderError(format!("{status}: {message}")),
        }
    }
}

#[async_trait::async_trait]
impl ConversationModel for GeminiClient {
    async fn generate(&self, prompt: &str, history: &ConversationHistory) -> LLMResult<String> {
        let system = (!self.config.system_instruction.is_empty())
            .then_some(self.config.system_instruction.as_str());
        let request = GenerateContentRequest::new(system, history, prompt);

        debug!(
            model = %self.config.model,
            turns = history.len(),
            "Sending Gemini generateContent request"
        );

        let response = self
            .client
            .post(self.config.generate_url())
            .header("x-goog-api-key", &self.config.api_key)
            .timeout(self.config.request_timeout)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = Self::error_for_status(status, &body);
            error!("Gemini request failed: {}", err);
            return Err(err);
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| {
                LLMError::ProviderError(format!("Malformed Gemini response: {}", e.without_url()))
            })?;

        match parsed.text() {
            Some(text) => Ok(text),
            None => {
                if let Some(reason) = parsed
                    .prompt_feedback
                    .as_ref()
                    .and_then(|f| f.block_reason.as_deref())
                {
                    warn!("Gemini blocked the prompt: {}", reason);
                }
                Err(LLMError::EmptyResponse)
            }
        }
    }
}
