//! Session configuration for the AssemblyAI Streaming v3 API.

use std::str::FromStr;

use super::super::base::STTConfig;

/// Raw audio encodings accepted by the streaming endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssemblyAIEncoding {
    /// 16-bit signed little-endian PCM
    #[default]
    PcmS16le,
    /// 8-bit mu-law (telephony)
    PcmMulaw,
}

impl AssemblyAIEncoding {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PcmS16le => "pcm_s16le",
            Self::PcmMulaw => "pcm_mulaw",
        }
    }
}

impl FromStr for AssemblyAIEncoding {
    type Err = ();

    /// Unknown names fall back to PCM s16le.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "pcm_mulaw" | "mulaw" | "ulaw" => Self::PcmMulaw,
            _ => Self::PcmS16le,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssemblyAISpeechModel {
    #[default]
    UniversalStreamingEnglish,
    UniversalStreamingMultilingual,
}

impl AssemblyAISpeechModel {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UniversalStreamingEnglish => "universal-streaming-english",
            Self::UniversalStreamingMultilingual => "universal-streaming-multilingual",
        }
    }

    /// Pick the model for a language hint: English (or no hint) gets the
    /// English model, anything else the multilingual one.
    pub fn for_language(language: &str) -> Self {
        if language.is_empty() || language.to_lowercase().starts_with("en") {
            Self::UniversalStreamingEnglish
        } else {
            Self::UniversalStreamingMultilingual
        }
    }
}

impl FromStr for AssemblyAISpeechModel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "universal-streaming-multilingual" | "multilingual" => {
                Self::UniversalStreamingMultilingual
            }
            _ => Self::UniversalStreamingEnglish,
        })
    }
}

/// Regional streaming endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssemblyAIRegion {
    #[default]
    Default,
    Eu,
}

impl AssemblyAIRegion {
    #[inline]
    pub fn websocket_base_url(&self) -> &'static str {
        match self {
            Self::Default => "wss://streaming.assemblyai.com",
            Self::Eu => "wss://streaming.eu.assemblyai.com",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssemblyAISTTConfig {
    pub base: STTConfig,
    pub speech_model: AssemblyAISpeechModel,
    pub encoding: AssemblyAIEncoding,
    /// Ask for punctuated, cased turns. When set, only the formatted copy of
    /// a finished turn is delivered as an utterance.
    pub format_turns: bool,
    pub end_of_turn_confidence_threshold: Option<f32>,
    pub region: AssemblyAIRegion,
    /// Replaces the regional base URL (`ws://127.0.0.1:9000` in tests).
    pub endpoint_override: Option<String>,
}

impl Default for AssemblyAISTTConfig {
    fn default() -> Self {
        Self {
            base: STTConfig::default(),
            speech_model: AssemblyAISpeechModel::default(),
            encoding: AssemblyAIEncoding::default(),
            format_turns: true,
            end_of_turn_confidence_threshold: None,
            region: AssemblyAIRegion::default(),
            endpoint_override: None,
        }
    }
}

impl AssemblyAISTTConfig {
    pub fn from_base(base: STTConfig) -> Self {
        let encoding = base.encoding.parse().unwrap_or_default();
        let speech_model = if base.model.is_empty() {
            AssemblyAISpeechModel::for_language(&base.language)
        } else {
            base.model.parse().unwrap_or_default()
        };

        Self {
            base,
            speech_model,
            encoding,
            ..Default::default()
        }
    }

    /// Full streaming URL including the session query parameters.
    pub fn build_websocket_url(&self) -> String {
        let base_url = self
            .endpoint_override
            .as_deref()
            .unwrap_or_else(|| self.region.websocket_base_url())
            .trim_end_matches('/');

        let mut url = String::with_capacity(256);
        url.push_str(base_url);
        url.push_str("/v3/ws?sample_rate=");
        url.push_str(&self.base.sample_rate.to_string());
        url.push_str("&encoding=");
        url.push_str(self.encoding.as_str());
        url.push_str("&speech_model=");
        url.push_str(self.speech_model.as_str());
        url.push_str("&format_turns=");
        url.push_str(if self.format_turns { "true" } else { "false" });

        if let Some(threshold) = self.end_of_turn_confidence_threshold {
            url.push_str(&format!(
                "&end_of_turn_confidence_threshold={:.2}",
                threshold.clamp(0.0, 1.0)
            ));
        }

        url
    }
}
