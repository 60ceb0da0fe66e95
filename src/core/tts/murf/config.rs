//! Configuration types for the Murf speech generation API.

use serde::Serialize;

use crate::core::tts::base::TTSConfig;

/// Voice used when none is configured.
pub const DEFAULT_MURF_VOICE: &str = "en-US-natalie";

/// Output formats Murf can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MurfAudioFormat {
    #[default]
    Mp3,
    Wav,
    Flac,
    Alaw,
    Ulaw,
    Pcm,
    Ogg,
}

impl MurfAudioFormat {
    /// Value of the `format` request field.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp3 => "MP3",
            Self::Wav => "WAV",
            Self::Flac => "FLAC",
            Self::Alaw => "ALAW",
            Self::Ulaw => "ULAW",
            Self::Pcm => "PCM",
            Self::Ogg => "OGG",
        }
    }

    /// Lower-case name reported alongside the audio.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::Flac => "flac",
            Self::Alaw => "alaw",
            Self::Ulaw => "ulaw",
            Self::Pcm => "pcm",
            Self::Ogg => "ogg",
        }
    }

    /// Parse a format name, falling back to MP3.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "wav" => Self::Wav,
            "flac" => Self::Flac,
            "alaw" => Self::Alaw,
            "ulaw" | "mulaw" => Self::Ulaw,
            "pcm" => Self::Pcm,
            "ogg" => Self::Ogg,
            _ => Self::Mp3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MurfTTSConfig {
    pub base: TTSConfig,
    pub voice_id: String,
    pub format: MurfAudioFormat,
    /// Murf model generation ("GEN2")
    pub model_version: String,
    /// Replaces `https://api.murf.ai` (tests point this at a mock server)
    pub endpoint_override: Option<String>,
}

impl MurfTTSConfig {
    pub fn from_base(base: TTSConfig) -> Self {
        let voice_id = base
            .voice_id
            .clone()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_MURF_VOICE.to_string());
        let format = base
            .audio_format
            .as_deref()
            .map(MurfAudioFormat::from_str_or_default)
            .unwrap_or_default();
        let model_version = if base.model.is_empty() {
            "GEN2".to_string()
        } else {
            base.model.clone()
        };

        Self {
            base,
            voice_id,
            format,
            model_version,
            endpoint_override: None,
        }
    }

    pub fn generate_url(&self) -> String {
        let base = self
            .endpoint_override
            .as_deref()
            .unwrap_or(super::MURF_API_BASE)
            .trim_end_matches('/');
        format!("{base}/v1/speech/generate")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing() {
        assert_eq!(MurfAudioFormat::from_str_or_default("WAV"), MurfAudioFormat::Wav);
        assert_eq!(MurfAudioFormat::from_str_or_default("mp3"), MurfAudioFormat::Mp3);
        assert_eq!(
            MurfAudioFormat::from_str_or_default("unknown"),
            MurfAudioFormat::Mp3
        );
        assert_eq!(MurfAudioFormat::Ogg.as_str(), "OGG");
    }

    #[test]
    fn test_from_base_defaults() {
        let config = MurfTTSConfig::from_base(TTSConfig::default());

        assert_eq!(config.voice_id, "en-US-natalie");
        assert_eq!(config.format, MurfAudioFormat::Mp3);
        assert_eq!(config.model_version, "GEN2");
        assert_eq!(
            config.generate_url(),
            "https://api.murf.ai/v1/speech/generate"
        );
    }

    #[test]
    fn test_from_base_respects_voice_and_format() {
        let config = MurfTTSConfig::from_base(TTSConfig {
            voice_id: Some("en-UK-hazel".to_string()),
            audio_format: Some("wav".to_string()),
            ..Default::default()
        });

        assert_eq!(config.voice_id, "en-UK-hazel");
        assert_eq!(config.format, MurfAudioFormat::Wav);
    }
}
