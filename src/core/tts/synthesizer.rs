use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use super::base::BaseTTS;

/// Sentence-level front of a [`BaseTTS`] provider.
///
/// Failures and empty audio both come back as `None`; the caller skips the
/// sentence and carries on.
#[derive(Clone)]
pub struct SpeechSynthesizer {
    provider: Arc<dyn BaseTTS>,
}

impl SpeechSynthesizer {
    pub fn new(provider: Arc<dyn BaseTTS>) -> Self {
        Self { provider }
    }

    pub async fn synthesize(&self, sentence: &str) -> Option<Bytes> {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            return None;
        }

        match self.provider.synthesize(sentence).await {
            Ok(audio) if audio.is_empty() => {
                debug!("{} returned no audio", self.provider.get_provider_info());
                None
            }
            Ok(audio) => Some(audio.data),
            Err(e) => {
                warn!(
                    "Speech synthesis failed ({}): {}",
                    self.provider.get_provider_info(),
                    e
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tts::base::{AudioData, TTSError, TTSResult};

    struct ScriptedTTS;

    #[async_trait::async_trait]
    impl BaseTTS for ScriptedTTS {
        async fn synthesize(&self, text: &str) -> TTSResult<AudioData> {
            match text {
                "fail." => Err(TTSError::NetworkError("down".to_string())),
                "silent." => Ok(AudioData {
                    data: Bytes::new(),
                    format: "mp3".to_string(),
                    sample_rate: None,
                }),
                other => Ok(AudioData {
                    data: Bytes::from(other.to_uppercase()),
                    format: "mp3".to_string(),
                    sample_rate: None,
                }),
            }
        }

        fn get_provider_info(&self) -> &'static str {
            "scripted"
        }
    }

    #[tokio::test]
    async fn test_audio_is_returned() {
        let synth = SpeechSynthesizer::new(Arc::new(ScriptedTTS));
        assert_eq!(
            synth.synthesize("  hi.  ").await,
            Some(Bytes::from_static(b"HI."))
        );
    }

    #[tokio::test]
    async fn test_failure_and_empty_audio_become_none() {
        let synth = SpeechSynthesizer::new(Arc::new(ScriptedTTS));
        assert_eq!(synth.synthesize("fail.").await, None);
        assert_eq!(synth.synthesize("silent.").await, None);
        assert_eq!(synth.synthesize("   ").await, None);
    }
}
