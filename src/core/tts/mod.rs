mod base;
pub mod murf;
mod synthesizer;

pub use base::{AudioData, BaseTTS, TTSConfig, TTSError, TTSResult};
pub use murf::{MURF_API_BASE, MurfAudioFormat, MurfTTS, MurfTTSConfig};
pub use synthesizer::SpeechSynthesizer;
