//! Murf text-to-speech integration.

mod config;
mod provider;

pub use config::{DEFAULT_MURF_VOICE, MurfAudioFormat, MurfTTSConfig};
pub use provider::MurfTTS;

/// Murf REST API base URL
pub const MURF_API_BASE: &str = "https://api.murf.ai";
