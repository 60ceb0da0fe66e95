//! AssemblyAI Streaming Speech-to-Text (API v3).
//!
//! - [`config`]: session configuration and URL building
//! - [`messages`]: wire message types
//! - [`client`]: the [`AssemblyAISTT`] session client
//!
//! Only finished turns are delivered to the result callback. With
//! `format_turns` enabled (the default) AssemblyAI sends every finished turn
//! twice, raw and formatted; the formatted copy is the one delivered.
//!
//! # Example
//!
//! ```rust,no_run
//! use parley_gateway::core::stt::{AssemblyAISTT, BaseSTT, STTConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut stt = AssemblyAISTT::new(STTConfig {
//!         api_key: "your-assemblyai-api-key".to_string(),
//!         ..Default::default()
//!     })?;
//!
//!     stt.on_result(Arc::new(|result| {
//!         Box::pin(async move {
//!             println!("Utterance: {}", result.transcript);
//!         })
//!     }))
//!     .await?;
//!     stt.connect().await?;
//!
//!     stt.send_audio(vec![0u8; 3200].into()).await?;
//!     stt.disconnect().await?;
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod messages;

#[cfg(test)]
mod tests;

pub use client::{AssemblyAISTT, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE};
pub use config::{
    AssemblyAIEncoding, AssemblyAIRegion, AssemblyAISTTConfig, AssemblyAISpeechModel,
};
pub use messages::{
    AssemblyAIMessage, BeginMessage, ErrorMessage, TerminateMessage, TerminationMessage,
    TurnMessage, Word,
};
