//! Voice WebSocket message types
//!
//! Callers send raw PCM audio as binary frames; everything the server sends
//! is a JSON text frame tagged by `type`.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Serialize;

use crate::credentials::SecretName;

/// Messages from the server to the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum OutgoingMessage {
    /// Finalized transcript of the caller's turn
    #[serde(rename = "final")]
    Final { text: String },

    /// Full text of the assistant's reply
    #[serde(rename = "assistant")]
    Assistant { text: String },

    /// Synthesized speech for one sentence of the reply
    #[serde(rename = "audio")]
    Audio {
        /// Base64 encoded audio in the configured container format
        b64: String,
        /// Position of the sentence within the reply
        index: usize,
    },

    #[serde(rename = "error")]
    Error { message: String },
}

impl OutgoingMessage {
    pub fn audio(index: usize, audio: &[u8]) -> Self {
        OutgoingMessage::Audio {
            b64: STANDARD.encode(audio),
            index,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        OutgoingMessage::Error {
            message: message.into(),
        }
    }

    pub fn missing_keys(missing: &[SecretName]) -> Self {
        let names = missing
            .iter()
            .map(SecretName::env_var)
            .collect::<Vec<_>>()
            .join(", ");
        Self::error(format!(
            "API keys missing: {names}. Please configure API keys first."
        ))
    }
}

/// Work for the socket writer task
#[derive(Debug)]
pub enum MessageRoute {
    Outgoing(OutgoingMessage),
    /// Send a close frame and stop writing
    Close,
}
