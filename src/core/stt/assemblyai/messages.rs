//! Wire messages of the AssemblyAI Streaming v3 API.
//!
//! Audio goes up as raw binary frames; everything else is JSON tagged by `type`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct BeginMessage {
    pub id: String,
    /// Unix epoch seconds
    #[serde(default)]
    pub expires_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Word {
    pub start: u64,
    pub end: u64,
    pub confidence: f64,
    pub text: String,
    #[serde(default)]
    pub word_is_final: bool,
}

/// One (possibly partial) turn. A finished turn arrives with `end_of_turn`
/// set; with turn formatting enabled it arrives again with
/// `turn_is_formatted` set and punctuation applied.
#[derive(Debug, Clone, Deserialize)]
pub struct TurnMessage {
    #[serde(default)]
    pub turn_order: u32,
    pub transcript: String,
    pub end_of_turn: bool,
    #[serde(default)]
    pub turn_is_formatted: bool,
    #[serde(default)]
    pub end_of_turn_confidence: f64,
    #[serde(default)]
    pub words: Vec<Word>,
}

impl TurnMessage {
    /// Whether this turn should be handed on as a finished utterance.
    pub fn is_deliverable(&self, format_turns: bool) -> bool {
        self.end_of_turn
            && (!format_turns || self.turn_is_formatted)
            && !self.transcript.trim().is_empty()
    }

    /// Mean word confidence, 1.0 when there are no words.
    pub fn confidence(&self) -> f32 {
        if self.words.is_empty() {
            return 1.0;
        }
        let sum: f64 = self.words.iter().map(|w| w.confidence).sum();
        ((sum / self.words.len() as f64) as f32).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TerminationMessage {
    #[serde(default)]
    pub audio_duration_seconds: f64,
    #[serde(default)]
    pub session_duration_seconds: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorMessage {
    #[serde(default)]
    pub error_code: Option<String>,
    pub error: String,
}

/// Ends the session; the server answers with a `Termination` message.
#[derive(Debug, Clone, Serialize)]
pub struct TerminateMessage {
    #[serde(rename = "type")]
    pub message_type: &'static str,
}

impl Default for TerminateMessage {
    fn default() -> Self {
        Self {
            message_type: "Terminate",
        }
    }
}

#[derive(Debug)]
pub enum AssemblyAIMessage {
    Begin(BeginMessage),
    Turn(TurnMessage),
    Termination(TerminationMessage),
    Error(ErrorMessage),
    /// Unrecognised `type`, kept raw
    Unknown(String),
}

impl AssemblyAIMessage {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        #[derive(Deserialize)]
        struct TypePeek {
            #[serde(rename = "type")]
            message_type: String,
        }

        let peek: TypePeek = serde_json::from_str(text)?;

        Ok(match peek.message_type.as_str() {
            "Begin" => AssemblyAIMessage::Begin(serde_json::from_str(text)?),
            "Turn" => AssemblyAIMessage::Turn(serde_json::from_str(text)?),
            "Termination" => AssemblyAIMessage::Termination(serde_json::from_str(text)?),
            "Error" => AssemblyAIMessage::Error(serde_json::from_str(text)?),
            _ => AssemblyAIMessage::Unknown(text.to_string()),
        })
    }
}
