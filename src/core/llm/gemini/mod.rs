//! Google Gemini `generateContent` client.

mod client;
mod messages;

pub use client::{DEFAULT_GEMINI_MODEL, GEMINI_API_BASE, GeminiClient, GeminiConfig};
pub use messages::{Content, GenerateContentRequest, GenerateContentResponse, Part};
