//! Voice assistant WebSocket
//!
//! ## Client → Server
//!
//! - **Binary frames**: raw PCM audio (16-bit signed little-endian, mono, at the
//!   configured sample rate)
//! - Text frames are ignored; closing the socket ends the session
//!
//! ## Server → Client
//!
//! - **final**: the caller's finalized utterance
//! - **assistant**: the full reply text
//! - **audio**: base64 speech for one sentence of the reply, with its index
//! - **error**: missing API keys, transcription failures, failed turns
//!
//! Each turn produces `final`, then `assistant`, then zero or more `audio`
//! messages in sentence order.

mod handler;
pub mod messages;
mod turn;

pub use handler::ws_voice_handler;
pub use messages::{MessageRoute, OutgoingMessage};
pub use turn::TURN_FAILURE_MESSAGE;
