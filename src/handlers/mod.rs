//! HTTP and WebSocket request handlers
//!
//! - `api` - Health check and API key management
//! - `ws` - Voice assistant WebSocket

pub mod api;
pub mod ws;

pub use ws::ws_voice_handler;
