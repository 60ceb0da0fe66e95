//! Voice WebSocket route configuration

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::ws::ws_voice_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the voice WebSocket router
///
/// # Endpoint
///
/// `GET /ws` - WebSocket upgrade for a voice assistant session
///
/// # Protocol
///
/// Clients stream binary PCM audio frames. The server answers every finished
/// utterance with JSON text frames:
///
/// ```json
/// {"type": "final", "text": "search for weather in Paris"}
/// {"type": "assistant", "text": "It is sunny in Paris. Expect 24 degrees."}
/// {"type": "audio", "b64": "SUQzBAAAAAAA...", "index": 0}
/// {"type": "audio", "b64": "SUQzBAAAAAAA...", "index": 1}
/// ```
pub fn create_ws_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ws", get(ws_voice_handler))
        .layer(TraceLayer::new_for_http())
}
