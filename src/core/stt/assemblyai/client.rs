//! AssemblyAI streaming transcription client.
//!
//! One [`AssemblyAISTT`] owns one remote session. Audio handed to
//! [`send_audio`](BaseSTT::send_audio) is queued to a connection task that
//! writes binary frames to the provider socket and reads its JSON replies.
//! Finished turns are pushed through a result channel to a forwarding task
//! which invokes the registered callback, so the callback never runs on the
//! caller's task.
//!
//! ```text
//! send_audio() --> ws_sender (mpsc) --> connection task <--> AssemblyAI
//!                                             |
//!                                       result_tx (mpsc)
//!                                             |
//!                                    result forward task --> callback
//! ```

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use parking_lot::{Mutex as SyncMutex, RwLock as SyncRwLock};
use tokio::sync::{Mutex, RwLock, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, error, info, warn};

use super::config::AssemblyAISTTConfig;
use super::messages::{AssemblyAIMessage, TerminateMessage};
use crate::core::stt::base::{
    BaseSTT, STTConfig, STTConnectionState, STTError, STTErrorCallback, STTResult,
    STTResultCallback,
};

/// Largest audio chunk accepted from a caller (256 KiB).
const MAX_AUDIO_CHUNK_SIZE: usize = 256 * 1024;

/// Idle timeout on the provider socket; resets on every received message.
const WS_MESSAGE_TIMEOUT: Duration = Duration::from_secs(60);

/// How long `connect` waits for the provider's `Begin` message.
const BEGIN_TIMEOUT: Duration = Duration::from_secs(10);

/// How long `disconnect` waits for the connection task to finish.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub const MIN_SAMPLE_RATE: u32 = 8000;
pub const MAX_SAMPLE_RATE: u32 = 48000;

/// State shared between the client handle and its connection task.
#[derive(Clone)]
struct SessionStatus {
    state: Arc<SyncRwLock<STTConnectionState>>,
    last_error: Arc<SyncMutex<Option<STTError>>>,
}

impl SessionStatus {
    fn new() -> Self {
        Self {
            state: Arc::new(SyncRwLock::new(STTConnectionState::Idle)),
            last_error: Arc::new(SyncMutex::new(None)),
        }
    }

    fn get(&self) -> STTConnectionState {
        self.state.read().clone()
    }

    fn set(&self, state: STTConnectionState) {
        *self.state.write() = state;
    }

    /// Record a session failure unless the session was already closed locally.
    fn fail(&self, error: STTError) {
        let mut state = self.state.write();
        if *state == STTConnectionState::Closed {
            return;
        }
        *state = STTConnectionState::Failed(error.to_string());
        *self.last_error.lock() = Some(error);
    }

    fn last_error(&self) -> Option<STTError> {
        self.last_error.lock().clone()
    }
}

pub struct AssemblyAISTT {
    pub(crate) config: Option<AssemblyAISTTConfig>,

    status: SessionStatus,

    /// Bounded queue of outgoing audio (backpressure on slow sockets)
    ws_sender: Option<mpsc::Sender<Bytes>>,

    shutdown_tx: Option<oneshot::Sender<()>>,

    connection_handle: Option<JoinHandle<()>>,
    result_forward_handle: Option<JoinHandle<()>>,
    error_forward_handle: Option<JoinHandle<()>>,

    result_callback: Arc<Mutex<Option<STTResultCallback>>>,
    error_callback: Arc<Mutex<Option<STTErrorCallback>>>,

    session_id: Arc<RwLock<Option<String>>>,
}

impl AssemblyAISTT {
    /// Build a client from a provider-specific configuration.
    pub fn with_config(config: AssemblyAISTTConfig) -> Result<Self, STTError> {
        if config.base.api_key.is_empty() {
            return Err(STTError::AuthenticationFailed(
                "API key is required for AssemblyAI STT".to_string(),
            ));
        }

        let sample_rate = config.base.sample_rate;
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate) {
            return Err(STTError::ConfigurationError(format!(
                "Sample rate {sample_rate} Hz is outside supported range ({MIN_SAMPLE_RATE}-{MAX_SAMPLE_RATE} Hz)"
            )));
        }

        Ok(Self {
            config: Some(config),
            status: SessionStatus::new(),
            ws_sender: None,
            shutdown_tx: None,
            connection_handle: None,
            result_forward_handle: None,
            error_forward_handle: None,
            result_callback: Arc::new(Mutex::new(None)),
            error_callback: Arc::new(Mutex::new(None)),
            session_id: Arc::new(RwLock::new(None)),
        })
    }

    pub async fn get_session_id(&self) -> Option<String> {
        self.session_id.read().await.clone()
    }

    /// Handle one message from the provider socket.
    ///
    /// Returns `Ok(true)` to keep reading, `Ok(false)` when the provider ended
    /// the session and `Err` for a provider-reported failure.
    pub(crate) async fn handle_websocket_message(
        message: Message,
        result_tx: &mpsc::Sender<STTResult>,
        session_id: &Arc<RwLock<Option<String>>>,
        format_turns: bool,
    ) -> Result<bool, STTError> {
        match message {
            Message::Text(text) => match AssemblyAIMessage::parse(&text) {
                Ok(AssemblyAIMessage::Begin(begin)) => {
                    info!(
                        "AssemblyAI STT session started: {} (expires at: {})",
                        begin.id, begin.expires_at
                    );
                    *session_id.write().await = Some(begin.id);
                }

                Ok(AssemblyAIMessage::Turn(turn)) => {
                    if turn.is_deliverable(format_turns) {
                        let result = STTResult::new(turn.transcript.trim(), true, turn.confidence());
                        debug!(turn_order = turn.turn_order, "AssemblyAI turn finished");
                        if result_tx.try_send(result).is_err() {
                            warn!("Dropping finished turn - result channel full or closed");
                        }
                    } else {
                        debug!(
                            turn_order = turn.turn_order,
                            end_of_turn = turn.end_of_turn,
                            formatted = turn.turn_is_formatted,
                            "AssemblyAI partial turn"
                        );
                    }
                }

                Ok(AssemblyAIMessage::Termination(term)) => {
                    info!(
                        "AssemblyAI session terminated (audio: {:.1}s, session: {:.1}s)",
                        term.audio_duration_seconds, term.session_duration_seconds
                    );
                    return Ok(false);
                }

                Ok(AssemblyAIMessage::Error(err)) => {
                    error!(
                        "AssemblyAI STT error{}: {}",
                        err.error_code
                            .as_ref()
                            .map(|c| format!(" ({c})"))
                            .unwrap_or_default(),
                        err.error
                    );

                    return Err(match err.error_code.as_deref() {
                        Some("invalid_api_key") | Some("authentication_failed") => {
                            STTError::AuthenticationFailed(err.error)
                        }
                        Some("invalid_audio") | Some("audio_error") => {
                            STTError::InvalidAudioFormat(err.error)
                        }
                        _ => STTError::ProviderError(err.error),
                    });
                }

                Ok(AssemblyAIMessage::Unknown(raw)) => {
                    debug!("Received unknown AssemblyAI message type: {}", raw);
                }

                Err(e) => {
                    warn!("Failed to parse AssemblyAI message: {}", e);
                }
            },

            Message::Close(close_frame) => {
                info!("AssemblyAI WebSocket closed: {:?}", close_frame);
                return Ok(false);
            }

            _ => {
                debug!("Ignoring non-text AssemblyAI frame");
            }
        }

        Ok(true)
    }

    async fn start_connection(&mut self, config: AssemblyAISTTConfig) -> Result<(), STTError> {
        let ws_url = config.build_websocket_url();

        let mut request = ws_url.as_str().into_client_request().map_err(|e| {
            STTError::ConnectionFailed(format!("Failed to create WebSocket request: {e}"))
        })?;
        // AssemblyAI takes the raw key, no Bearer prefix
        let auth = HeaderValue::from_str(&config.base.api_key)
            .map_err(|_| STTError::AuthenticationFailed("Malformed API key".to_string()))?;
        request.headers_mut().insert("Authorization", auth);

        let (ws_tx, mut ws_rx) = mpsc::channel::<Bytes>(32);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let (result_tx, mut result_rx) = mpsc::channel::<STTResult>(256);
        let (error_tx, mut error_rx) = mpsc::channel::<STTError>(64);
        let (connected_tx, connected_rx) = oneshot::channel::<()>();

        self.ws_sender = Some(ws_tx);
        self.shutdown_tx = Some(shutdown_tx);

        let status = self.status.clone();
        let session_id = self.session_id.clone();
        let format_turns = config.format_turns;

        let connection_handle = tokio::spawn(async move {
            let (ws_stream, _response) = match connect_async(request).await {
                Ok(result) => result,
                Err(e) => {
                    let stt_error =
                        STTError::ConnectionFailed(format!("Failed to connect to AssemblyAI: {e}"));
                    error!("{}", stt_error);
                    status.fail(stt_error.clone());
                    let _ = error_tx.try_send(stt_error);
                    return;
                }
            };

            info!("Connected to AssemblyAI STT WebSocket");

            let (mut ws_sink, mut ws_stream) = ws_stream.split();
            let mut connected_tx = Some(connected_tx);

            loop {
                tokio::select! {
                    Some(audio_data) = ws_rx.recv() => {
                        let data_len = audio_data.len();
                        if let Err(e) = ws_sink.send(Message::Binary(audio_data)).await {
                            let stt_error = STTError::NetworkError(format!(
                                "Failed to send audio to AssemblyAI: {e}"
                            ));
                            error!("{}", stt_error);
                            status.fail(stt_error.clone());
                            let _ = error_tx.try_send(stt_error);
                            break;
                        }
                        debug!("Sent {} bytes of audio to AssemblyAI", data_len);
                    }

                    message = timeout(WS_MESSAGE_TIMEOUT, ws_stream.next()) => {
                        let outcome = match message {
                            Ok(Some(Ok(msg))) => {
                                Self::handle_websocket_message(msg, &result_tx, &session_id, format_turns).await
                            }
                            Ok(Some(Err(e))) => {
                                Err(STTError::NetworkError(format!("WebSocket error: {e}")))
                            }
                            Ok(None) => Ok(false),
                            Err(_elapsed) => Err(STTError::NetworkError(
                                "WebSocket idle timeout - no message for 60 seconds".into(),
                            )),
                        };

                        match outcome {
                            Ok(true) => {
                                if session_id.read().await.is_some()
                                    && let Some(tx) = connected_tx.take()
                                {
                                    status.set(STTConnectionState::Connected);
                                    let _ = tx.send(());
                                }
                            }
                            Ok(false) => {
                                info!("AssemblyAI session ended by provider");
                                status.fail(STTError::ConnectionFailed(
                                    "AssemblyAI session ended".to_string(),
                                ));
                                break;
                            }
                            Err(e) => {
                                error!("AssemblyAI streaming error: {}", e);
                                status.fail(e.clone());
                                let _ = error_tx.try_send(e);
                                break;
                            }
                        }
                    }

                    _ = &mut shutdown_rx => {
                        info!("Received shutdown signal for AssemblyAI STT");

                        if let Ok(json) = serde_json::to_string(&TerminateMessage::default()) {
                            let _ = ws_sink.send(Message::Text(json.into())).await;
                        }
                        let _ = ws_sink.send(Message::Close(None)).await;
                        break;
                    }
                }
            }

            info!("AssemblyAI STT WebSocket connection closed");
        });
        self.connection_handle = Some(connection_handle);

        let callback_ref = self.result_callback.clone();
        self.result_forward_handle = Some(tokio::spawn(async move {
            while let Some(result) = result_rx.recv().await {
                let callback = callback_ref.lock().await.clone();
                match callback {
                    Some(callback) => callback(result).await,
                    None => debug!(
                        "AssemblyAI STT result (no callback): {}",
                        result.transcript
                    ),
                }
            }
        }));

        let error_callback_ref = self.error_callback.clone();
        self.error_forward_handle = Some(tokio::spawn(async move {
            while let Some(error) = error_rx.recv().await {
                let callback = error_callback_ref.lock().await.clone();
                match callback {
                    Some(callback) => callback(error).await,
                    None => error!("AssemblyAI STT error (no callback registered): {}", error),
                }
            }
        }));

        self.status.set(STTConnectionState::Connecting);

        let failure = match timeout(BEGIN_TIMEOUT, connected_rx).await {
            Ok(Ok(())) => {
                info!("Successfully connected to AssemblyAI STT");
                return Ok(());
            }
            Ok(Err(_)) => self.status.last_error().unwrap_or_else(|| {
                STTError::ConnectionFailed(
                    "Connection channel closed before session started".to_string(),
                )
            }),
            Err(_) => STTError::ConnectionFailed(
                "Connection timeout waiting for Begin message".to_string(),
            ),
        };

        self.stop_tasks().await;
        self.status.fail(failure.clone());
        Err(failure)
    }

    /// Signal the connection task and wait for it, then stop the forwarders.
    async fn stop_tasks(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }

        if let Some(mut handle) = self.connection_handle.take()
            && timeout(SHUTDOWN_TIMEOUT, &mut handle).await.is_err()
        {
            warn!("AssemblyAI connection task did not stop in time, aborting");
            handle.abort();
        }

        for handle in [
            self.result_forward_handle.take(),
            self.error_forward_handle.take(),
        ]
        .into_iter()
        .flatten()
        {
            handle.abort();
            let _ = handle.await;
        }

        self.ws_sender = None;
    }
}

impl Drop for AssemblyAISTT {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        for handle in [
            self.result_forward_handle.take(),
            self.error_forward_handle.take(),
        ]
        .into_iter()
        .flatten()
        {
            handle.abort();
        }
    }
}

#[async_trait::async_trait]
impl BaseSTT for AssemblyAISTT {
    fn new(config: STTConfig) -> Result<Self, STTError> {
        Self::with_config(AssemblyAISTTConfig::from_base(config))
    }

    async fn connect(&mut self) -> Result<(), STTError> {
        match self.status.get() {
            STTConnectionState::Idle => {}
            STTConnectionState::Connected => return Ok(()),
            other => {
                return Err(STTError::ConnectionFailed(format!(
                    "Cannot connect a session in state {other:?}"
                )));
            }
        }

        let config = self.config.clone().ok_or_else(|| {
            STTError::ConfigurationError("No configuration available".to_string())
        })?;

        self.start_connection(config).await
    }

    async fn disconnect(&mut self) -> Result<(), STTError> {
        if self.status.get() == STTConnectionState::Closed {
            debug!("AssemblyAI STT already closed");
            return Ok(());
        }
        // Mark closed first so the connection task does not record the
        // shutdown as a failure.
        self.status.set(STTConnectionState::Closed);

        self.stop_tasks().await;

        *self.result_callback.lock().await = None;
        *self.error_callback.lock().await = None;
        *self.session_id.write().await = None;

        info!("Disconnected from AssemblyAI STT");
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.status.get() == STTConnectionState::Connected && self.ws_sender.is_some()
    }

    fn connection_state(&self) -> STTConnectionState {
        self.status.get()
    }

    async fn send_audio(&mut self, audio_data: Bytes) -> Result<(), STTError> {
        match self.status.get() {
            STTConnectionState::Connected => {}
            STTConnectionState::Failed(reason) => {
                return Err(self
                    .status
                    .last_error()
                    .unwrap_or(STTError::ConnectionFailed(reason)));
            }
            _ => {
                return Err(STTError::ConnectionFailed(
                    "Not connected to AssemblyAI STT".to_string(),
                ));
            }
        }

        let data_len = audio_data.len();
        if data_len > MAX_AUDIO_CHUNK_SIZE {
            return Err(STTError::InvalidAudioFormat(format!(
                "Audio chunk size {data_len} bytes exceeds maximum {MAX_AUDIO_CHUNK_SIZE} bytes"
            )));
        }

        let ws_sender = self.ws_sender.as_ref().ok_or_else(|| {
            STTError::ConnectionFailed("Not connected to AssemblyAI STT".to_string())
        })?;

        ws_sender.send(audio_data).await.map_err(|_| {
            self.status
                .last_error()
                .unwrap_or_else(|| STTError::NetworkError("Audio channel closed".to_string()))
        })?;

        debug!("Queued {} bytes of audio for AssemblyAI", data_len);
        Ok(())
    }

    async fn on_result(&mut self, callback: STTResultCallback) -> Result<(), STTError> {
        *self.result_callback.lock().await = Some(callback);
        Ok(())
    }

    async fn on_error(&mut self, callback: STTErrorCallback) -> Result<(), STTError> {
        *self.error_callback.lock().await = Some(callback);
        Ok(())
    }

    fn get_config(&self) -> Option<&STTConfig> {
        self.config.as_ref().map(|c| &c.base)
    }

    fn get_provider_info(&self) -> &'static str {
        "AssemblyAI Streaming STT v3"
    }
}
