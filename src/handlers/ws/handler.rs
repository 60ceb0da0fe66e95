//! Voice WebSocket handler
//!
//! One connection is one conversation. The receive loop forwards caller audio
//! to the transcriber; finalized utterances are queued for the connection's
//! turn worker, so slow replies never hold up audio intake.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use bytes::Bytes;
use futures::{SinkExt, StreamExt, stream::SplitSink};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::core::stt::{BaseSTT, STTError, STTErrorCallback, STTResult, STTResultCallback};
use crate::services::VoiceSession;
use crate::state::AppState;

use super::messages::{MessageRoute, OutgoingMessage};
use super::turn::TurnWorker;

/// Outgoing message buffer per connection
const CHANNEL_BUFFER_SIZE: usize = 256;

/// Maximum WebSocket frame size (10 MB)
const MAX_WS_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Maximum WebSocket message size (10 MB)
const MAX_WS_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// Largest piece of caller audio handed to the transcriber at once.
/// Even, so 16-bit samples are never split.
const AUDIO_FORWARD_CHUNK_SIZE: usize = 128 * 1024;

/// How long queued messages get to flush after the session ends
const SENDER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Voice WebSocket handler
///
/// Upgrades `GET /ws` to a voice session. Binary frames carry caller audio;
/// replies are JSON text frames (see [`OutgoingMessage`]).
pub async fn ws_voice_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("Voice WebSocket connection upgrade requested");

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| {
            let span = info_span!("voice_session", id = %Uuid::new_v4());
            handle_voice_socket(socket, state).instrument(span)
        })
}

async fn handle_voice_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("Voice WebSocket connection established");

    let (sender, mut receiver) = socket.split();
    let (message_tx, message_rx) = mpsc::channel::<MessageRoute>(CHANNEL_BUFFER_SIZE);
    let sender_task = tokio::spawn(write_messages(sender, message_rx));

    // Keys are checked once, before any backend is touched.
    let secrets = app_state.credentials.snapshot();
    let missing = secrets.missing();
    if !missing.is_empty() {
        warn!(?missing, "Rejecting voice session, API keys missing");
        send_and_close(&message_tx, OutgoingMessage::missing_keys(&missing)).await;
        finish(message_tx, sender_task).await;
        return;
    }

    let session = match app_state
        .services
        .build_session(&secrets, &app_state.config.voice)
    {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to set up voice backends: {}", e);
            send_and_close(
                &message_tx,
                OutgoingMessage::error(format!("Failed to start voice session: {e}")),
            )
            .await;
            finish(message_tx, sender_task).await;
            return;
        }
    };
    drop(secrets);

    let VoiceSession {
        mut transcriber,
        router,
        synthesizer,
    } = session;

    let (utterance_tx, utterance_rx) = mpsc::unbounded_channel::<String>();
    let turn_worker = tokio::spawn(
        TurnWorker::new(
            router,
            synthesizer,
            app_state.config.voice.synthesis_concurrency,
            message_tx.clone(),
        )
        .run(utterance_rx)
        .in_current_span(),
    );

    let started = start_transcriber(transcriber.as_mut(), utterance_tx).await;
    match started {
        Ok(()) => receive_audio(&mut receiver, transcriber.as_mut(), &message_tx).await,
        Err(e) => {
            error!("Failed to start transcription: {}", e);
            send_and_close(
                &message_tx,
                OutgoingMessage::error(format!("Failed to connect to speech recognition: {e}")),
            )
            .await;
        }
    }

    // Runs on every exit path once the session exists.
    turn_worker.abort();
    if let Err(e) = transcriber.disconnect().await {
        warn!("Failed to close transcription session: {}", e);
    }

    let _ = message_tx.send(MessageRoute::Close).await;
    finish(message_tx, sender_task).await;
    info!("Voice WebSocket connection terminated");
}

/// Register callbacks and open the provider session.
async fn start_transcriber(
    transcriber: &mut dyn BaseSTT,
    utterance_tx: mpsc::UnboundedSender<String>,
) -> Result<(), STTError> {
    let on_result: STTResultCallback = Arc::new(move |result: STTResult| {
        let utterance_tx = utterance_tx.clone();
        Box::pin(async move {
            if result.is_final && !result.transcript.trim().is_empty() {
                debug!(confidence = result.confidence, "Utterance finalized");
                let _ = utterance_tx.send(result.transcript);
            }
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let on_error: STTErrorCallback = Arc::new(|error: STTError| {
        Box::pin(async move {
            warn!("Transcription session error: {}", error);
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });

    transcriber.on_result(on_result).await?;
    transcriber.on_error(on_error).await?;
    transcriber.connect().await
}

/// Forward caller audio until the caller leaves or the transcription session
/// ends. A rejected frame is reported and the session carries on.
async fn receive_audio(
    receiver: &mut futures::stream::SplitStream<WebSocket>,
    transcriber: &mut dyn BaseSTT,
    message_tx: &mpsc::Sender<MessageRoute>,
) {
    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Binary(audio)) => {
                debug!("Received audio: {} bytes", audio.len());
                if let Err(e) = forward_audio(transcriber, audio).await {
                    error!("Failed to forward audio: {}", e);
                    let _ = message_tx
                        .send(MessageRoute::Outgoing(OutgoingMessage::error(format!(
                            "Speech recognition failed: {e}"
                        ))))
                        .await;

                    let state = transcriber.connection_state();
                    if state.is_terminal() {
                        warn!(?state, "Transcription session ended, closing voice session");
                        return;
                    }
                }
            }
            Ok(Message::Text(text)) => {
                debug!("Ignoring text frame: {} bytes", text.len());
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!("Voice WebSocket close received");
                return;
            }
            Err(e) => {
                warn!("Voice WebSocket receive error: {}", e);
                return;
            }
        }
    }
    info!("Voice WebSocket connection closed by client");
}

/// Hand one caller frame to the transcriber in pieces it accepts.
async fn forward_audio(transcriber: &mut dyn BaseSTT, audio: Bytes) -> Result<(), STTError> {
    let mut offset = 0;
    while offset < audio.len() {
        let end = (offset + AUDIO_FORWARD_CHUNK_SIZE).min(audio.len());
        transcriber.send_audio(audio.slice(offset..end)).await?;
        offset = end;
    }
    Ok(())
}

async fn write_messages(
    mut sender: SplitSink<WebSocket, Message>,
    mut message_rx: mpsc::Receiver<MessageRoute>,
) {
    while let Some(route) = message_rx.recv().await {
        let result = match route {
            MessageRoute::Outgoing(message) => match serde_json::to_string(&message) {
                Ok(json) => sender.send(Message::Text(json.into())).await,
                Err(e) => {
                    error!("Failed to serialize outgoing message: {}", e);
                    continue;
                }
            },
            MessageRoute::Close => {
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
        };

        if let Err(e) = result {
            debug!("Failed to send WebSocket message: {}", e);
            break;
        }
    }
}

async fn send_and_close(message_tx: &mpsc::Sender<MessageRoute>, message: OutgoingMessage) {
    let _ = message_tx.send(MessageRoute::Outgoing(message)).await;
    let _ = message_tx.send(MessageRoute::Close).await;
}

/// Let the writer flush what is queued, then stop it.
async fn finish(message_tx: mpsc::Sender<MessageRoute>, mut sender_task: JoinHandle<()>) {
    drop(message_tx);
    if tokio::time::timeout(SENDER_DRAIN_TIMEOUT, &mut sender_task)
        .await
        .is_err()
    {
        sender_task.abort();
    }
}
