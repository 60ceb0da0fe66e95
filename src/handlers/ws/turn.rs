//! Turn handling for one voice connection.
//!
//! Finalized utterances arrive on a queue fed by the transcription callback.
//! A single worker drains it, so turns never overlap: acknowledge the
//! utterance, route it, send the reply text, then stream one audio message
//! per synthesized sentence in sentence order.

use std::panic::AssertUnwindSafe;

use futures::{FutureExt, StreamExt, stream};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::core::llm::ConversationHistory;
use crate::core::router::ResponseRouter;
use crate::core::sentences::split_sentences;
use crate::core::tts::SpeechSynthesizer;

use super::messages::{MessageRoute, OutgoingMessage};

/// Sent when a turn fails unexpectedly
pub const TURN_FAILURE_MESSAGE: &str = "Sorry, I encountered an error processing your request.";

/// The caller's writer is gone; nothing more can be delivered.
#[derive(Debug)]
struct CallerGone;

pub(super) struct TurnWorker {
    router: ResponseRouter,
    synthesizer: SpeechSynthesizer,
    synthesis_concurrency: usize,
    message_tx: mpsc::Sender<MessageRoute>,
}

impl TurnWorker {
    pub(super) fn new(
        router: ResponseRouter,
        synthesizer: SpeechSynthesizer,
        synthesis_concurrency: usize,
        message_tx: mpsc::Sender<MessageRoute>,
    ) -> Self {
        Self {
            router,
            synthesizer,
            synthesis_concurrency: synthesis_concurrency.max(1),
            message_tx,
        }
    }

    /// Process utterances until the queue closes or the caller goes away.
    pub(super) async fn run(self, mut utterances: mpsc::UnboundedReceiver<String>) {
        let mut history = ConversationHistory::new();

        while let Some(utterance) = utterances.recv().await {
            let turn = AssertUnwindSafe(self.handle_turn(&utterance, &mut history));
            match turn.catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(CallerGone)) => {
                    debug!("Caller gone, stopping turn worker");
                    return;
                }
                Err(_) => {
                    error!("Turn handling panicked");
                    if self
                        .send(OutgoingMessage::error(TURN_FAILURE_MESSAGE))
                        .await
                        .is_err()
                    {
                        return;
                    }
                }
            }
        }
    }

    async fn handle_turn(
        &self,
        utterance: &str,
        history: &mut ConversationHistory,
    ) -> Result<(), CallerGone> {
        info!(chars = utterance.len(), "Handling turn");
        self.send(OutgoingMessage::Final {
            text: utterance.to_string(),
        })
        .await?;

        let reply = self.router.respond(utterance, history).await;
        if let Some(reason) = reply.fallback {
            info!(%reason, "Replying with fallback");
        }
        *history = reply.history;

        self.send(OutgoingMessage::Assistant {
            text: reply.text.clone(),
        })
        .await?;

        let sentences = split_sentences(&reply.text);
        let total = sentences.len();
        let synthesizer = &self.synthesizer;
        let mut audio = stream::iter(sentences.into_iter().enumerate())
            .map(|(index, sentence)| async move {
                (index, synthesizer.synthesize(&sentence).await)
            })
            .buffered(self.synthesis_concurrency);

        let mut sent = 0;
        while let Some((index, bytes)) = audio.next().await {
            match bytes {
                Some(bytes) => {
                    self.send(OutgoingMessage::audio(index, &bytes)).await?;
                    sent += 1;
                }
                None => debug!(index, "No audio for sentence, skipping"),
            }
        }

        debug!(sentences = total, sent, "Turn complete");
        Ok(())
    }

    async fn send(&self, message: OutgoingMessage) -> Result<(), CallerGone> {
        self.message_tx
            .send(MessageRoute::Outgoing(message))
            .await
            .map_err(|_| CallerGone)
    }
}
