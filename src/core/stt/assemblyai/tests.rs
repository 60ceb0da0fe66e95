use super::*;
use crate::core::stt::base::{BaseSTT, STTConfig, STTConnectionState, STTError, STTResult};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, mpsc};
use tokio_tungstenite::tungstenite::protocol::Message;

fn base_config() -> STTConfig {
    STTConfig {
        api_key: "test_key".to_string(),
        ..Default::default()
    }
}

mod message_tests {
    use super::*;

    #[test]
    fn test_parse_begin() {
        let msg = AssemblyAIMessage::parse(r#"{"type":"Begin","id":"abc","expires_at":1}"#)
            .unwrap();
        assert!(matches!(msg, AssemblyAIMessage::Begin(b) if b.id == "abc"));
    }

    #[test]
    fn test_unformatted_turn_is_held_back() {
        let msg = AssemblyAIMessage::parse(
            r#"{"type":"Turn","turn_order":0,"transcript":"hello world","end_of_turn":true,"turn_is_formatted":false,"words":[]}"#,
        )
        .unwrap();

        let AssemblyAIMessage::Turn(turn) = msg else {
            panic!("expected turn");
        };
        assert!(!turn.is_deliverable(true));
        assert!(turn.is_deliverable(false));
    }

    #[test]
    fn test_blank_turn_is_never_delivered() {
        let msg = AssemblyAIMessage::parse(
            r#"{"type":"Turn","transcript":"   ","end_of_turn":true,"turn_is_formatted":true}"#,
        )
        .unwrap();

        let AssemblyAIMessage::Turn(turn) = msg else {
            panic!("expected turn");
        };
        assert!(!turn.is_deliverable(true));
    }

    #[test]
    fn test_turn_confidence_is_word_mean() {
        let msg = AssemblyAIMessage::parse(
            r#"{"type":"Turn","transcript":"a b","end_of_turn":true,"words":[{"start":0,"end":1,"confidence":0.5,"text":"a"},{"start":1,"end":2,"confidence":1.0,"text":"b"}]}"#,
        )
        .unwrap();

        let AssemblyAIMessage::Turn(turn) = msg else {
            panic!("expected turn");
        };
        assert!((turn.confidence() - 0.75).abs() < f32::EPSILON);
    }

    #[test]
    fn test_unknown_type_is_kept() {
        let msg = AssemblyAIMessage::parse(r#"{"type":"SpeechStarted"}"#).unwrap();
        assert!(matches!(msg, AssemblyAIMessage::Unknown(_)));
    }

    #[test]
    fn test_serialize_terminate() {
        let json = serde_json::to_string(&TerminateMessage::default()).unwrap();
        assert_eq!(json, r#"{"type":"Terminate"}"#);
    }
}

mod client_tests {
    use super::*;

    #[test]
    fn test_new_rejects_empty_api_key() {
        let result = AssemblyAISTT::new(STTConfig::default());
        assert!(matches!(result, Err(STTError::AuthenticationFailed(_))));
    }

    #[test]
    fn test_new_rejects_unsupported_sample_rate() {
        let result = AssemblyAISTT::new(STTConfig {
            sample_rate: 96000,
            ..base_config()
        });
        assert!(matches!(result, Err(STTError::ConfigurationError(_))));
    }

    #[test]
    fn test_new_client_is_idle() {
        let stt = AssemblyAISTT::new(base_config()).unwrap();
        assert_eq!(stt.connection_state(), STTConnectionState::Idle);
        assert!(!stt.is_ready());
        assert_eq!(stt.get_provider_info(), "AssemblyAI Streaming STT v3");
        assert_eq!(stt.get_config().unwrap().sample_rate, 16000);
    }

    #[tokio::test]
    async fn test_send_audio_before_connect_fails() {
        let mut stt = AssemblyAISTT::new(base_config()).unwrap();
        let result = stt.send_audio(Bytes::from(vec![0u8; 320])).await;
        assert!(matches!(result, Err(STTError::ConnectionFailed(_))));
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent_without_session() {
        let mut stt = AssemblyAISTT::new(base_config()).unwrap();
        stt.disconnect().await.unwrap();
        stt.disconnect().await.unwrap();
        assert_eq!(stt.connection_state(), STTConnectionState::Closed);
        assert!(stt.connect().await.is_err());
    }

    #[tokio::test]
    async fn test_handle_turn_delivers_only_formatted_final() {
        let (tx, mut rx) = mpsc::channel::<STTResult>(8);
        let session_id = Arc::new(RwLock::new(None));

        for frame in [
            r#"{"type":"Turn","transcript":"hello","end_of_turn":false}"#,
            r#"{"type":"Turn","transcript":"hello world","end_of_turn":true,"turn_is_formatted":false}"#,
            r#"{"type":"Turn","transcript":"Hello world.","end_of_turn":true,"turn_is_formatted":true}"#,
        ] {
            let keep_going = AssemblyAISTT::handle_websocket_message(
                Message::Text(frame.into()),
                &tx,
                &session_id,
                true,
            )
            .await
            .unwrap();
            assert!(keep_going);
        }

        let delivered = rx.try_recv().unwrap();
        assert_eq!(delivered.transcript, "Hello world.");
        assert!(delivered.is_final);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_handle_error_maps_auth_failure() {
        let (tx, _rx) = mpsc::channel::<STTResult>(8);
        let session_id = Arc::new(RwLock::new(None));

        let result = AssemblyAISTT::handle_websocket_message(
            Message::Text(
                r#"{"type":"Error","error_code":"invalid_api_key","error":"bad key"}"#.into(),
            ),
            &tx,
            &session_id,
            true,
        )
        .await;

        assert_eq!(
            result,
            Err(STTError::AuthenticationFailed("bad key".to_string()))
        );
    }

    #[tokio::test]
    async fn test_handle_termination_and_close_stop_reading() {
        let (tx, _rx) = mpsc::channel::<STTResult>(8);
        let session_id = Arc::new(RwLock::new(None));

        let terminated = AssemblyAISTT::handle_websocket_message(
            Message::Text(r#"{"type":"Termination","audio_duration_seconds":1.5}"#.into()),
            &tx,
            &session_id,
            true,
        )
        .await
        .unwrap();
        assert!(!terminated);

        let closed =
            AssemblyAISTT::handle_websocket_message(Message::Close(None), &tx, &session_id, true)
                .await
                .unwrap();
        assert!(!closed);
    }
}

/// Sessions against a local WebSocket server standing in for AssemblyAI.
mod session_tests {
    use super::*;
    use futures::{SinkExt, StreamExt};
    use std::future::Future;
    use std::pin::Pin;
    use tokio::net::TcpListener;

    fn config_for(addr: std::net::SocketAddr) -> AssemblyAISTTConfig {
        AssemblyAISTTConfig {
            endpoint_override: Some(format!("ws://{addr}")),
            ..AssemblyAISTTConfig::from_base(base_config())
        }
    }

    async fn wait_for_state(stt: &AssemblyAISTT, predicate: impl Fn(&STTConnectionState) -> bool) {
        for _ in 0..100 {
            if predicate(&stt.connection_state()) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("state never reached, last: {:?}", stt.connection_state());
    }

    #[tokio::test]
    async fn test_session_delivers_turn_and_terminates_on_disconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();
            ws.send(Message::Text(
                r#"{"type":"Begin","id":"session-1","expires_at":0}"#.into(),
            ))
            .await
            .unwrap();

            let mut audio_bytes = 0usize;
            let mut saw_terminate = false;
            while let Some(Ok(frame)) = ws.next().await {
                match frame {
                    Message::Binary(data) => {
                        audio_bytes += data.len();
                        ws.send(Message::Text(
                            r#"{"type":"Turn","transcript":"what is rust","end_of_turn":true,"turn_is_formatted":false}"#.into(),
                        ))
                        .await
                        .unwrap();
                        ws.send(Message::Text(
                            r#"{"type":"Turn","transcript":"What is Rust?","end_of_turn":true,"turn_is_formatted":true}"#.into(),
                        ))
                        .await
                        .unwrap();
                    }
                    Message::Text(text) if text.contains("Terminate") => {
                        saw_terminate = true;
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            (audio_bytes, saw_terminate)
        });

        let mut stt = AssemblyAISTT::with_config(config_for(addr)).unwrap();
        let (utter_tx, mut utter_rx) = mpsc::unbounded_channel::<String>();
        stt.on_result(Arc::new(move |result| {
            let utter_tx = utter_tx.clone();
            Box::pin(async move {
                let _ = utter_tx.send(result.transcript);
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        }))
        .await
        .unwrap();

        stt.connect().await.unwrap();
        assert!(stt.is_ready());
        assert_eq!(stt.get_session_id().await.as_deref(), Some("session-1"));

        stt.send_audio(Bytes::from(vec![0u8; 640])).await.unwrap();

        let utterance = tokio::time::timeout(Duration::from_secs(5), utter_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(utterance, "What is Rust?");

        stt.disconnect().await.unwrap();
        stt.disconnect().await.unwrap();
        assert_eq!(stt.connection_state(), STTConnectionState::Closed);

        let (audio_bytes, saw_terminate) = server.await.unwrap();
        assert_eq!(audio_bytes, 640);
        assert!(saw_terminate);

        let after_close = stt.send_audio(Bytes::from(vec![0u8; 10])).await;
        assert!(after_close.is_err());
    }

    #[tokio::test]
    async fn test_provider_error_fails_later_sends() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();
            ws.send(Message::Text(r#"{"type":"Begin","id":"s","expires_at":0}"#.into()))
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
            ws.send(Message::Text(
                r#"{"type":"Error","error_code":"invalid_api_key","error":"revoked"}"#.into(),
            ))
            .await
            .unwrap();
            while ws.next().await.is_some() {}
        });

        let mut stt = AssemblyAISTT::with_config(config_for(addr)).unwrap();
        let (err_tx, mut err_rx) = mpsc::unbounded_channel::<STTError>();
        stt.on_error(Arc::new(move |error| {
            let err_tx = err_tx.clone();
            Box::pin(async move {
                let _ = err_tx.send(error);
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        }))
        .await
        .unwrap();

        stt.connect().await.unwrap();
        wait_for_state(&stt, |s| matches!(s, STTConnectionState::Failed(_))).await;

        let result = stt.send_audio(Bytes::from(vec![0u8; 320])).await;
        assert_eq!(
            result,
            Err(STTError::AuthenticationFailed("revoked".to_string()))
        );

        let reported = tokio::time::timeout(Duration::from_secs(2), err_rx.recv())
            .await
            .unwrap();
        assert!(matches!(reported, Some(STTError::AuthenticationFailed(_))));

        stt.disconnect().await.unwrap();
        assert_eq!(stt.connection_state(), STTConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_connect_refused_reports_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut stt = AssemblyAISTT::with_config(config_for(addr)).unwrap();
        let result = stt.connect().await;

        assert!(matches!(result, Err(STTError::ConnectionFailed(_))));
        assert!(matches!(
            stt.connection_state(),
            STTConnectionState::Failed(_)
        ));
        stt.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn test_oversized_chunk_is_rejected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();
            ws.send(Message::Text(r#"{"type":"Begin","id":"s","expires_at":0}"#.into()))
                .await
                .unwrap();
            while ws.next().await.is_some() {}
        });

        let mut stt = AssemblyAISTT::with_config(config_for(addr)).unwrap();
        stt.connect().await.unwrap();

        let result = stt.send_audio(Bytes::from(vec![0u8; 256 * 1024 + 1])).await;
        assert!(matches!(result, Err(STTError::InvalidAudioFormat(_))));
        assert!(stt.is_ready());

        stt.disconnect().await.unwrap();
    }
}
