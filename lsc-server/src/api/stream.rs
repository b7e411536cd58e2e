//! WebSocket streaming endpoints
//!
//! - `/audio`: a producer sends raw 16-bit little-endian mono PCM at 16 kHz
//!   as binary frames. Each frame is classified on its own.
//! - `/audio_listen`: a passive listener receives every report produced on
//!   any `/audio` connection.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use lsc_common::{audio::pcm16le_samples, ClassificationReport};
use serde_json::json;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::capture::StreamCapture;
use crate::{ApiError, AppState};

/// GET /audio (WebSocket upgrade)
pub async fn producer_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_producer(socket, state))
}

/// GET /audio_listen (WebSocket upgrade)
pub async fn listener_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_listener(socket, state))
}

async fn handle_producer(mut socket: WebSocket, state: AppState) {
    let connection = Uuid::new_v4();
    info!(producer = %connection, "Producer connected");

    let mut capture = open_capture(&state);
    let mut chunks: u64 = 0;

    while let Some(message) = socket.recv().await {
        let message = match message {
            Ok(message) => message,
            Err(e) => {
                warn!(producer = %connection, "Producer socket error: {}", e);
                break;
            }
        };

        match message {
            Message::Binary(data) => {
                chunks += 1;
                let reply = match analyze_chunk(&state, &mut capture, data).await {
                    Ok(report) => {
                        let delivered = state.listeners.publish(&report).await;
                        debug!(
                            producer = %connection,
                            chunk = chunks,
                            class = %report.label,
                            confidence = report.confidence,
                            listeners = delivered,
                            "Chunk classified"
                        );
                        if state.stream.reply_to_producer {
                            encode_report(&report)
                        } else {
                            None
                        }
                    }
                    Err(e) => {
                        warn!(producer = %connection, chunk = chunks, "Chunk failed: {}", e);
                        Some(json!({ "error": e.to_string() }).to_string())
                    }
                };

                if let Some(text) = reply {
                    if socket.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            }
            Message::Text(_) => {
                warn!(producer = %connection, "Ignoring text frame on /audio");
            }
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    if let Some(capture) = capture {
        let path = capture.path().to_path_buf();
        match capture.finish() {
            Ok(samples) => info!(
                producer = %connection,
                samples,
                "Stream capture written to {}",
                path.display()
            ),
            Err(e) => warn!(producer = %connection, "Failed to finalize stream capture: {}", e),
        }
    }

    info!(producer = %connection, chunks, "Producer disconnected");
}

fn open_capture(state: &AppState) -> Option<StreamCapture> {
    let path = state.stream.capture_target()?;
    let Some(claim) = state.capture_slot.try_claim() else {
        warn!(
            "Stream capture skipped, {} is held by another producer",
            path.display()
        );
        return None;
    };
    match StreamCapture::create_claimed(path, claim) {
        Ok(capture) => Some(capture),
        Err(e) => {
            warn!("Stream capture disabled, cannot create {}: {}", path.display(), e);
            None
        }
    }
}

/// Capture and classify one producer chunk
///
/// A capture write failure disables capture for the rest of the connection
/// without failing the chunk.
pub(crate) async fn analyze_chunk(
    state: &AppState,
    capture: &mut Option<StreamCapture>,
    data: Vec<u8>,
) -> Result<ClassificationReport, ApiError> {
    let samples = pcm16le_samples(&data)?;

    if let Some(writer) = capture.as_mut() {
        if let Err(e) = writer.append(&samples) {
            warn!("Stream capture write failed, disabling capture: {}", e);
            *capture = None;
        }
    }

    let inference = state.inference.clone();
    let classification = tokio::task::spawn_blocking(move || inference.classify_pcm16(&data))
        .await
        .map_err(|e| ApiError::Internal(format!("Inference task failed: {}", e)))??;

    Ok(classification.report())
}

fn encode_report(report: &ClassificationReport) -> Option<String> {
    match serde_json::to_string(report) {
        Ok(text) => Some(text),
        Err(e) => {
            error!("Failed to encode report: {}", e);
            None
        }
    }
}

async fn handle_listener(socket: WebSocket, state: AppState) {
    let (id, mut updates) = state.listeners.register().await;
    info!(listener = %id, "Listener connected");

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(report) = update else { break };
                let Some(text) = encode_report(&report) else { continue };
                if sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    state.listeners.unregister(id).await;
    info!(listener = %id, "Listener disconnected");
}

/// Build streaming routes
pub fn stream_routes() -> Router<AppState> {
    Router::new()
        .route("/audio", get(producer_socket))
        .route("/audio_listen", get(listener_socket))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use burn::backend::ndarray::NdArrayDevice;
    use lsc_common::classifier::{ClassifierNetConfig, InferenceBackend};
    use lsc_common::{Classifier, InferenceContext};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn test_state(config: &ServerConfig) -> AppState {
        let net = ClassifierNetConfig::new().init::<InferenceBackend>(&NdArrayDevice::default());
        let inference = Arc::new(InferenceContext::new(Classifier::from_net(net)));
        AppState::new(inference, config)
    }

    fn chunk(samples: usize) -> Vec<u8> {
        (0..samples)
            .flat_map(|i| (((i % 64) as i16 - 32) * 500).to_le_bytes())
            .collect()
    }

    #[tokio::test]
    async fn test_chunk_is_captured_and_published() {
        // Given: a registered listener and capture into a temp file
        let temp_dir = TempDir::new().unwrap();
        let capture_path = temp_dir.path().join("capture.wav");
        let state = test_state(&ServerConfig::default());
        let (_id, mut rx) = state.listeners.register().await;
        let mut capture = Some(StreamCapture::create(&capture_path).unwrap());

        // When: one 1600-sample chunk is analyzed and published
        let report = analyze_chunk(&state, &mut capture, chunk(1600)).await.unwrap();
        state.listeners.publish(&report).await;

        // Then: the listener sees the same report and the capture holds the samples
        assert_eq!(rx.recv().await.unwrap(), report);
        assert!((0.0..=1.0).contains(&report.confidence));
        assert_eq!(capture.unwrap().finish().unwrap(), 1600);
    }

    #[tokio::test]
    async fn test_odd_chunk_is_rejected_without_capture() {
        let temp_dir = TempDir::new().unwrap();
        let state = test_state(&ServerConfig::default());
        let mut capture = Some(StreamCapture::create(&temp_dir.path().join("c.wav")).unwrap());

        let result = analyze_chunk(&state, &mut capture, vec![0u8; 3]).await;

        assert!(matches!(
            result,
            Err(ApiError::Processing(lsc_common::Error::InvalidInput(_)))
        ));
        assert_eq!(capture.unwrap().finish().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_second_producer_runs_without_capture() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = ServerConfig::default();
        config.stream.capture_path = temp_dir.path().join("capture.wav");
        let state = test_state(&config);

        let first = open_capture(&state);
        assert!(first.is_some());
        assert!(open_capture(&state).is_none());

        // The file is released once the owning connection finishes
        assert_eq!(first.unwrap().finish().unwrap(), 0);
        assert!(open_capture(&state).is_some());
    }

    #[tokio::test]
    async fn test_capture_disabled_by_config() {
        let mut config = ServerConfig::default();
        config.stream.capture_enabled = false;
        let state = test_state(&config);

        assert!(open_capture(&state).is_none());
        let mut capture = None;
        assert!(analyze_chunk(&state, &mut capture, chunk(320)).await.is_ok());
    }
}
