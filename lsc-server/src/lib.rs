//! lsc-server library interface
//!
//! Exposes the router and state for integration testing

pub mod api;
pub mod capture;
pub mod config;
pub mod error;
pub mod listeners;
pub mod logging;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use lsc_common::InferenceContext;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::capture::CaptureSlot;
use crate::config::{ServerConfig, StreamConfig};
use crate::listeners::ListenerRegistry;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Feature extractor and loaded model, read-only after startup
    pub inference: Arc<InferenceContext>,
    /// Passive `/audio_listen` connections
    pub listeners: ListenerRegistry,
    pub stream: StreamConfig,
    /// Single-writer claim on the stream capture file
    pub capture_slot: CaptureSlot,
    pub max_upload_bytes: usize,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(inference: Arc<InferenceContext>, config: &ServerConfig) -> Self {
        Self {
            inference,
            listeners: ListenerRegistry::new(config.stream.listener_buffer),
            stream: config.stream.clone(),
            capture_slot: CaptureSlot::default(),
            max_upload_bytes: config.max_upload_bytes,
            startup_time: Utc::now(),
        }
    }
}

/// GET /
async fn root() -> Json<Value> {
    Json(json!({ "message": "Lung Sound Classification API is running." }))
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        .route("/", get(root))
        .merge(api::health_routes())
        .merge(api::predict_routes())
        .merge(api::stream_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
