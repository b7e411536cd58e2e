//! WAV upload classification

use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use lsc_common::ClassificationReport;
use tracing::{debug, info};

use crate::{ApiError, ApiResult, AppState};

/// Multipart field carrying the upload
const FILE_FIELD: &str = "file";

/// POST /predict
///
/// Classifies one uploaded `.wav` file. The filename check is
/// case-sensitive; the file contents are not sniffed beforehand.
pub async fn predict(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<ClassificationReport>> {
    let (file_name, bytes) = loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
            .ok_or_else(|| ApiError::BadRequest(format!("Missing '{}' field", FILE_FIELD)))?;

        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        if !file_name.ends_with(".wav") {
            return Err(ApiError::BadRequest("Only .wav files are supported".to_string()));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;
        break (file_name, bytes);
    };

    debug!(file = %file_name, bytes = bytes.len(), "Received upload");

    let inference = state.inference.clone();
    let classification = tokio::task::spawn_blocking(move || inference.classify_wav_bytes(&bytes))
        .await
        .map_err(|e| ApiError::Internal(format!("Inference task failed: {}", e)))??;

    let report = classification.report();
    info!(
        file = %file_name,
        class = %report.label,
        confidence = report.confidence,
        "Upload classified"
    );

    Ok(Json(report))
}

/// Build upload routes
pub fn predict_routes() -> Router<AppState> {
    Router::new().route("/predict", post(predict))
}
