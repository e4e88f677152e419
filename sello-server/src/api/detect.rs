use std::path::Path as FsPath;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Multipart, State};
use tracing::info;

use crate::AppState;
use crate::error::ApiError;
use crate::models::{BatchDetectResponse, DetectItem, DetectResponse};

pub async fn detect_single(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<DetectResponse>, ApiError> {
    let form = super::read_form(multipart).await?;
    let input = form
        .files
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::BadRequest("missing file upload".into()))?;
    if !input.content_type.starts_with("audio") {
        return Err(ApiError::NotAudio);
    }

    let response = tokio::task::spawn_blocking(move || -> Result<DetectResponse, ApiError> {
        let ext = FsPath::new(&input.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_string);
        let wave = state.decoder.decode_bytes(input.bytes, ext.as_deref())?;
        let detection = sello_core::detect(&state.session, &wave, state.settings.threshold)?;

        info!(
            item = %input.name,
            probability = detection.probability,
            "scored clip"
        );
        Ok(DetectResponse {
            probability: detection.probability,
            is_watermarked: detection.is_watermarked,
        })
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(response))
}

/// Score every valid audio file of a folder upload.
///
/// Non-audio or unreadable entries are silently absent from the results.
pub async fn detect_folder(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<BatchDetectResponse>, ApiError> {
    let form = super::read_form(multipart).await?;
    let threshold = super::field_or(&form.fields, "threshold", state.settings.threshold)?;
    let items = form.files;

    let response = tokio::task::spawn_blocking(move || -> Result<BatchDetectResponse, ApiError> {
        let detected =
            sello_core::detect_batch_parallel(&state.decoder, &state.session, &items, threshold)?;

        info!(
            submitted = items.len(),
            scored = detected.len(),
            "detect folder complete"
        );
        Ok(BatchDetectResponse {
            results: detected
                .into_iter()
                .map(|d| DetectItem {
                    filename: d.name,
                    probability: d.probability,
                    is_watermarked: d.is_watermarked,
                })
                .collect(),
        })
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(response))
}
