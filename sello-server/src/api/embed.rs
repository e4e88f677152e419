use std::path::Path as FsPath;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use tracing::info;

use sello_core::{MessageSampler, metrics};

use crate::AppState;
use crate::artifacts;
use crate::audio;
use crate::error::ApiError;
use crate::models::{BatchEmbedResponse, EmbedItem, EmbedResponse};

fn internal<E: std::fmt::Display>(e: E) -> ApiError {
    ApiError::Internal(e.to_string())
}

fn file_stem(name: &str) -> &str {
    FsPath::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("audio")
}

fn extension_of(name: &str) -> Option<String> {
    FsPath::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_string)
}

pub async fn embed_single(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<EmbedResponse>, ApiError> {
    let form = super::read_form(multipart).await?;
    let input = form
        .files
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::BadRequest("missing file upload".into()))?;
    if !input.content_type.starts_with("audio") {
        return Err(ApiError::NotAudio);
    }

    let response = tokio::task::spawn_blocking(move || -> Result<EmbedResponse, ApiError> {
        let ext = extension_of(&input.name);
        let wave = state.decoder.decode_bytes(input.bytes, ext.as_deref())?;

        let mut sampler = MessageSampler::from_entropy();
        let outcome =
            sello_core::embed(&state.session, &wave, state.settings.message_bits, &mut sampler)?;
        let rms = metrics::injected_rms(&outcome.delta);
        let si_snr = metrics::si_snr(&wave, &outcome.watermarked);

        let wav = audio::encode_wav_16bit(&outcome.watermarked, state.session.sample_rate())
            .map_err(internal)?;
        let fname = state
            .store
            .put(&format!("{}_wm.wav", file_stem(&input.name)), &wav)
            .map_err(internal)?;

        info!(item = %input.name, rms, si_snr, "embedded watermark");
        Ok(EmbedResponse {
            download_url: format!("/embed/download/{fname}"),
            rms,
            si_snr,
        })
    })
    .await
    .map_err(internal)??;

    Ok(Json(response))
}

pub async fn download(
    State(state): State<Arc<AppState>>,
    Path(fname): Path<String>,
) -> Result<Response, ApiError> {
    let bytes = state.store.get(&fname).ok_or(ApiError::ArtifactNotFound)?;
    let media_type = if fname.ends_with(".zip") {
        "application/zip"
    } else if fname.ends_with(".wav") {
        "audio/wav"
    } else {
        "application/octet-stream"
    };
    Ok((
        [
            (header::CONTENT_TYPE, media_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{fname}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// Embed a watermark into every valid audio file of a folder upload.
///
/// Returns per-file metrics plus one zip link bundling all produced files.
/// Non-audio or unreadable entries are silently absent from the results.
pub async fn embed_folder(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<BatchEmbedResponse>, ApiError> {
    let form = super::read_form(multipart).await?;
    let message_bits = super::field_or(&form.fields, "message_bits", state.settings.message_bits)?;
    let items = form.files;

    let response = tokio::task::spawn_blocking(move || -> Result<BatchEmbedResponse, ApiError> {
        let embedded = sello_core::embed_batch_parallel(
            &state.decoder,
            &state.session,
            &items,
            message_bits,
            None,
        )?;

        let mut results = Vec::with_capacity(embedded.len());
        let mut entries = Vec::with_capacity(embedded.len());
        for item in embedded {
            let wav = audio::encode_wav_16bit(&item.watermarked, state.session.sample_rate())
                .map_err(internal)?;
            let fname = state
                .store
                .put(&format!("{}_wm.wav", file_stem(&item.name)), &wav)
                .map_err(internal)?;
            results.push(EmbedItem {
                filename: item.name,
                download_url: format!("/embed/download/{fname}"),
                rms: item.rms,
                si_snr: item.si_snr,
            });
            entries.push((fname, wav));
        }

        let archive = artifacts::zip_archive(&entries).map_err(internal)?;
        let zip_name = state.store.put("watermarked.zip", &archive).map_err(internal)?;

        info!(
            submitted = items.len(),
            embedded = results.len(),
            "embed folder complete"
        );
        Ok(BatchEmbedResponse {
            results,
            zip_download_url: format!("/embed/download/{zip_name}"),
        })
    })
    .await
    .map_err(internal)??;

    Ok(Json(response))
}
