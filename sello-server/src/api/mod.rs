pub mod detect;
pub mod embed;

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::extract::{DefaultBodyLimit, Multipart};
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;

use sello_core::batch::BatchInput;

use crate::AppState;
use crate::error::ApiError;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/embed", post(embed::embed_single))
        .route("/embed/folder", post(embed::embed_folder))
        .route("/embed/download/{fname}", get(embed::download))
        .route("/detect", post(detect::detect_single))
        .route("/detect/folder", post(detect::detect_folder))
        .layer(DefaultBodyLimit::max(512 * 1024 * 1024))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// A drained multipart request: uploaded files plus plain form fields.
pub(crate) struct FormData {
    pub files: Vec<BatchInput>,
    pub fields: HashMap<String, String>,
}

pub(crate) async fn read_form(mut multipart: Multipart) -> Result<FormData, ApiError> {
    let mut files = Vec::new();
    let mut fields = HashMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if let Some(filename) = field.file_name().map(str::to_string) {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            files.push(BatchInput {
                name: filename,
                content_type,
                bytes: bytes.to_vec(),
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            fields.insert(name, value);
        }
    }

    Ok(FormData { files, fields })
}

/// Parse an optional form field, falling back to the configured default.
pub(crate) fn field_or<T: std::str::FromStr>(
    fields: &HashMap<String, String>,
    name: &str,
    default: T,
) -> Result<T, ApiError> {
    match fields.get(name) {
        Some(raw) => raw
            .parse()
            .map_err(|_| ApiError::BadRequest(format!("invalid {name}: {raw}"))),
        None => Ok(default),
    }
}
