use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("only audio files are supported")]
    NotAudio,

    #[error("{0}")]
    BadRequest(String),

    #[error("file not found")]
    ArtifactNotFound,

    #[error(transparent)]
    Core(#[from] sello_core::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotAudio | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ArtifactNotFound => StatusCode::NOT_FOUND,
            ApiError::Core(sello_core::Error::InputFormat(_))
            | ApiError::Core(sello_core::Error::InvalidMessageBits { .. }) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Core(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
