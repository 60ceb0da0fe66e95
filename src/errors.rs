//! HTTP error responses.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::credentials::CredentialError;

pub type AppResult<T> = Result<T, AppError>;

/// Detail returned for every failed `POST /save_api_keys`
pub const SAVE_KEYS_FAILED: &str = "Failed to save API keys.";

/// Errors returned by HTTP handlers, rendered as `{"detail": "..."}`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Internal(String),
}

impl From<CredentialError> for AppError {
    fn from(e: CredentialError) -> Self {
        error!("Saving API keys failed: {}", e);
        AppError::Internal(SAVE_KEYS_FAILED.to_string())
    }
}

/// Only the key bundle route takes a JSON body.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        error!(status = %rejection.status(), "Unreadable API key bundle");
        AppError::Internal(SAVE_KEYS_FAILED.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}
