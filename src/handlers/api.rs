use std::sync::Arc;

use axum::{
    extract::{State, rejection::JsonRejection},
    response::Json,
};
use serde::Serialize;
use tracing::info;

use crate::credentials::{ApiKeyBundle, SecretName};
use crate::errors::AppResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SaveKeysResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct ValidateKeysResponse {
    pub valid: bool,
    pub missing_keys: Vec<SecretName>,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "OK" })
}

/// Persist a new key bundle and reload the credential store.
///
/// Running voice sessions keep the keys they started with. An unreadable
/// body fails the same way as a failed write.
pub async fn save_api_keys(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ApiKeyBundle>, JsonRejection>,
) -> AppResult<Json<SaveKeysResponse>> {
    let Json(bundle) = payload?;
    let secrets = state.credentials.save(&bundle).await?;
    info!(
        path = %state.credentials.path().display(),
        missing = secrets.missing().len(),
        "Saved API keys"
    );
    Ok(Json(SaveKeysResponse { success: true }))
}

pub async fn validate_api_keys(State(state): State<Arc<AppState>>) -> Json<ValidateKeysResponse> {
    let missing_keys = state.credentials.validate();
    Json(ValidateKeysResponse {
        valid: missing_keys.is_empty(),
        missing_keys,
    })
}
