//! API route handlers.

use std::sync::Arc;

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde_json::Value;
use tracing::{debug, info};

use supplydna_core::types::MetadataDocument;

use crate::dto::{HealthResponse, UploadResponse};
use crate::error::ApiError;
use crate::state::AppState;

type Result<T> = std::result::Result<T, ApiError>;

/// POST /api/pinata-upload, POST /upload
pub async fn upload(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<UploadResponse>> {
    if !state.pinata.is_configured() {
        return Err(ApiError::internal(
            "Pinata API keys not configured. Please set PINATA_API_KEY and PINATA_SECRET_API_KEY environment variables.",
        ));
    }

    let Json(body) = payload?;
    debug!(body = %body, "Pinata upload request received");

    let document = MetadataDocument::new(body)?;
    let name = document
        .as_value()
        .get("name")
        .and_then(Value::as_str)
        .map(String::from);

    let cid = state.pinata.pin_json(&document, name.as_deref()).await?;

    info!(%cid, "Pinata upload successful");
    Ok(Json(UploadResponse {
        ipfs_hash: cid.to_string(),
    }))
}

/// Any other method on the upload paths.
pub async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}

/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        pinata_configured: state.pinata.is_configured(),
    })
}
