//! API error handling.
//!
//! Errors are rendered as `{"error": "<message>"}`, the shape the publisher
//! reads its rejection message from.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use supplydna_core::error::SupplyDnaError;

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Method not allowed error.
    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    }

    /// Internal server error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Returns the HTTP status.
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

/// Error response body.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

impl From<SupplyDnaError> for ApiError {
    fn from(err: SupplyDnaError) -> Self {
        match &err {
            SupplyDnaError::InvalidInput(msg) | SupplyDnaError::ValidationError(msg) => {
                ApiError::bad_request(msg.clone())
            }
            SupplyDnaError::JsonError(_) => ApiError::bad_request(err.to_string()),
            SupplyDnaError::ConfigError(msg) => {
                tracing::error!(error = %msg, "Proxy misconfigured");
                ApiError::internal(msg.clone())
            }
            SupplyDnaError::PinningFailed(reason) => {
                tracing::error!(error = %reason, "Pinata upload error");
                ApiError::internal(format!("Failed to upload to Pinata: {}", reason))
            }
            _ => {
                tracing::error!(error = %err, "Internal error");
                ApiError::internal("An internal error occurred")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::new(rejection.status(), rejection.body_text())
    }
}
