use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::types::ErrorBody;
use service::errors::ServiceError;
use thiserror::Error;
use tracing::{error, warn};

/// JSON error response: `{"error": "...", "message": "..."}` with a status code.
#[derive(Debug)]
pub struct JsonApiError {
    pub status: StatusCode,
    pub error: &'static str,
    pub message: Option<String>,
}

impl JsonApiError {
    pub fn new(status: StatusCode, error: &'static str, message: Option<String>) -> Self {
        Self { status, error, message }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Bad Request", Some(message.into()))
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized", Some(message.into()))
    }
}

impl From<ServiceError> for JsonApiError {
    fn from(e: ServiceError) -> Self {
        let (status, error) = match &e {
            ServiceError::Unauthenticated => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            ServiceError::Unauthorized => (StatusCode::FORBIDDEN, "Forbidden"),
            ServiceError::AlreadySubmitted => (StatusCode::CONFLICT, "Already Submitted"),
            ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, "Not Found"),
            ServiceError::Validation(_) => (StatusCode::BAD_REQUEST, "Validation Error"),
            ServiceError::InvalidTransition { .. } => (StatusCode::CONFLICT, "Invalid Transition"),
            ServiceError::UnsupportedMediaType(_) => (StatusCode::UNSUPPORTED_MEDIA_TYPE, "Invalid File Type"),
            ServiceError::PayloadTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "File Too Large"),
            ServiceError::StorageUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "Storage Unavailable"),
        };
        if status.is_server_error() {
            error!(code = e.code(), error = %e, "request failed");
        } else {
            warn!(code = e.code(), error = %e, "request rejected");
        }
        Self::new(status, error, Some(e.to_string()))
    }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody { error: self.error.to_string(), message: self.message };
        (self.status, Json(body)).into_response()
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("storage init failed: {0}")]
    Storage(#[from] ServiceError),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}
