use thiserror::Error;

use crate::branding::domain::SubmissionStatus;

/// Failures surfaced by branding operations. None are retried internally.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("sign in required")]
    Unauthenticated,
    #[error("admin access required")]
    Unauthorized,
    #[error("you have already submitted a branding idea")]
    AlreadySubmitted,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("cannot move submission from {from} to {to}")]
    InvalidTransition { from: SubmissionStatus, to: SubmissionStatus },
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),
    #[error("file too large (max {limit} bytes)")]
    PayloadTooLarge { limit: u64 },
}

impl ServiceError {
    pub fn not_found(entity: &str) -> Self { Self::NotFound(format!("{} not found", entity)) }

    pub fn storage<E: std::fmt::Display>(err: E) -> Self { Self::StorageUnavailable(err.to_string()) }

    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            ServiceError::Unauthenticated => 1001,
            ServiceError::Unauthorized => 1002,
            ServiceError::AlreadySubmitted => 1003,
            ServiceError::NotFound(_) => 1004,
            ServiceError::Validation(_) => 1005,
            ServiceError::InvalidTransition { .. } => 1006,
            ServiceError::UnsupportedMediaType(_) => 1101,
            ServiceError::PayloadTooLarge { .. } => 1102,
            ServiceError::StorageUnavailable(_) => 1200,
        }
    }
}
