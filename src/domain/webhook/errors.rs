//! Error types for webhook ingestion and processing.
//!
//! Models the boundary taxonomy: authentication, validation, persistence,
//! and configuration failures each map to a distinct HTTP status and error
//! code so providers can decide whether to retry a delivery.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors that occur while receiving or persisting webhook events.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Signature header or embedded secret is absent from the request.
    #[error("Missing signature")]
    MissingSignature,

    /// Signature verification failed (mismatch, tampered body, bad header).
    #[error("Invalid signature")]
    InvalidSignature,

    /// The server-side secret for this provider is not configured.
    /// A deployment defect, not a bad request; never reported as 401.
    #[error("Webhook secret for {0} is not configured")]
    MissingSecret(&'static str),

    /// Request body exceeds the ingestion size ceiling.
    #[error("Payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    /// A field required to normalize the event is absent.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Request body is not valid JSON.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Event store unreachable or a write failed.
    #[error("Database error: {0}")]
    Database(String),
}

impl WebhookError {
    /// Maps the error to the HTTP status returned to the provider.
    ///
    /// Providers treat 5xx as "retry the delivery", so only persistence
    /// and configuration failures land there.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::MissingSignature | WebhookError::InvalidSignature => {
                StatusCode::UNAUTHORIZED
            }
            WebhookError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            WebhookError::MissingField(_) | WebhookError::ParseError(_) => StatusCode::BAD_REQUEST,
            WebhookError::MissingSecret(_) | WebhookError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable error code for the response body.
    pub fn error_code(&self) -> &'static str {
        match self {
            WebhookError::MissingSignature | WebhookError::InvalidSignature => {
                "WEBHOOK_INVALID_SIGNATURE"
            }
            WebhookError::PayloadTooLarge { .. } => "WEBHOOK_PAYLOAD_TOO_LARGE",
            WebhookError::MissingField(_) | WebhookError::ParseError(_) => "INVALID_PAYLOAD",
            WebhookError::MissingSecret(_) => "INTERNAL_ERROR",
            WebhookError::Database(_) => "DB_ERROR",
        }
    }
}
