//! HTTP DTOs for the webhook receiver endpoints.
//!
//! These types define the JSON response contract providers see. Request
//! bodies are provider-specific and parsed as raw JSON, so there are no
//! request DTOs here.

use serde::Serialize;

use crate::application::handlers::webhook::IngestOutcome;

/// Acknowledgement returned for every accepted delivery.
///
/// Duplicates are acknowledged as success so the provider stops
/// redelivering.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedResponse {
    pub received: bool,

    /// Identifier of the stored event. Absent on duplicate deliveries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<i64>,

    /// Set when this delivery matched an already-recorded event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate: Option<bool>,
}

impl ReceivedResponse {
    pub fn saved(event_id: i64) -> Self {
        Self {
            received: true,
            event_id: Some(event_id),
            duplicate: None,
        }
    }

    pub fn duplicate() -> Self {
        Self {
            received: true,
            event_id: None,
            duplicate: Some(true),
        }
    }
}

impl From<IngestOutcome> for ReceivedResponse {
    fn from(outcome: IngestOutcome) -> Self {
        match outcome {
            IngestOutcome::Saved { event_id } => Self::saved(event_id),
            IngestOutcome::Duplicate => Self::duplicate(),
        }
    }
}

/// Standard error response for receiver errors.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Stable error code for programmatic handling.
    pub error: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

/// Response for the health check endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub name: &'static str,
    pub version: &'static str,
}
