//! EventProcessor port - the business-logic collaborator.
//!
//! The batch processor treats business logic as an opaque function of
//! `(event_type, payload)`. Because delivery is at-least-once (duplicates,
//! stuck-event redelivery), every implementation MUST be idempotent with
//! respect to the business mutation it performs.

use async_trait::async_trait;
use thiserror::Error;

/// A business-handler failure, recorded against the event's retry budget.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct HandlerError {
    /// Machine-readable failure category (e.g. `HANDLER_ERROR`).
    pub code: String,
    /// Human-readable detail, forwarded to alerting on exhaustion.
    pub message: String,
}

impl HandlerError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Dispatches one event to the business mutation for its type.
#[async_trait]
pub trait EventProcessor: Send + Sync {
    /// Performs the business mutation for the event. Must tolerate being
    /// re-invoked with the same event.
    async fn process(
        &self,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> Result<(), HandlerError>;
}

/// A single-event-type handler, registered in a dispatch table.
///
/// One implementation per event type (purchase approval, subscription
/// cancellation, ...) rather than a growing if/else chain.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, payload: &serde_json::Value) -> Result<(), HandlerError>;
}
