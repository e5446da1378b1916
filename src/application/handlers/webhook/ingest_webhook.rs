//! IngestWebhookHandler - persists one verified, normalized provider event.
//!
//! The receiver's job ends at durability: persist the event idempotently
//! and acknowledge, so the provider stops redelivering. No business logic
//! runs here; the batch processor picks the event up later.

use std::sync::Arc;
use std::time::Instant;

use crate::domain::webhook::{NewWebhookEvent, NormalizedEvent, WebhookError};
use crate::ports::{InsertOutcome, WebhookEventRepository};

/// Result of ingesting one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// First time this logical event was seen; a row was created.
    Saved { event_id: i64 },
    /// Redelivery of an already-recorded event. Acknowledged as success.
    Duplicate,
}

/// Handler that turns a normalized provider event into a durable row.
pub struct IngestWebhookHandler {
    repository: Arc<dyn WebhookEventRepository>,
}

impl IngestWebhookHandler {
    pub fn new(repository: Arc<dyn WebhookEventRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self, event: NormalizedEvent) -> Result<IngestOutcome, WebhookError> {
        let started = Instant::now();
        let idempotency_key = event.idempotency_key.clone();
        let event_type = event.event_type.clone();

        tracing::debug!(%idempotency_key, %event_type, "webhook event received");

        let new_event = NewWebhookEvent {
            idempotency_key: event.idempotency_key,
            event_type: event.event_type,
            payload: event.payload,
        };

        match self.repository.insert_if_absent(new_event).await {
            Ok(InsertOutcome::Inserted { event_id }) => {
                tracing::info!(
                    %idempotency_key,
                    %event_type,
                    event_id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "webhook event saved"
                );
                Ok(IngestOutcome::Saved { event_id })
            }
            Ok(InsertOutcome::Duplicate) => {
                tracing::info!(
                    %idempotency_key,
                    %event_type,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "duplicate webhook event ignored"
                );
                Ok(IngestOutcome::Duplicate)
            }
            Err(e) => {
                tracing::error!(
                    %idempotency_key,
                    %event_type,
                    error = %e,
                    "failed to save webhook event"
                );
                Err(e)
            }
        }
    }
}
