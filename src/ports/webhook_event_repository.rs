//! WebhookEventRepository port - durable event store for the webhook pipeline.
//!
//! The event store is the only shared mutable resource in the pipeline. All
//! mutations are single-row, status-gated updates, so a crash mid-run leaves
//! at most one event stuck in `processing` (reclaimed by timeout) rather
//! than a corrupted batch.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::webhook::{NewWebhookEvent, WebhookError, WebhookEvent};

/// Result of an insert-if-absent attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// First delivery of this idempotency key; row was created.
    Inserted { event_id: i64 },
    /// A row with this idempotency key already exists. Not an error: the
    /// receiver acknowledges the redelivery as a duplicate.
    Duplicate,
}

/// What a recorded handler failure means for the event's future.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDisposition {
    /// Attempt count after the increment.
    pub attempts: i32,
    /// True when the event hit the retry ceiling and is now terminal.
    pub exhausted: bool,
}

/// Port for the durable webhook event store.
///
/// Implementations enforce `idempotency_key` uniqueness with a storage-level
/// constraint (`INSERT ... ON CONFLICT DO NOTHING` semantics) so concurrent
/// redeliveries can never create two rows.
#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    /// Inserts the event unless its idempotency key is already recorded.
    async fn insert_if_absent(
        &self,
        event: NewWebhookEvent,
    ) -> Result<InsertOutcome, WebhookError>;

    /// Looks up an event by its idempotency key.
    async fn find_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<WebhookEvent>, WebhookError>;

    /// Fetches up to `limit` pending events, oldest first (FIFO fairness).
    async fn fetch_pending(&self, limit: u32) -> Result<Vec<WebhookEvent>, WebhookError>;

    /// Resets `processing` events whose `updated_at` is older than
    /// `stuck_before` back to `pending`, leaving `attempts` untouched.
    /// Returns how many events were reclaimed.
    async fn reset_stuck(&self, stuck_before: DateTime<Utc>) -> Result<u64, WebhookError>;

    /// Transitions `pending -> processing`. Fails if the event is not
    /// currently pending (claimed by someone else, or terminal).
    async fn mark_processing(&self, event_id: i64) -> Result<(), WebhookError>;

    /// Transitions `processing -> complete`.
    async fn mark_complete(&self, event_id: i64) -> Result<(), WebhookError>;

    /// Records a handler failure: increments `attempts` and transitions the
    /// event to `failed` when the new count reaches `max_attempts`, or back
    /// to `pending` otherwise. Single status-gated update.
    async fn record_failure(
        &self,
        event_id: i64,
        max_attempts: i32,
    ) -> Result<RetryDisposition, WebhookError>;
}
