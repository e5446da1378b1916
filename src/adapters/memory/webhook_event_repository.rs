//! In-memory implementation of WebhookEventRepository.
//!
//! Mirrors the PostgreSQL adapter's semantics (insert-or-ignore, FIFO
//! fetch, status-gated transitions) without external dependencies. Used by
//! unit and integration tests, and handy for local development.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::webhook::{EventStatus, NewWebhookEvent, WebhookError, WebhookEvent};
use crate::ports::{InsertOutcome, RetryDisposition, WebhookEventRepository};

#[derive(Default)]
struct Inner {
    next_id: i64,
    events: Vec<WebhookEvent>,
}

/// In-memory event store with the same contract as the Postgres adapter.
#[derive(Default)]
pub struct InMemoryWebhookEventRepository {
    inner: RwLock<Inner>,
}

impl InMemoryWebhookEventRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fully-formed event, bypassing the idempotency check.
    /// Test seam for arranging arbitrary statuses, attempts and timestamps.
    pub async fn seed(&self, mut event: WebhookEvent) -> i64 {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        event.id = inner.next_id;
        let id = event.id;
        inner.events.push(event);
        id
    }

    /// Returns a snapshot of the event with the given id.
    pub async fn get(&self, event_id: i64) -> Option<WebhookEvent> {
        let inner = self.inner.read().await;
        inner.events.iter().find(|e| e.id == event_id).cloned()
    }

    /// Returns a snapshot of all stored events.
    pub async fn all(&self) -> Vec<WebhookEvent> {
        self.inner.read().await.events.clone()
    }

    /// Number of stored events.
    pub async fn len(&self) -> usize {
        self.inner.read().await.events.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.events.is_empty()
    }
}

#[async_trait]
impl WebhookEventRepository for InMemoryWebhookEventRepository {
    async fn insert_if_absent(
        &self,
        event: NewWebhookEvent,
    ) -> Result<InsertOutcome, WebhookError> {
        let mut inner = self.inner.write().await;
        if inner
            .events
            .iter()
            .any(|e| e.idempotency_key == event.idempotency_key)
        {
            return Ok(InsertOutcome::Duplicate);
        }

        inner.next_id += 1;
        let now = Utc::now();
        let stored = WebhookEvent {
            id: inner.next_id,
            idempotency_key: event.idempotency_key,
            event_type: event.event_type,
            payload: event.payload,
            status: EventStatus::Pending,
            attempts: 0,
            created_at: now,
            updated_at: now,
        };
        let event_id = stored.id;
        inner.events.push(stored);
        Ok(InsertOutcome::Inserted { event_id })
    }

    async fn find_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<WebhookEvent>, WebhookError> {
        let inner = self.inner.read().await;
        Ok(inner
            .events
            .iter()
            .find(|e| e.idempotency_key == key)
            .cloned())
    }

    async fn fetch_pending(&self, limit: u32) -> Result<Vec<WebhookEvent>, WebhookError> {
        let inner = self.inner.read().await;
        let mut pending: Vec<WebhookEvent> = inner
            .events
            .iter()
            .filter(|e| e.status == EventStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|e| e.created_at);
        pending.truncate(limit as usize);
        Ok(pending)
    }

    async fn reset_stuck(&self, stuck_before: DateTime<Utc>) -> Result<u64, WebhookError> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let mut reclaimed = 0;
        for event in inner
            .events
            .iter_mut()
            .filter(|e| e.status == EventStatus::Processing && e.updated_at < stuck_before)
        {
            event.status = EventStatus::Pending;
            event.updated_at = now;
            reclaimed += 1;
        }
        Ok(reclaimed)
    }

    async fn mark_processing(&self, event_id: i64) -> Result<(), WebhookError> {
        self.transition(event_id, EventStatus::Pending, EventStatus::Processing)
            .await
    }

    async fn mark_complete(&self, event_id: i64) -> Result<(), WebhookError> {
        self.transition(event_id, EventStatus::Processing, EventStatus::Complete)
            .await
    }

    async fn record_failure(
        &self,
        event_id: i64,
        max_attempts: i32,
    ) -> Result<RetryDisposition, WebhookError> {
        let mut inner = self.inner.write().await;
        let event = inner
            .events
            .iter_mut()
            .find(|e| e.id == event_id && e.status == EventStatus::Processing)
            .ok_or_else(|| {
                WebhookError::Database(format!(
                    "Webhook event {} was not in 'processing' state",
                    event_id
                ))
            })?;

        event.attempts += 1;
        let exhausted = event.attempts >= max_attempts;
        event.status = if exhausted {
            EventStatus::Failed
        } else {
            EventStatus::Pending
        };
        event.updated_at = Utc::now();

        Ok(RetryDisposition {
            attempts: event.attempts,
            exhausted,
        })
    }
}

impl InMemoryWebhookEventRepository {
    async fn transition(
        &self,
        event_id: i64,
        from: EventStatus,
        to: EventStatus,
    ) -> Result<(), WebhookError> {
        let mut inner = self.inner.write().await;
        let event = inner
            .events
            .iter_mut()
            .find(|e| e.id == event_id && e.status == from)
            .ok_or_else(|| {
                WebhookError::Database(format!(
                    "Webhook event {} was not in '{}' state",
                    event_id,
                    from.as_str()
                ))
            })?;

        debug_assert!(from.can_transition_to(to));
        event.status = to;
        event.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_event(key: &str) -> NewWebhookEvent {
        NewWebhookEvent {
            idempotency_key: key.to_string(),
            event_type: "PURCHASE_APPROVED".to_string(),
            payload: json!({"k": key}),
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Idempotent Insert Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn insert_returns_id_for_new_key() {
        let repo = InMemoryWebhookEventRepository::new();

        let outcome = repo.insert_if_absent(new_event("k-1")).await.unwrap();

        assert!(matches!(outcome, InsertOutcome::Inserted { .. }));
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn duplicate_key_is_ignored_not_an_error() {
        let repo = InMemoryWebhookEventRepository::new();

        repo.insert_if_absent(new_event("k-1")).await.unwrap();
        let outcome = repo.insert_if_absent(new_event("k-1")).await.unwrap();

        assert_eq!(outcome, InsertOutcome::Duplicate);
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn inserted_events_start_pending_with_zero_attempts() {
        let repo = InMemoryWebhookEventRepository::new();

        repo.insert_if_absent(new_event("k-1")).await.unwrap();
        let stored = repo.find_by_idempotency_key("k-1").await.unwrap().unwrap();

        assert_eq!(stored.status, EventStatus::Pending);
        assert_eq!(stored.attempts, 0);
    }

    // ══════════════════════════════════════════════════════════════
    // Fetch and Transition Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn fetch_pending_is_fifo_and_bounded() {
        let repo = InMemoryWebhookEventRepository::new();
        let base = Utc::now();
        // Seed newest-first, expect oldest-first back.
        for i in (0..5).rev() {
            repo.seed(WebhookEvent {
                id: 0,
                idempotency_key: format!("k-{}", i),
                event_type: "t".to_string(),
                payload: json!({}),
                status: EventStatus::Pending,
                attempts: 0,
                created_at: base + chrono::Duration::seconds(i),
                updated_at: base,
            })
            .await;
        }

        let batch = repo.fetch_pending(3).await.unwrap();

        let keys: Vec<_> = batch.iter().map(|e| e.idempotency_key.clone()).collect();
        assert_eq!(keys, vec!["k-0", "k-1", "k-2"]);
    }

    #[tokio::test]
    async fn mark_processing_requires_pending() {
        let repo = InMemoryWebhookEventRepository::new();
        let outcome = repo.insert_if_absent(new_event("k-1")).await.unwrap();
        let InsertOutcome::Inserted { event_id } = outcome else {
            panic!("expected insert");
        };

        repo.mark_processing(event_id).await.unwrap();
        let again = repo.mark_processing(event_id).await;

        assert!(again.is_err());
    }

    #[tokio::test]
    async fn reset_stuck_only_reclaims_stale_processing_events() {
        let repo = InMemoryWebhookEventRepository::new();
        let stale = Utc::now() - chrono::Duration::minutes(10);
        let fresh = Utc::now();

        for (key, updated_at, status) in [
            ("stale", stale, EventStatus::Processing),
            ("fresh", fresh, EventStatus::Processing),
            ("done", stale, EventStatus::Complete),
        ] {
            repo.seed(WebhookEvent {
                id: 0,
                idempotency_key: key.to_string(),
                event_type: "t".to_string(),
                payload: json!({}),
                status,
                attempts: 0,
                created_at: stale,
                updated_at,
            })
            .await;
        }

        let cutoff = Utc::now() - chrono::Duration::minutes(5);
        let reclaimed = repo.reset_stuck(cutoff).await.unwrap();

        assert_eq!(reclaimed, 1);
        let stale_event = repo.find_by_idempotency_key("stale").await.unwrap().unwrap();
        assert_eq!(stale_event.status, EventStatus::Pending);
        let fresh_event = repo.find_by_idempotency_key("fresh").await.unwrap().unwrap();
        assert_eq!(fresh_event.status, EventStatus::Processing);
        let done_event = repo.find_by_idempotency_key("done").await.unwrap().unwrap();
        assert_eq!(done_event.status, EventStatus::Complete);
    }

    // ══════════════════════════════════════════════════════════════
    // Failure Accounting Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn record_failure_below_ceiling_returns_to_pending() {
        let repo = InMemoryWebhookEventRepository::new();
        let InsertOutcome::Inserted { event_id } =
            repo.insert_if_absent(new_event("k-1")).await.unwrap()
        else {
            panic!("expected insert");
        };
        repo.mark_processing(event_id).await.unwrap();

        let disposition = repo.record_failure(event_id, 5).await.unwrap();

        assert_eq!(disposition.attempts, 1);
        assert!(!disposition.exhausted);
        assert_eq!(
            repo.get(event_id).await.unwrap().status,
            EventStatus::Pending
        );
    }

    #[tokio::test]
    async fn record_failure_at_ceiling_is_terminal() {
        let repo = InMemoryWebhookEventRepository::new();
        let id = repo
            .seed(WebhookEvent {
                id: 0,
                idempotency_key: "k-1".to_string(),
                event_type: "t".to_string(),
                payload: json!({}),
                status: EventStatus::Processing,
                attempts: 4,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .await;

        let disposition = repo.record_failure(id, 5).await.unwrap();

        assert_eq!(disposition.attempts, 5);
        assert!(disposition.exhausted);
        assert_eq!(repo.get(id).await.unwrap().status, EventStatus::Failed);
    }
}
