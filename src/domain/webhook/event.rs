//! WebhookEvent - the durable record of one inbound provider delivery.
//!
//! Every accepted webhook becomes exactly one row keyed by a deterministic
//! idempotency key, so provider redeliveries collapse onto the same record.
//! Rows are never deleted; `complete` and `failed` are terminal states and
//! the table doubles as an audit log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Processing lifecycle of a stored webhook event.
///
/// Legal transitions:
/// - `Pending -> Processing` (claimed by a processor run)
/// - `Processing -> Complete` (handler succeeded)
/// - `Processing -> Pending` (handler failed, retries remain)
/// - `Processing -> Failed` (retries exhausted)
///
/// There is no transition out of `Complete` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Pending,
    Processing,
    Complete,
    Failed,
}

impl EventStatus {
    /// Storage representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Pending => "pending",
            EventStatus::Processing => "processing",
            EventStatus::Complete => "complete",
            EventStatus::Failed => "failed",
        }
    }

    /// Returns true if no further transitions are allowed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventStatus::Complete | EventStatus::Failed)
    }

    /// Returns true if `next` is a legal transition from this status.
    pub fn can_transition_to(&self, next: EventStatus) -> bool {
        matches!(
            (self, next),
            (EventStatus::Pending, EventStatus::Processing)
                | (EventStatus::Processing, EventStatus::Complete)
                | (EventStatus::Processing, EventStatus::Pending)
                | (EventStatus::Processing, EventStatus::Failed)
        )
    }
}

/// A stored webhook event.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEvent {
    /// Surrogate key assigned by the store on insert.
    pub id: i64,

    /// Deterministic key derived from provider + event type + transaction id.
    /// Unique at the storage layer.
    pub idempotency_key: String,

    /// Provider-defined category used to route to a business handler.
    pub event_type: String,

    /// The provider's event body, passed verbatim to the handler.
    pub payload: serde_json::Value,

    /// Current lifecycle status.
    pub status: EventStatus,

    /// Handler failure count. Starts at 0 and only ever increases.
    pub attempts: i32,

    pub created_at: DateTime<Utc>,

    /// Basis for stuck-event detection: a `processing` row whose
    /// `updated_at` is stale was claimed by a run that never finished.
    pub updated_at: DateTime<Utc>,
}

/// A webhook event about to be inserted by the receiver.
#[derive(Debug, Clone)]
pub struct NewWebhookEvent {
    pub idempotency_key: String,
    pub event_type: String,
    pub payload: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    // ══════════════════════════════════════════════════════════════
    // Status Transition Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn pending_can_only_move_to_processing() {
        assert!(EventStatus::Pending.can_transition_to(EventStatus::Processing));
        assert!(!EventStatus::Pending.can_transition_to(EventStatus::Complete));
        assert!(!EventStatus::Pending.can_transition_to(EventStatus::Failed));
        assert!(!EventStatus::Pending.can_transition_to(EventStatus::Pending));
    }

    #[test]
    fn processing_can_complete_retry_or_fail() {
        assert!(EventStatus::Processing.can_transition_to(EventStatus::Complete));
        assert!(EventStatus::Processing.can_transition_to(EventStatus::Pending));
        assert!(EventStatus::Processing.can_transition_to(EventStatus::Failed));
        assert!(!EventStatus::Processing.can_transition_to(EventStatus::Processing));
    }

    #[test]
    fn terminal_states_allow_no_transitions() {
        for terminal in [EventStatus::Complete, EventStatus::Failed] {
            for next in [
                EventStatus::Pending,
                EventStatus::Processing,
                EventStatus::Complete,
                EventStatus::Failed,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
            assert!(terminal.is_terminal());
        }
    }

    #[test]
    fn non_terminal_states_are_not_terminal() {
        assert!(!EventStatus::Pending.is_terminal());
        assert!(!EventStatus::Processing.is_terminal());
    }

    #[test]
    fn status_round_trips_through_storage_representation() {
        assert_eq!(EventStatus::Pending.as_str(), "pending");
        assert_eq!(EventStatus::Processing.as_str(), "processing");
        assert_eq!(EventStatus::Complete.as_str(), "complete");
        assert_eq!(EventStatus::Failed.as_str(), "failed");
    }
}
