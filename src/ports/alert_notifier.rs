//! AlertNotifier port - escalation channel for permanently failed events.
//!
//! Fired exactly once per event, when its retry budget is exhausted.
//! Exhausted events are terminal and require human intervention; the
//! pipeline never retries them again.

use async_trait::async_trait;

/// Fire-and-forget notification on permanent event failure.
#[async_trait]
pub trait AlertNotifier: Send + Sync {
    /// Reports that the event identified by `idempotency_key` exhausted its
    /// retries. Implementations must not fail the processor run; delivery
    /// problems are their own to log.
    async fn alert_exhausted(
        &self,
        idempotency_key: &str,
        event_type: &str,
        error_message: &str,
        attempts: i32,
    );
}
