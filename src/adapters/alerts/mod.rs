//! Alerting adapters.
//!
//! The shipped implementation logs exhausted events at `error` level;
//! deployments wire their real escalation channel (pager, chat bot, admin
//! feed) behind the same port.

use async_trait::async_trait;

use crate::ports::AlertNotifier;

/// AlertNotifier that emits a structured `tracing` error event.
pub struct TracingAlertNotifier;

#[async_trait]
impl AlertNotifier for TracingAlertNotifier {
    async fn alert_exhausted(
        &self,
        idempotency_key: &str,
        event_type: &str,
        error_message: &str,
        attempts: i32,
    ) {
        tracing::error!(
            idempotency_key,
            event_type,
            error = error_message,
            attempts,
            "webhook event permanently failed after exhausting retries"
        );
    }
}
