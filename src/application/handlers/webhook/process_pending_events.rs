//! ProcessPendingEventsHandler - the scheduled batch processor.
//!
//! Each run walks a fixed pipeline: recover stuck events, fetch a bounded
//! FIFO batch of pending events, dispatch each to the business handler,
//! and account for failures with bounded retries and terminal escalation.
//!
//! The concurrency guard is a process-local flag: at most one run is active
//! within one process. It is NOT a distributed lock; running multiple
//! processor instances requires promoting it to a storage-backed advisory
//! lock with lease expiry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time;

use crate::config::ProcessorConfig;
use crate::ports::{AlertNotifier, EventProcessor, WebhookEventRepository};

/// Outcome of one processor run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchReport {
    /// True when a previous run was still in flight and this one did not
    /// touch the store.
    pub skipped: bool,
    /// Stuck events reset back to `pending` before fetching.
    pub recovered: u64,
    /// Events that completed this run.
    pub processed: u32,
    /// Events that failed this run (handler failures and unclaimable rows).
    pub failed: u32,
    /// Set only when the store itself was unreachable during recovery or
    /// fetch; per-event handler failures never end up here.
    pub error: Option<String>,
}

impl BatchReport {
    /// A run is successful when the store was reachable and nothing failed.
    pub fn success(&self) -> bool {
        self.error.is_none() && self.failed == 0
    }

    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Default::default()
        }
    }

    fn store_failure(recovered: u64, error: impl ToString) -> Self {
        Self {
            recovered,
            error: Some(error.to_string()),
            ..Default::default()
        }
    }
}

/// Releases the in-flight flag on every exit path, including panics.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Scheduled processor that drains the webhook event store.
pub struct ProcessPendingEventsHandler {
    repository: Arc<dyn WebhookEventRepository>,
    processor: Arc<dyn EventProcessor>,
    alerts: Arc<dyn AlertNotifier>,
    config: ProcessorConfig,
    in_flight: AtomicBool,
}

impl ProcessPendingEventsHandler {
    /// Creates a handler with the documented default configuration.
    pub fn new(
        repository: Arc<dyn WebhookEventRepository>,
        processor: Arc<dyn EventProcessor>,
        alerts: Arc<dyn AlertNotifier>,
    ) -> Self {
        Self::with_config(repository, processor, alerts, ProcessorConfig::default())
    }

    pub fn with_config(
        repository: Arc<dyn WebhookEventRepository>,
        processor: Arc<dyn EventProcessor>,
        alerts: Arc<dyn AlertNotifier>,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            repository,
            processor,
            alerts,
            config,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Runs the scheduler loop until the shutdown signal flips to true.
    ///
    /// Ticks on a fixed cadence; overlapping ticks are absorbed by the
    /// concurrency guard. On shutdown the current batch is finished (the
    /// guard makes the final explicit run a no-op if one is in flight).
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.poll_interval());

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    // A dropped sender means the supervisor is gone; treat
                    // it as shutdown rather than spinning on a closed
                    // channel.
                    if changed.is_err() || *shutdown.borrow() {
                        self.run_once().await;
                        tracing::info!("webhook processor stopped");
                        return;
                    }
                }

                _ = interval.tick() => {
                    let report = self.run_once().await;
                    if let Some(error) = &report.error {
                        tracing::error!(error = %error, "webhook processor run failed");
                    }
                }
            }
        }
    }

    /// Executes one processing run. Safe to call on any cadence: a second
    /// invocation while one is in flight returns `skipped` immediately
    /// without touching the store.
    pub async fn run_once(&self) -> BatchReport {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("previous processor run still in flight, skipping");
            return BatchReport::skipped();
        }
        let _guard = RunGuard(&self.in_flight);

        // Reclaim work orphaned by a crashed or killed run before fetching,
        // so it re-enters this very batch.
        let stuck_before = Utc::now() - self.config.stuck_timeout();
        let recovered = match self.repository.reset_stuck(stuck_before).await {
            Ok(count) => {
                if count > 0 {
                    tracing::warn!(count, "reset stuck webhook events back to pending");
                }
                count
            }
            Err(e) => return BatchReport::store_failure(0, e),
        };

        let events = match self.repository.fetch_pending(self.config.batch_size).await {
            Ok(events) => events,
            Err(e) => return BatchReport::store_failure(recovered, e),
        };

        if events.is_empty() {
            return BatchReport {
                recovered,
                ..Default::default()
            };
        }

        let mut processed = 0u32;
        let mut failed = 0u32;

        for event in events {
            if let Err(e) = self.repository.mark_processing(event.id).await {
                // Could not claim the row; leave it for a later run rather
                // than invoking the handler on an unclaimed event.
                tracing::error!(event_id = event.id, error = %e, "failed to claim webhook event");
                failed += 1;
                continue;
            }

            match self
                .processor
                .process(&event.event_type, &event.payload)
                .await
            {
                Ok(()) => match self.repository.mark_complete(event.id).await {
                    Ok(()) => {
                        processed += 1;
                        tracing::info!(
                            event_id = event.id,
                            idempotency_key = %event.idempotency_key,
                            event_type = %event.event_type,
                            "webhook event processed"
                        );
                    }
                    Err(e) => {
                        failed += 1;
                        tracing::error!(
                            event_id = event.id,
                            error = %e,
                            "handler succeeded but completion could not be recorded"
                        );
                    }
                },
                Err(handler_err) => {
                    failed += 1;
                    match self
                        .repository
                        .record_failure(event.id, self.config.max_attempts)
                        .await
                    {
                        Ok(disposition) if disposition.exhausted => {
                            tracing::error!(
                                event_id = event.id,
                                idempotency_key = %event.idempotency_key,
                                attempts = disposition.attempts,
                                code = %handler_err.code,
                                error = %handler_err.message,
                                "webhook event exhausted retries"
                            );
                            self.alerts
                                .alert_exhausted(
                                    &event.idempotency_key,
                                    &event.event_type,
                                    &handler_err.message,
                                    disposition.attempts,
                                )
                                .await;
                        }
                        Ok(disposition) => {
                            tracing::warn!(
                                event_id = event.id,
                                idempotency_key = %event.idempotency_key,
                                attempts = disposition.attempts,
                                code = %handler_err.code,
                                error = %handler_err.message,
                                "webhook event handler failed, will retry"
                            );
                        }
                        Err(e) => {
                            tracing::error!(
                                event_id = event.id,
                                error = %e,
                                "failed to record webhook event failure"
                            );
                        }
                    }
                }
            }
        }

        tracing::info!(recovered, processed, failed, "webhook processor run complete");
        BatchReport {
            skipped: false,
            recovered,
            processed,
            failed,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryWebhookEventRepository, TracingAlertNotifier};
    use crate::domain::webhook::{EventStatus, NewWebhookEvent, WebhookError, WebhookEvent};
    use crate::ports::HandlerError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    // ══════════════════════════════════════════════════════════════
    // Test Doubles
    // ══════════════════════════════════════════════════════════════

    /// Records processing order; fails payloads carrying `"fail": true`.
    struct RecordingProcessor {
        order: Mutex<Vec<String>>,
    }

    impl RecordingProcessor {
        fn new() -> Self {
            Self {
                order: Mutex::new(Vec::new()),
            }
        }

        fn seen(&self) -> Vec<String> {
            self.order.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EventProcessor for RecordingProcessor {
        async fn process(
            &self,
            event_type: &str,
            payload: &serde_json::Value,
        ) -> Result<(), HandlerError> {
            self.order.lock().unwrap().push(
                payload["marker"]
                    .as_str()
                    .unwrap_or(event_type)
                    .to_string(),
            );
            if payload["fail"].as_bool().unwrap_or(false) {
                return Err(HandlerError::new("HANDLER_ERROR", "simulated failure"));
            }
            Ok(())
        }
    }

    /// Blocks inside the handler until released, to hold a run in flight.
    struct BlockingProcessor {
        entered: Notify,
        release: Notify,
    }

    impl BlockingProcessor {
        fn new() -> Self {
            Self {
                entered: Notify::new(),
                release: Notify::new(),
            }
        }
    }

    #[async_trait]
    impl EventProcessor for BlockingProcessor {
        async fn process(&self, _: &str, _: &serde_json::Value) -> Result<(), HandlerError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(())
        }
    }

    struct RecordingAlerts {
        alerts: Mutex<Vec<(String, String, String, i32)>>,
    }

    impl RecordingAlerts {
        fn new() -> Self {
            Self {
                alerts: Mutex::new(Vec::new()),
            }
        }

        fn count(&self) -> usize {
            self.alerts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl AlertNotifier for RecordingAlerts {
        async fn alert_exhausted(
            &self,
            idempotency_key: &str,
            event_type: &str,
            error_message: &str,
            attempts: i32,
        ) {
            self.alerts.lock().unwrap().push((
                idempotency_key.to_string(),
                event_type.to_string(),
                error_message.to_string(),
                attempts,
            ));
        }
    }

    /// Store whose fetch always fails (unreachable database).
    struct UnreachableStore;

    #[async_trait]
    impl WebhookEventRepository for UnreachableStore {
        async fn insert_if_absent(
            &self,
            _: NewWebhookEvent,
        ) -> Result<crate::ports::InsertOutcome, WebhookError> {
            Err(WebhookError::Database("connection refused".into()))
        }
        async fn find_by_idempotency_key(
            &self,
            _: &str,
        ) -> Result<Option<WebhookEvent>, WebhookError> {
            Err(WebhookError::Database("connection refused".into()))
        }
        async fn fetch_pending(&self, _: u32) -> Result<Vec<WebhookEvent>, WebhookError> {
            Err(WebhookError::Database("connection refused".into()))
        }
        async fn reset_stuck(
            &self,
            _: chrono::DateTime<Utc>,
        ) -> Result<u64, WebhookError> {
            Ok(0)
        }
        async fn mark_processing(&self, _: i64) -> Result<(), WebhookError> {
            Err(WebhookError::Database("connection refused".into()))
        }
        async fn mark_complete(&self, _: i64) -> Result<(), WebhookError> {
            Err(WebhookError::Database("connection refused".into()))
        }
        async fn record_failure(
            &self,
            _: i64,
            _: i32,
        ) -> Result<crate::ports::RetryDisposition, WebhookError> {
            Err(WebhookError::Database("connection refused".into()))
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Test Helpers
    // ══════════════════════════════════════════════════════════════

    async fn seed_pending(
        repo: &InMemoryWebhookEventRepository,
        key: &str,
        marker: &str,
        created_offset_secs: i64,
    ) -> i64 {
        seed_with(repo, key, marker, EventStatus::Pending, 0, created_offset_secs, false).await
    }

    #[allow(clippy::too_many_arguments)]
    async fn seed_with(
        repo: &InMemoryWebhookEventRepository,
        key: &str,
        marker: &str,
        status: EventStatus,
        attempts: i32,
        created_offset_secs: i64,
        fail: bool,
    ) -> i64 {
        let now = Utc::now();
        repo.seed(WebhookEvent {
            id: 0,
            idempotency_key: key.to_string(),
            event_type: "PURCHASE_APPROVED".to_string(),
            payload: json!({"marker": marker, "fail": fail}),
            status,
            attempts,
            created_at: now + chrono::Duration::seconds(created_offset_secs),
            updated_at: now,
        })
        .await
    }

    fn handler(
        repo: Arc<InMemoryWebhookEventRepository>,
        processor: Arc<dyn EventProcessor>,
        alerts: Arc<RecordingAlerts>,
    ) -> ProcessPendingEventsHandler {
        ProcessPendingEventsHandler::new(repo, processor, alerts)
    }

    // ══════════════════════════════════════════════════════════════
    // Happy Path
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn processes_all_pending_events_to_complete() {
        let repo = Arc::new(InMemoryWebhookEventRepository::new());
        let a = seed_pending(&repo, "k-a", "a", 0).await;
        let b = seed_pending(&repo, "k-b", "b", 1).await;
        let processor = Arc::new(RecordingProcessor::new());
        let alerts = Arc::new(RecordingAlerts::new());
        let handler = handler(repo.clone(), processor.clone(), alerts);

        let report = handler.run_once().await;

        assert!(report.success());
        assert_eq!(report.processed, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(repo.get(a).await.unwrap().status, EventStatus::Complete);
        assert_eq!(repo.get(b).await.unwrap().status, EventStatus::Complete);
    }

    #[tokio::test]
    async fn empty_store_is_a_successful_noop() {
        let repo = Arc::new(InMemoryWebhookEventRepository::new());
        let handler = handler(
            repo,
            Arc::new(RecordingProcessor::new()),
            Arc::new(RecordingAlerts::new()),
        );

        let report = handler.run_once().await;

        assert!(report.success());
        assert_eq!(report.processed, 0);
        assert_eq!(report.failed, 0);
        assert!(!report.skipped);
    }

    // ══════════════════════════════════════════════════════════════
    // FIFO Order and Batch Bound
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn batch_is_fifo_and_bounded_by_batch_size() {
        let repo = Arc::new(InMemoryWebhookEventRepository::new());
        // Seed in reverse creation order to prove fetch sorts.
        for i in (0..15).rev() {
            seed_pending(&repo, &format!("k-{:02}", i), &format!("{:02}", i), i).await;
        }
        let processor = Arc::new(RecordingProcessor::new());
        let handler = handler(
            repo.clone(),
            processor.clone(),
            Arc::new(RecordingAlerts::new()),
        );

        let report = handler.run_once().await;

        assert_eq!(report.processed, 10);
        let expected: Vec<String> = (0..10).map(|i| format!("{:02}", i)).collect();
        assert_eq!(processor.seen(), expected);
    }

    // ══════════════════════════════════════════════════════════════
    // Partial-Batch Resilience
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn one_failing_event_does_not_block_siblings() {
        let repo = Arc::new(InMemoryWebhookEventRepository::new());
        let a = seed_with(&repo, "k-a", "a", EventStatus::Pending, 0, 0, false).await;
        let bad = seed_with(&repo, "k-bad", "bad", EventStatus::Pending, 0, 1, true).await;
        let b = seed_with(&repo, "k-b", "b", EventStatus::Pending, 0, 2, false).await;
        let handler = handler(
            repo.clone(),
            Arc::new(RecordingProcessor::new()),
            Arc::new(RecordingAlerts::new()),
        );

        let report = handler.run_once().await;

        assert!(!report.success());
        assert_eq!(report.processed, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(repo.get(a).await.unwrap().status, EventStatus::Complete);
        assert_eq!(repo.get(b).await.unwrap().status, EventStatus::Complete);
        // Failed event went back to pending with one attempt recorded.
        let bad_event = repo.get(bad).await.unwrap();
        assert_eq!(bad_event.status, EventStatus::Pending);
        assert_eq!(bad_event.attempts, 1);
    }

    // ══════════════════════════════════════════════════════════════
    // Retry Escalation
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn final_failure_alerts_once_and_is_terminal() {
        let repo = Arc::new(InMemoryWebhookEventRepository::new());
        let id = seed_with(&repo, "k-last", "last", EventStatus::Pending, 4, 0, true).await;
        let alerts = Arc::new(RecordingAlerts::new());
        let handler = handler(
            repo.clone(),
            Arc::new(RecordingProcessor::new()),
            alerts.clone(),
        );

        let report = handler.run_once().await;

        assert_eq!(report.failed, 1);
        let event = repo.get(id).await.unwrap();
        assert_eq!(event.status, EventStatus::Failed);
        assert_eq!(event.attempts, 5);

        assert_eq!(alerts.count(), 1);
        let recorded = alerts.alerts.lock().unwrap()[0].clone();
        assert_eq!(recorded.0, "k-last");
        assert_eq!(recorded.1, "PURCHASE_APPROVED");
        assert_eq!(recorded.2, "simulated failure");
        assert_eq!(recorded.3, 5);

        // Terminal: a second run finds nothing to do and alerts no more.
        let second = handler.run_once().await;
        assert_eq!(second.processed, 0);
        assert_eq!(alerts.count(), 1);
    }

    #[tokio::test]
    async fn failure_below_ceiling_does_not_alert() {
        let repo = Arc::new(InMemoryWebhookEventRepository::new());
        seed_with(&repo, "k-retry", "r", EventStatus::Pending, 2, 0, true).await;
        let alerts = Arc::new(RecordingAlerts::new());
        let handler = handler(
            repo.clone(),
            Arc::new(RecordingProcessor::new()),
            alerts.clone(),
        );

        handler.run_once().await;

        assert_eq!(alerts.count(), 0);
    }

    // ══════════════════════════════════════════════════════════════
    // Stuck Recovery
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn stale_processing_event_is_reclaimed_and_reprocessed() {
        let repo = Arc::new(InMemoryWebhookEventRepository::new());
        let stale = Utc::now() - chrono::Duration::minutes(10);
        let id = repo
            .seed(WebhookEvent {
                id: 0,
                idempotency_key: "k-stuck".to_string(),
                event_type: "PURCHASE_APPROVED".to_string(),
                payload: json!({"marker": "stuck", "fail": false}),
                status: EventStatus::Processing,
                attempts: 1,
                created_at: stale,
                updated_at: stale,
            })
            .await;
        let handler = handler(
            repo.clone(),
            Arc::new(RecordingProcessor::new()),
            Arc::new(RecordingAlerts::new()),
        );

        let report = handler.run_once().await;

        assert_eq!(report.recovered, 1);
        assert_eq!(report.processed, 1);
        let event = repo.get(id).await.unwrap();
        assert_eq!(event.status, EventStatus::Complete);
        // Recovery leaves the retry budget untouched.
        assert_eq!(event.attempts, 1);
    }

    #[tokio::test]
    async fn fresh_processing_event_is_left_alone() {
        let repo = Arc::new(InMemoryWebhookEventRepository::new());
        let now = Utc::now();
        let id = repo
            .seed(WebhookEvent {
                id: 0,
                idempotency_key: "k-live".to_string(),
                event_type: "PURCHASE_APPROVED".to_string(),
                payload: json!({}),
                status: EventStatus::Processing,
                attempts: 0,
                created_at: now,
                updated_at: now,
            })
            .await;
        let handler = handler(
            repo.clone(),
            Arc::new(RecordingProcessor::new()),
            Arc::new(RecordingAlerts::new()),
        );

        let report = handler.run_once().await;

        assert_eq!(report.recovered, 0);
        assert_eq!(report.processed, 0);
        assert_eq!(repo.get(id).await.unwrap().status, EventStatus::Processing);
    }

    // ══════════════════════════════════════════════════════════════
    // Concurrency Guard
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn overlapping_run_is_skipped_without_touching_the_store() {
        let repo = Arc::new(InMemoryWebhookEventRepository::new());
        seed_pending(&repo, "k-1", "1", 0).await;
        let blocking = Arc::new(BlockingProcessor::new());
        let handler = Arc::new(ProcessPendingEventsHandler::new(
            repo.clone(),
            blocking.clone(),
            Arc::new(TracingAlertNotifier),
        ));

        let first = tokio::spawn({
            let handler = handler.clone();
            async move { handler.run_once().await }
        });

        // Wait until the first run is inside the business handler.
        blocking.entered.notified().await;

        let second = handler.run_once().await;
        assert!(second.skipped);
        assert!(second.success());
        assert_eq!(second.processed, 0);

        blocking.release.notify_one();
        let first_report = first.await.unwrap();
        assert!(!first_report.skipped);
        assert_eq!(first_report.processed, 1);

        // Guard released; a subsequent run executes normally.
        let third = handler.run_once().await;
        assert!(!third.skipped);
    }

    // ══════════════════════════════════════════════════════════════
    // Store Failure
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn unreachable_store_fails_the_whole_run() {
        let handler = ProcessPendingEventsHandler::new(
            Arc::new(UnreachableStore),
            Arc::new(RecordingProcessor::new()),
            Arc::new(RecordingAlerts::new()),
        );

        let report = handler.run_once().await;

        assert!(!report.success());
        assert!(report.error.unwrap().contains("connection refused"));
    }

    // ══════════════════════════════════════════════════════════════
    // Scheduler Loop
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn run_loop_processes_and_stops_on_shutdown() {
        let repo = Arc::new(InMemoryWebhookEventRepository::new());
        let id = seed_pending(&repo, "k-1", "1", 0).await;
        let config = ProcessorConfig {
            poll_interval_secs: 1,
            ..Default::default()
        };
        let handler = Arc::new(ProcessPendingEventsHandler::with_config(
            repo.clone(),
            Arc::new(RecordingProcessor::new()),
            Arc::new(RecordingAlerts::new()),
            config,
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn({
            let handler = handler.clone();
            async move { handler.run(shutdown_rx).await }
        });

        // First tick fires immediately.
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        shutdown_tx.send(true).unwrap();
        task.await.unwrap();

        assert_eq!(repo.get(id).await.unwrap().status, EventStatus::Complete);
    }

    #[tokio::test]
    async fn run_loop_stops_when_shutdown_sender_is_dropped() {
        let repo = Arc::new(InMemoryWebhookEventRepository::new());
        let handler = Arc::new(ProcessPendingEventsHandler::new(
            repo,
            Arc::new(RecordingProcessor::new()),
            Arc::new(RecordingAlerts::new()),
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn({
            let handler = handler.clone();
            async move { handler.run(shutdown_rx).await }
        });

        drop(shutdown_tx);

        // The loop must exit instead of spinning on the closed channel.
        tokio::time::timeout(std::time::Duration::from_secs(1), task)
            .await
            .expect("processor loop did not stop after the sender was dropped")
            .unwrap();
    }
}
