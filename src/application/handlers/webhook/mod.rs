//! Webhook pipeline use cases: synchronous ingestion and the scheduled
//! batch processor.

pub mod ingest_webhook;
pub mod process_pending_events;

pub use ingest_webhook::{IngestOutcome, IngestWebhookHandler};
pub use process_pending_events::{BatchReport, ProcessPendingEventsHandler};
