//! Use-case handlers.

pub mod webhook;

pub use webhook::{BatchReport, IngestOutcome, IngestWebhookHandler, ProcessPendingEventsHandler};
