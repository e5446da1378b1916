//! Application layer - use-case handlers.
//!
//! Orchestrates domain operations through the ports, keeping transport
//! (HTTP) and storage (Postgres) concerns in the adapters.

pub mod handlers;

pub use handlers::{
    BatchReport, IngestOutcome, IngestWebhookHandler, ProcessPendingEventsHandler,
};
