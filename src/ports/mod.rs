//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `WebhookEventRepository` - durable, idempotent webhook event store
//! - `EventProcessor` / `EventHandler` - business-logic collaborators
//! - `AlertNotifier` - escalation on permanent event failure

mod alert_notifier;
mod event_processor;
mod webhook_event_repository;

pub use alert_notifier::AlertNotifier;
pub use event_processor::{EventHandler, EventProcessor, HandlerError};
pub use webhook_event_repository::{InsertOutcome, RetryDisposition, WebhookEventRepository};
