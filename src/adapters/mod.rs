//! Adapters - implementations of the port interfaces.
//!
//! - `http` - axum transport: webhook endpoints and health check
//! - `postgres` - durable event store backed by sqlx
//! - `memory` - in-memory event store for tests
//! - `dispatch` - event-type handler registry
//! - `alerts` - escalation notifier

pub mod alerts;
pub mod dispatch;
pub mod http;
pub mod memory;
pub mod postgres;

pub use alerts::TracingAlertNotifier;
pub use dispatch::HandlerRegistry;
pub use memory::InMemoryWebhookEventRepository;
pub use postgres::PostgresWebhookEventRepository;
