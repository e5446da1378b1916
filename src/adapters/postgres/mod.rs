//! PostgreSQL adapters - database implementations of the repository ports.

mod webhook_event_repository;

pub use webhook_event_repository::PostgresWebhookEventRepository;
