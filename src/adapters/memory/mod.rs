//! In-memory adapters, used by tests in place of PostgreSQL.

mod webhook_event_repository;

pub use webhook_event_repository::InMemoryWebhookEventRepository;
