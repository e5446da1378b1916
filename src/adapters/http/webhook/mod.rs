//! HTTP adapter for the webhook receiver.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{WebhookAppState, MAX_BODY_BYTES};
pub use routes::webhook_router;
