//! HTTP adapters - the axum transport layer.

pub mod webhook;

pub use webhook::{webhook_router, WebhookAppState};
