//! Webhook domain - events, status lifecycle, signature verification.
//!
//! This module owns everything that is a pure function of the inbound
//! request or the stored record: the event entity and its status state
//! machine, the boundary error taxonomy, and per-provider signature
//! verification and normalization.

mod errors;
mod event;
pub mod providers;
pub mod signature;

pub use errors::WebhookError;
pub use event::{EventStatus, NewWebhookEvent, WebhookEvent};
pub use providers::NormalizedEvent;
