//! Per-provider verification and payload normalization.
//!
//! Each provider module turns its own wire format into a [`NormalizedEvent`]
//! with a deterministic idempotency key, so the rest of the pipeline never
//! sees provider-specific shapes.

pub mod hotmart;
pub mod mercado_pago;

/// A provider payload reduced to the canonical form the event store accepts.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEvent {
    /// Deterministic key: redeliveries of the same provider event produce
    /// the same value.
    pub idempotency_key: String,

    /// Category routed to a business handler.
    pub event_type: String,

    /// The provider's body, verbatim.
    pub payload: serde_json::Value,
}
