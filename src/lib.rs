//! Hookline - payment-provider webhook ingestion and batch processing.
//!
//! Receives signed provider notifications (Hotmart, Mercado Pago), records
//! them idempotently in a durable event log, and processes them
//! asynchronously with bounded retries, stuck-event recovery, and alert
//! escalation.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
