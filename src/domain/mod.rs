//! Domain layer containing business logic and domain types.
//!
//! - `webhook` - event entity and status lifecycle, boundary error
//!   taxonomy, per-provider signature verification and normalization

pub mod webhook;
