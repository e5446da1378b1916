//! Hotmart webhook verification and normalization.
//!
//! Hotmart authenticates by embedding a shared token (`hottok`) in the JSON
//! body instead of signing it, so the body must be parsed before the request
//! can be verified; the receiver's size ceiling is enforced first.

use secrecy::{ExposeSecret, SecretString};

use super::NormalizedEvent;
use crate::domain::webhook::errors::WebhookError;
use crate::domain::webhook::signature::constant_time_eq;

/// Compares the body-embedded `hottok` against the configured token.
///
/// The comparison is constant-time; a length mismatch is an invalid
/// signature, not an error, so timing reveals nothing about the token.
pub fn verify(secret: Option<&SecretString>, payload: &serde_json::Value) -> Result<(), WebhookError> {
    let secret = secret.ok_or(WebhookError::MissingSecret("hotmart"))?;
    let received = payload["hottok"]
        .as_str()
        .ok_or(WebhookError::MissingSignature)?;

    if !constant_time_eq(received.as_bytes(), secret.expose_secret().as_bytes()) {
        return Err(WebhookError::InvalidSignature);
    }
    Ok(())
}

/// Extracts the canonical event from a verified Hotmart body.
///
/// The idempotency key is `{event}_{transaction}`, e.g.
/// `PURCHASE_APPROVED_HP17715690036014`.
pub fn normalize(payload: serde_json::Value) -> Result<NormalizedEvent, WebhookError> {
    let event = payload["event"]
        .as_str()
        .ok_or(WebhookError::MissingField("event"))?
        .to_string();
    let transaction = payload["data"]["purchase"]["transaction"]
        .as_str()
        .ok_or(WebhookError::MissingField("data.purchase.transaction"))?
        .to_string();

    Ok(NormalizedEvent {
        idempotency_key: format!("{}_{}", event, transaction),
        event_type: event,
        payload,
    })
}
