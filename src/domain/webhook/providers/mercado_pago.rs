//! Mercado Pago webhook verification and normalization.
//!
//! Mercado Pago signs a canonical manifest rather than the raw body: the
//! `x-signature` header carries `ts=<unix>,v1=<hmac hex>`, and the digest is
//! HMAC-SHA256 over `id:{data.id};request-id:{x-request-id};ts:{ts};` with
//! absent fields omitted. `data.id` arrives both as a query parameter and
//! inside the body; the query parameter is the one covered by the signature.

use secrecy::{ExposeSecret, SecretString};

use super::NormalizedEvent;
use crate::domain::webhook::errors::WebhookError;
use crate::domain::webhook::signature::{constant_time_eq, hmac_sha256, SignatureHeader};

/// Header carrying `ts=...,v1=...`.
pub const SIGNATURE_HEADER: &str = "x-signature";

/// Correlation id header included in the signed manifest.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Verifies the `x-signature` header against the configured secret.
///
/// A missing header is an authentication failure; a missing secret is a
/// configuration error and is surfaced as such.
pub fn verify(
    secret: Option<&SecretString>,
    signature_header: Option<&str>,
    request_id: Option<&str>,
    data_id: Option<&str>,
) -> Result<(), WebhookError> {
    let secret = secret.ok_or(WebhookError::MissingSecret("mercadopago"))?;
    let header = signature_header.ok_or(WebhookError::MissingSignature)?;
    let header = SignatureHeader::parse(header)?;

    let manifest = build_manifest(data_id, request_id, &header.timestamp);
    let expected = hmac_sha256(secret.expose_secret(), &manifest);

    if !constant_time_eq(&expected, &header.v1_signature) {
        return Err(WebhookError::InvalidSignature);
    }
    Ok(())
}

/// Reconstructs the canonical manifest, including only the fields present.
///
/// Mercado Pago lowercases alphanumeric `data.id` values before signing.
pub fn build_manifest(data_id: Option<&str>, request_id: Option<&str>, ts: &str) -> String {
    let mut manifest = String::new();
    if let Some(id) = data_id {
        manifest.push_str(&format!("id:{};", id.to_lowercase()));
    }
    if let Some(rid) = request_id {
        manifest.push_str(&format!("request-id:{};", rid));
    }
    manifest.push_str(&format!("ts:{};", ts));
    manifest
}

/// Extracts the canonical event from a verified Mercado Pago body.
///
/// The idempotency key is `mp_{type}_{action}_{data.id}`; the stored event
/// type is the `action` (e.g. `payment.updated`). The query-string `data.id`
/// takes precedence over the body copy when both are present.
pub fn normalize(
    payload: serde_json::Value,
    query_data_id: Option<&str>,
) -> Result<NormalizedEvent, WebhookError> {
    let topic = payload["type"]
        .as_str()
        .ok_or(WebhookError::MissingField("type"))?
        .to_string();
    let action = payload["action"]
        .as_str()
        .ok_or(WebhookError::MissingField("action"))?
        .to_string();

    let data_id = match query_data_id {
        Some(id) => id.to_string(),
        None => match &payload["data"]["id"] {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            _ => return Err(WebhookError::MissingField("data.id")),
        },
    };

    Ok(NormalizedEvent {
        idempotency_key: format!("mp_{}_{}_{}", topic, action, data_id),
        event_type: action,
        payload,
    })
}
