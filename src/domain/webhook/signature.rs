//! Signature verification primitives shared by the provider strategies.
//!
//! Both strategies are pure functions of the request: malformed input is
//! reported as an invalid signature, never as an internal error. Byte
//! comparisons are constant-time so a near-miss digest takes as long to
//! reject as a garbage one.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::errors::WebhookError;

/// Parsed components of a `ts=...,v1=...` signature header.
///
/// The timestamp is kept as the raw string because it is echoed verbatim
/// into the signed manifest; parsing it into an integer would only add a
/// failure mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Timestamp component, verbatim.
    pub timestamp: String,
    /// Decoded `v1` HMAC-SHA256 digest.
    pub v1_signature: Vec<u8>,
}

impl SignatureHeader {
    /// Parses a comma-separated `ts=<unix>,v1=<hex>` header.
    ///
    /// Unknown keys are ignored for forward compatibility. A header missing
    /// either component, or carrying a non-hex digest, is an invalid
    /// signature rather than an error.
    pub fn parse(header: &str) -> Result<Self, WebhookError> {
        let mut timestamp: Option<String> = None;
        let mut v1_signature: Option<Vec<u8>> = None;

        for part in header.split(',') {
            let Some((key, value)) = part.split_once('=') else {
                return Err(WebhookError::InvalidSignature);
            };
            match key.trim() {
                "ts" => timestamp = Some(value.trim().to_string()),
                "v1" => {
                    v1_signature = Some(
                        hex::decode(value.trim()).map_err(|_| WebhookError::InvalidSignature)?,
                    );
                }
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(WebhookError::InvalidSignature)?;
        let v1_signature = v1_signature.ok_or(WebhookError::InvalidSignature)?;

        Ok(SignatureHeader {
            timestamp,
            v1_signature,
        })
    }
}

/// Computes HMAC-SHA256 over `message` with the given secret.
pub fn hmac_sha256(secret: &str, message: &str) -> Vec<u8> {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(message.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

/// Constant-time equality for signature material.
///
/// A length mismatch returns false immediately; the length of the expected
/// digest is not secret, only its contents are.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
