//! Payment provider webhook secrets.

use secrecy::SecretString;
use serde::Deserialize;

use super::error::ValidationError;

/// Per-provider webhook verification secrets.
///
/// Each secret is optional so a deployment can run a single provider, but
/// a request for an unconfigured provider is answered with an internal
/// error (deployment defect), never a 401.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvidersConfig {
    /// Hotmart shared verification token (the body-embedded `hottok`).
    pub hotmart_token: Option<SecretString>,

    /// Mercado Pago webhook signing secret (HMAC key for `x-signature`).
    pub mercado_pago_secret: Option<SecretString>,
}

impl ProvidersConfig {
    /// Validate provider configuration.
    ///
    /// At least one provider must be configured, otherwise the receiver
    /// can never accept anything.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.hotmart_token.is_none() && self.mercado_pago_secret.is_none() {
            return Err(ValidationError::NoProviderConfigured);
        }
        Ok(())
    }
}
