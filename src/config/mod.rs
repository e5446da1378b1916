//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Values are read with the `HOOKLINE`
//! prefix and `__` (double underscore) as the nesting separator.
//!
//! # Example
//!
//! ```no_run
//! use hookline::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod processor;
mod providers;
mod server;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use processor::ProcessorConfig;
pub use providers::ProvidersConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// HTTP server (host, port, environment, log filter)
    #[serde(default)]
    pub server: ServerConfig,

    /// PostgreSQL event store
    pub database: DatabaseConfig,

    /// Per-provider webhook secrets
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Batch processor tuning
    #[serde(default)]
    pub processor: ProcessorConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Loads a `.env` file if present (development), then reads variables
    /// with the `HOOKLINE` prefix:
    ///
    /// - `HOOKLINE__DATABASE__URL=postgres://...`
    /// - `HOOKLINE__PROVIDERS__HOTMART_TOKEN=...`
    /// - `HOOKLINE__PROCESSOR__BATCH_SIZE=10`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("HOOKLINE")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration sections.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.providers.validate()?;
        self.processor.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn valid_config() -> AppConfig {
        AppConfig {
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: "postgres://localhost/hookline".to_string(),
                ..Default::default()
            },
            providers: ProvidersConfig {
                hotmart_token: Some(SecretString::new("hottok_x".to_string())),
                mercado_pago_secret: Some(SecretString::new("mp_x".to_string())),
            },
            processor: ProcessorConfig::default(),
        }
    }

    #[test]
    fn valid_config_passes_validation() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validation_surfaces_database_errors() {
        let mut config = valid_config();
        config.database.url = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_surfaces_provider_errors() {
        let mut config = valid_config();
        config.providers = ProvidersConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::NoProviderConfigured)
        ));
    }
}
