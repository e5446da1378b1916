//! Batch processor configuration.

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Tuning knobs for the scheduled batch processor.
///
/// The defaults are the documented operating point; overriding them is
/// mainly for tests (small batches, short timeouts).
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorConfig {
    /// Maximum events fetched per run.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Minutes after which a `processing` event counts as stuck.
    #[serde(default = "default_stuck_timeout_minutes")]
    pub stuck_timeout_minutes: i64,

    /// Handler failures before an event becomes terminally `failed`.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i32,

    /// Seconds between scheduled runs.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl ProcessorConfig {
    /// Staleness threshold for stuck-event recovery.
    pub fn stuck_timeout(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.stuck_timeout_minutes)
    }

    /// Cadence of the scheduler loop.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Override the batch size (tests).
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Override the retry ceiling (tests).
    pub fn with_max_attempts(mut self, max_attempts: i32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Override the stuck timeout (tests).
    pub fn with_stuck_timeout_minutes(mut self, minutes: i64) -> Self {
        self.stuck_timeout_minutes = minutes;
        self
    }

    /// Validate processor configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.batch_size == 0 {
            return Err(ValidationError::InvalidProcessorSetting("batch_size"));
        }
        if self.stuck_timeout_minutes <= 0 {
            return Err(ValidationError::InvalidProcessorSetting(
                "stuck_timeout_minutes",
            ));
        }
        if self.max_attempts <= 0 {
            return Err(ValidationError::InvalidProcessorSetting("max_attempts"));
        }
        if self.poll_interval_secs == 0 {
            return Err(ValidationError::InvalidProcessorSetting(
                "poll_interval_secs",
            ));
        }
        Ok(())
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            stuck_timeout_minutes: default_stuck_timeout_minutes(),
            max_attempts: default_max_attempts(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

fn default_batch_size() -> u32 {
    10
}

fn default_stuck_timeout_minutes() -> i64 {
    5
}

fn default_max_attempts() -> i32 {
    5
}

fn default_poll_interval_secs() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documented_defaults() {
        let config = ProcessorConfig::default();
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.stuck_timeout_minutes, 5);
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.poll_interval_secs, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_batch_size_fails_validation() {
        let config = ProcessorConfig::default().with_batch_size(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn non_positive_max_attempts_fails_validation() {
        let config = ProcessorConfig::default().with_max_attempts(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn stuck_timeout_converts_to_chrono_duration() {
        let config = ProcessorConfig::default().with_stuck_timeout_minutes(7);
        assert_eq!(config.stuck_timeout(), chrono::Duration::minutes(7));
    }
}
