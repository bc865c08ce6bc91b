//! Retry policy with exponential backoff

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::limits;
use crate::errors::{ConfigError, ConfigResult};

/// How many attempts a unit gets and how long to wait between them
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts per unit, including the first
    pub max_attempts: u32,
    /// Backoff after attempt `i` (0-based) is `backoff_base ^ i` seconds
    pub backoff_base: f64,
    /// Ceiling for a single backoff delay
    #[serde(with = "humantime_serde")]
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: limits::MAX_RETRIES,
            backoff_base: limits::BACKOFF_BASE,
            max_backoff: limits::MAX_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// Policy with the given attempt count and default backoff
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Set the backoff base
    pub fn with_backoff_base(mut self, base: f64) -> Self {
        self.backoff_base = base;
        self
    }

    /// Delay to wait after the failed attempt `attempt_index` (0-based)
    pub fn delay_for(&self, attempt_index: u32) -> Duration {
        let exponent = i32::try_from(attempt_index).unwrap_or(i32::MAX);
        let seconds = self.backoff_base.powi(exponent);
        if !seconds.is_finite() || seconds >= self.max_backoff.as_secs_f64() {
            return self.max_backoff;
        }
        Duration::from_secs_f64(seconds.max(0.0))
    }

    /// Whether another attempt follows `attempt_index`
    pub fn has_next(&self, attempt_index: u32) -> bool {
        attempt_index + 1 < self.max_attempts
    }

    /// Validate the policy
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid_value(
                "max_retries",
                0,
                "at least one attempt is required",
            ));
        }
        if !self.backoff_base.is_finite() || self.backoff_base < 1.0 {
            return Err(ConfigError::invalid_value(
                "backoff_base",
                self.backoff_base,
                "backoff base must be a finite number of at least 1",
            ));
        }
        Ok(())
    }
}
