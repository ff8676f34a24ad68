//! Configuration for the location source

use std::time::Duration;

use location_hub::CHECK_INTERVAL;

use crate::backoff::{RetryPolicy, MAX_RETRY_DELAY, RETRY_STEP};
use crate::error::SourceError;

/// Configuration for a MapLocationSource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// Retry even after a missing-permission error
    /// Default: false
    pub retry_always: bool,

    /// Delay added per consecutive failure
    /// Default: 200 milliseconds
    pub retry_step: Duration,

    /// Ceiling for a single retry delay
    /// Default: 15 seconds
    pub max_retry_delay: Duration,

    /// Period of the check for a dropped weak listener
    /// Default: 5 seconds
    pub listener_check_interval: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            retry_always: false,
            retry_step: RETRY_STEP,
            max_retry_delay: MAX_RETRY_DELAY,
            listener_check_interval: CHECK_INTERVAL,
        }
    }
}

impl SourceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<(), SourceError> {
        if self.listener_check_interval.is_zero() {
            return Err(SourceError::Configuration(
                "Listener check interval must be greater than 0".to_string(),
            ));
        }

        if self.max_retry_delay < self.retry_step {
            return Err(SourceError::Configuration(format!(
                "Max retry delay ({:?}) must not be below the retry step ({:?})",
                self.max_retry_delay, self.retry_step
            )));
        }

        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_step, self.max_retry_delay)
    }

    pub fn with_retry_always(mut self, retry_always: bool) -> Self {
        self.retry_always = retry_always;
        self
    }

    pub fn with_retry_step(mut self, step: Duration) -> Self {
        self.retry_step = step;
        self
    }

    pub fn with_max_retry_delay(mut self, max: Duration) -> Self {
        self.max_retry_delay = max;
        self
    }

    pub fn with_listener_check_interval(mut self, interval: Duration) -> Self {
        self.listener_check_interval = interval;
        self
    }
}
