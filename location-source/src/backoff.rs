//! Linear backoff between resubscription attempts

use std::time::Duration;

/// Default delay added per failed attempt
pub const RETRY_STEP: Duration = Duration::from_millis(200);

/// Default ceiling for any single retry delay
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(15);

/// Delay before retry number `attempt` (1-based)
///
/// `min(max, step * (attempt - 1))`: the first retry is immediate, each
/// following one waits another `step`, never longer than `max`.
pub fn backoff_delay(attempt: u32, step: Duration, max: Duration) -> Duration {
    step.saturating_mul(attempt.saturating_sub(1)).min(max)
}

/// Step and ceiling of a retry schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub step: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            step: RETRY_STEP,
            max_delay: MAX_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(step: Duration, max_delay: Duration) -> Self {
        Self { step, max_delay }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        backoff_delay(attempt, self.step, self.max_delay)
    }

    /// First attempt whose delay reaches the ceiling
    pub fn attempts_until_ceiling(&self) -> u32 {
        if self.step.is_zero() {
            return u32::MAX;
        }
        let steps = self.max_delay.as_nanos().div_ceil(self.step.as_nanos());
        u32::try_from(steps).map_or(u32::MAX, |s| s.saturating_add(1))
    }
}
