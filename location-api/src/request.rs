//! Request profile for continuous location updates
//!
//! A [`LocationRequest`] tells the upstream provider how often and how
//! accurately to report. Defaults favour battery life: one update per hour,
//! never more than one per minute, balanced power accuracy.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{RequestError, Result};

/// Default interval between updates (60 minutes)
pub const LONGER_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Default fastest interval between updates (1 minute)
pub const FASTEST_INTERVAL: Duration = Duration::from_secs(60);

/// Accuracy/power trade-off requested from the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Priority {
    /// Most accurate locations available, highest power use
    HighAccuracy,
    /// Block-level accuracy
    #[default]
    BalancedPowerAccuracy,
    /// City-level accuracy
    LowPower,
    /// Only piggy-back on updates requested by others
    NoPower,
}

impl Priority {
    /// Whether this priority needs fine-grained permission and settings
    pub fn requires_high_accuracy(&self) -> bool {
        matches!(self, Priority::HighAccuracy)
    }
}

/// Profile handed to the connector when continuous updates start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRequest {
    /// Desired interval between updates
    pub interval: Duration,

    /// Updates are never delivered faster than this
    pub fastest_interval: Duration,

    /// Accuracy/power trade-off
    pub priority: Priority,

    /// Absolute time after which updates stop
    pub expiration_time: Option<DateTime<Utc>>,

    /// Duration after which updates stop, counted from the request
    pub expiration_duration: Option<Duration>,

    /// Stop after this many updates
    pub num_updates: Option<u32>,

    /// Minimum distance in meters between two reported locations
    pub smallest_displacement: Option<f32>,
}

impl Default for LocationRequest {
    fn default() -> Self {
        Self {
            interval: LONGER_INTERVAL,
            fastest_interval: FASTEST_INTERVAL,
            priority: Priority::BalancedPowerAccuracy,
            expiration_time: None,
            expiration_duration: None,
            num_updates: None,
            smallest_displacement: None,
        }
    }
}

impl LocationRequest {
    /// Create a request with the default profile
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a request with explicit intervals and balanced power accuracy
    pub fn with_intervals(interval: Duration, fastest_interval: Duration) -> Self {
        Self {
            interval,
            fastest_interval,
            ..Default::default()
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_fastest_interval(mut self, fastest_interval: Duration) -> Self {
        self.fastest_interval = fastest_interval;
        self
    }

    pub fn with_expiration_time(mut self, time: DateTime<Utc>) -> Self {
        self.expiration_time = Some(time);
        self
    }

    pub fn with_expiration_duration(mut self, duration: Duration) -> Self {
        self.expiration_duration = Some(duration);
        self
    }

    pub fn with_num_updates(mut self, num_updates: u32) -> Self {
        self.num_updates = Some(num_updates);
        self
    }

    pub fn with_smallest_displacement(mut self, meters: f32) -> Self {
        self.smallest_displacement = Some(meters);
        self
    }

    /// Validate the profile before it reaches the provider
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(RequestError::InvalidInterval(self.interval));
        }

        if self.fastest_interval > self.interval {
            return Err(RequestError::InvalidFastestInterval {
                fastest: self.fastest_interval,
                interval: self.interval,
            });
        }

        if self.num_updates == Some(0) {
            return Err(RequestError::InvalidUpdateCount);
        }

        if let Some(meters) = self.smallest_displacement {
            if !meters.is_finite() || meters < 0.0 {
                return Err(RequestError::InvalidDisplacement(meters));
            }
        }

        Ok(())
    }
}
