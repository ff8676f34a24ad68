//! Configuration types for the location hub
//!
//! This module defines the per-profile configuration of a
//! [`LocationHub`](crate::LocationHub): the request handed to the provider,
//! the watchdog period and the optional geocoding settings.

use std::time::Duration;

use location_api::{LocationRequest, Priority};

use crate::error::HubError;

/// Default period of the subscriber liveness watchdog
pub const CHECK_INTERVAL: Duration = Duration::from_secs(5);

/// Configuration for the LocationHub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Profile used when continuous updates are started
    /// Default: 60 minute interval, 1 minute fastest, balanced power
    pub request: LocationRequest,

    /// Period of the watchdog that prunes dead subscribers
    /// Default: 5 seconds
    pub watchdog_interval: Duration,

    /// Whether subscribing requires fine permission and high accuracy mode
    /// Default: false
    pub high_accuracy_required: bool,

    /// API key enabling the geocoding bridge
    /// Default: None
    pub google_api_key: Option<String>,

    /// Language code passed to the geocoder
    /// Default: "en"
    pub language: String,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            request: LocationRequest::default(),
            watchdog_interval: CHECK_INTERVAL,
            high_accuracy_required: false,
            google_api_key: None,
            language: "en".to_string(),
        }
    }
}

impl HubConfig {
    /// Create a new HubConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a HubConfig for infrequent, low power updates
    pub fn battery_conservative() -> Self {
        Self {
            request: LocationRequest::with_intervals(
                Duration::from_secs(60 * 60),
                Duration::from_secs(15 * 60),
            )
            .with_priority(Priority::LowPower),
            ..Default::default()
        }
    }

    /// Create a HubConfig for frequent, high accuracy updates
    pub fn high_accuracy() -> Self {
        Self {
            request: LocationRequest::with_intervals(
                Duration::from_secs(10),
                Duration::from_secs(5),
            )
            .with_priority(Priority::HighAccuracy),
            high_accuracy_required: true,
            ..Default::default()
        }
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<(), HubError> {
        self.request.validate()?;

        if self.watchdog_interval.is_zero() {
            return Err(HubError::Configuration(
                "Watchdog interval must be greater than 0".to_string(),
            ));
        }

        if self.language.trim().is_empty() {
            return Err(HubError::Configuration(
                "Geocoder language must not be empty".to_string(),
            ));
        }

        if matches!(self.google_api_key.as_deref(), Some(key) if key.trim().is_empty()) {
            return Err(HubError::Configuration(
                "Google API key must not be empty when set".to_string(),
            ));
        }

        Ok(())
    }

    /// Builder pattern methods for fluent configuration

    pub fn with_request(mut self, request: LocationRequest) -> Self {
        self.request = request;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.request.priority = priority;
        self
    }

    pub fn with_intervals(mut self, interval: Duration, fastest_interval: Duration) -> Self {
        self.request.interval = interval;
        self.request.fastest_interval = fastest_interval;
        self
    }

    pub fn with_watchdog_interval(mut self, interval: Duration) -> Self {
        self.watchdog_interval = interval;
        self
    }

    pub fn with_high_accuracy_required(mut self, required: bool) -> Self {
        self.high_accuracy_required = required;
        self
    }

    pub fn with_google_api_key(mut self, key: impl Into<String>) -> Self {
        self.google_api_key = Some(key.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}
