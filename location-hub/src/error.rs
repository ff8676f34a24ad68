use std::time::Duration;

use thiserror::Error;

use crate::geocode::GeocoderError;

/// Terminal errors delivered to subscribers of the location stream
///
/// A subscriber receives at most one of these, after which its session is
/// over. Location services being switched off is not an error: it ends the
/// stream with a normal completion instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    /// The location permission is missing
    ///
    /// At subscribe time it is delivered only to the subscriber that asked.
    /// When the permission is revoked while connecting, every live
    /// subscriber gets it. Retrying without the permission fails the same
    /// way every time.
    #[error("Missing location permission: {0}")]
    NoPermission(String),

    /// The shared upstream connection failed
    ///
    /// Delivered to every live subscriber at once since they all share the
    /// same connection.
    #[error("Location provider connection failed: {0}")]
    ConnectionFailure(String),
}

impl LocationError {
    pub(crate) fn no_permission() -> Self {
        Self::NoPermission(
            "You don't have required permissions, make sure to request them first".to_string(),
        )
    }

    pub(crate) fn permission_revoked() -> Self {
        Self::NoPermission(
            "You don't have required permissions, removed while connecting".to_string(),
        )
    }

    /// Whether this error means the permission is missing
    pub fn is_no_permission(&self) -> bool {
        matches!(self, LocationError::NoPermission(_))
    }
}

/// Errors returned by hub operations
#[derive(Error, Debug)]
pub enum HubError {
    /// Invalid hub configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The configured request profile is invalid
    #[error("Invalid location request: {0}")]
    InvalidRequest(#[from] location_api::RequestError),

    /// The private scheduler thread could not be started
    #[error("Failed to start scheduler: {0}")]
    Scheduler(String),

    /// Geocoding was requested but no API key or geocoder is configured
    #[error("Missing Google API Key, cannot perform reverse geolocation")]
    GeocoderDisabled,

    /// The geocoding service reported an error that was not intercepted
    #[error("Geocoder error: {0}")]
    Geocoder(#[from] GeocoderError),

    /// The location stream terminated with an error
    #[error(transparent)]
    Location(#[from] LocationError),

    /// No location arrived in time
    #[error("No location received within {0:?}")]
    Timeout(Duration),

    /// The location stream completed before producing a location
    #[error("Location stream ended without a location")]
    StreamEnded,
}

/// Result type for hub operations
pub type Result<T> = std::result::Result<T, HubError>;
