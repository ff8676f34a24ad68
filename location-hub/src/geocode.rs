//! Geocoding bridge on top of the location stream
//!
//! The geocoding service itself is external: a platform integration provides
//! a [`Geocoder`]. The hub adds the glue: it resolves the current location
//! before geocoding, applies the configured language and API key, and lets a
//! global [`ErrorHandler`] swallow service errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by a [`Geocoder`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeocoderError {
    /// The service answered with a non-OK status
    #[error("Google API error status: {0}")]
    ServiceStatus(String),

    /// The request could not be completed
    #[error("Geocoder transport error: {message}")]
    Transport { message: String },
}

impl GeocoderError {
    /// The service status, when the error came from the service itself
    pub fn service_status(&self) -> Option<&str> {
        match self {
            GeocoderError::ServiceStatus(status) => Some(status),
            GeocoderError::Transport { .. } => None,
        }
    }
}

/// A latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

/// A rectangular area given by two opposite corners
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLngBounds {
    pub southwest: LatLng,
    pub northeast: LatLng,
}

impl LatLngBounds {
    pub fn contains(&self, point: LatLng) -> bool {
        point.latitude >= self.southwest.latitude
            && point.latitude <= self.northeast.latitude
            && point.longitude >= self.southwest.longitude
            && point.longitude <= self.northeast.longitude
    }
}

/// A structured postal address
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub address_lines: Vec<String>,
    pub thoroughfare: Option<String>,
    pub locality: Option<String>,
    pub admin_area: Option<String>,
    pub postal_code: Option<String>,
    pub country_name: Option<String>,
    pub country_code: Option<String>,
    pub position: Option<LatLng>,
}

/// Result of looking up a place by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationInfo {
    pub formatted_address: String,
    pub location: Option<LatLng>,
    pub viewport: Option<LatLngBounds>,
}

/// Converts between coordinates and places
///
/// Implementations may block on network I/O.
pub trait Geocoder: Send + Sync {
    /// Addresses near the given coordinates, at most `max_results`
    fn addresses_from_location(
        &self,
        latitude: f64,
        longitude: f64,
        max_results: usize,
        language: &str,
        api_key: &str,
    ) -> Result<Vec<Address>, GeocoderError>;

    /// Position and bounds of a named place
    fn location_info(
        &self,
        place_name: &str,
        language: &str,
        api_key: &str,
    ) -> Result<LocationInfo, GeocoderError>;
}

/// Customizes the handling of geocoder errors
pub trait ErrorHandler: Send + Sync {
    /// Called with every geocoder error
    ///
    /// Returning `true` stops propagation: an empty address list is returned
    /// instead. Returning `false` hands the error to the caller.
    fn intercept_geocoder_error(&self, error: &GeocoderError) -> bool;
}
