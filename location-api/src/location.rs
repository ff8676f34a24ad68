//! Location samples delivered by the upstream provider

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single location fix
///
/// Mirrors what platform providers report: a coordinate pair plus optional
/// quality and motion attributes. Only latitude and longitude are mandatory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Estimated horizontal accuracy radius in meters
    pub accuracy: Option<f32>,
    /// Altitude above the WGS84 ellipsoid in meters
    pub altitude: Option<f64>,
    /// Bearing in degrees
    pub bearing: Option<f32>,
    /// Ground speed in meters per second
    pub speed: Option<f32>,
    /// Name of the provider that produced the fix ("fused", "gps", ...)
    pub provider: String,
    /// When the fix was taken
    pub time: DateTime<Utc>,
}

impl Location {
    /// Create a fix at the given coordinates, timestamped now
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy: None,
            altitude: None,
            bearing: None,
            speed: None,
            provider: "fused".to_string(),
            time: Utc::now(),
        }
    }

    pub fn with_accuracy(mut self, meters: f32) -> Self {
        self.accuracy = Some(meters);
        self
    }

    pub fn with_altitude(mut self, meters: f64) -> Self {
        self.altitude = Some(meters);
        self
    }

    pub fn with_bearing(mut self, degrees: f32) -> Self {
        self.bearing = Some(degrees);
        self
    }

    pub fn with_speed(mut self, meters_per_second: f32) -> Self {
        self.speed = Some(meters_per_second);
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = time;
        self
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Location[{} {:.6},{:.6}",
            self.provider, self.latitude, self.longitude
        )?;
        if let Some(accuracy) = self.accuracy {
            write!(f, " acc={accuracy:.1}")?;
        }
        write!(f, "]")
    }
}
