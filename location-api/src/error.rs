use std::time::Duration;

use thiserror::Error;

/// Errors produced when validating a [`LocationRequest`](crate::LocationRequest)
///
/// A request that fails validation is never handed to the upstream
/// connector; the hub refuses to start with it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RequestError {
    /// The update interval must be greater than zero
    #[error("Invalid interval: {0:?} (must be greater than zero)")]
    InvalidInterval(Duration),

    /// The fastest interval may not exceed the regular interval
    #[error("Invalid fastest interval: {fastest:?} is greater than interval {interval:?}")]
    InvalidFastestInterval {
        fastest: Duration,
        interval: Duration,
    },

    /// A limit on the number of updates must allow at least one update
    #[error("Invalid update count: must be at least 1")]
    InvalidUpdateCount,

    /// Smallest displacement must be a finite, non-negative distance
    #[error("Invalid smallest displacement: {0} meters")]
    InvalidDisplacement(f32),
}

/// Type alias for results that can return a RequestError
pub type Result<T> = std::result::Result<T, RequestError>;
