//! Error types for the location source

use thiserror::Error;

/// Errors raised while setting up a [`MapLocationSource`](crate::MapLocationSource)
///
/// Once running, the source recovers from stream failures by itself and
/// never reports them to its caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("Invalid source configuration: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, SourceError>;
