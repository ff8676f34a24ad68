//! Logging setup for location-sdk
//!
//! All crates log through `tracing`. Verbosity is chosen once by the
//! application through [`init_logging`] instead of a process-wide debug flag.

use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Logging mode for different use cases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// No subscriber installed; all events are dropped
    Silent,
    /// Compact stderr output at info level
    Development,
    /// Verbose output with thread ids and source locations
    Debug,
}

/// Logging configuration error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),
}

/// Initialize logging with the specified mode
///
/// Call early, before creating any hub.
///
/// # Environment Variables
///
/// - `LOCATION_SDK_LOG_LEVEL`: filter directive overriding the mode's level
///   (e.g. `location_hub=debug`)
/// - `RUST_LOG`: used when `LOCATION_SDK_LOG_LEVEL` is not set
pub fn init_logging(mode: LoggingMode) -> Result<(), LoggingError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    match mode {
        LoggingMode::Silent => Ok(()),
        LoggingMode::Development => {
            let subscriber = Registry::default()
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_thread_ids(false)
                        .compact(),
                )
                .with(create_env_filter("info"));

            subscriber
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
        LoggingMode::Debug => {
            let subscriber = Registry::default()
                .with(
                    fmt::layer()
                        .with_thread_ids(true)
                        .with_thread_names(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .with(create_env_filter("debug"));

            subscriber
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
    }
}

/// Initialize logging from `LOCATION_SDK_LOG_MODE`
///
/// - "development" -> LoggingMode::Development
/// - "debug" -> LoggingMode::Debug
/// - anything else -> LoggingMode::Silent
pub fn init_logging_from_env() -> Result<(), LoggingError> {
    init_logging(mode_from_env(std::env::var("LOCATION_SDK_LOG_MODE").ok().as_deref()))
}

fn mode_from_env(value: Option<&str>) -> LoggingMode {
    match value {
        Some("development") => LoggingMode::Development,
        Some("debug") => LoggingMode::Debug,
        _ => LoggingMode::Silent,
    }
}

/// Environment filter with fallback to the mode's default level
fn create_env_filter(default_level: &str) -> EnvFilter {
    if let Ok(level) = std::env::var("LOCATION_SDK_LOG_LEVEL") {
        EnvFilter::new(level)
    } else if let Ok(rust_log) = std::env::var("RUST_LOG") {
        EnvFilter::new(rust_log)
    } else {
        EnvFilter::new(default_level)
    }
}

/// Whether a global tracing subscriber is already installed
pub fn is_initialized() -> bool {
    tracing::dispatcher::has_been_set()
}
