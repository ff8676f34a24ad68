//! # Location Source
//!
//! A "pull"-style location source for map views, layered on a
//! [`LocationHub`](location_hub::LocationHub).
//!
//! While activated, a [`MapLocationSource`] holds a single hub subscription
//! and forwards each location to one listener. Errors and completions end
//! that subscription; the source then subscribes again after a delay growing
//! by 200 ms per attempt, capped at 15 s, until [`MapLocationSource::deactivate`]
//! is called. A missing permission stops the retries unless `retry_always`
//! is set.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use location_source::{LocationSourceExt, OnLocationChangedListener};
//!
//! let source = hub.new_location_source(false)?;
//! let listener: Arc<dyn OnLocationChangedListener> = Arc::new(map_view.clone());
//!
//! // The map view owns its listener; the source only watches it
//! source.activate_weak(&listener);
//! ```

pub mod backoff;
pub mod config;
pub mod error;
pub mod listener;
pub mod source;

pub use backoff::{backoff_delay, RetryPolicy, MAX_RETRY_DELAY, RETRY_STEP};
pub use config::SourceConfig;
pub use error::{Result, SourceError};
pub use listener::{ListenerHandle, OnLocationChangedListener};
pub use source::{LocationSourceExt, MapLocationSource};
