//! # Location Hub
//!
//! Demand-driven fan-out of a single, expensive upstream location connection
//! to any number of subscribers.
//!
//! ## Overview
//!
//! Keeping a platform location provider connected costs battery, so the hub
//! only keeps it open while somebody listens. Subscribers come and go freely
//! from any thread; the hub connects on the first one and disconnects once a
//! fan-out or its watchdog finds none left alive.
//!
//! ## Key Features
//!
//! - **Lazy connection**: `connect()` on the first live subscriber, `disconnect()` after the last
//! - **Exactly-once fan-out**: every live subscriber sees every sample once, in provider order
//! - **Catch-up on join**: late subscribers get the last known location, not a backlog
//! - **Watchdog**: periodic pruning of dead subscribers on a private scheduler thread
//! - **Geocoding bridge**: addresses for the current location through a pluggable geocoder
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use location_hub::{HubConfig, LocationHub};
//!
//! let hub = LocationHub::new(connector, checker, HubConfig::default())?;
//!
//! // Subscribe with a blocking iterator
//! let mut stream = hub.locations();
//! if let Some(Ok(location)) = stream.recv_timeout(std::time::Duration::from_secs(10)) {
//!     println!("Now at {}", location);
//! }
//!
//! // Or with an observer
//! let subscription = hub.subscribe(Arc::new(MyObserver));
//! subscription.unsubscribe();
//! ```
//!
//! ## Termination
//!
//! A session ends with at most one terminal event. Missing permission is an
//! error for the requesting subscriber only; disabled location services end
//! the session with a completion; a failed upstream connection is an error
//! for every live subscriber.

pub mod config;
pub mod error;
pub mod geocode;
pub mod hub;
pub mod iter;
pub mod logging;
pub mod scheduler;
pub mod subscriber;

// Re-export main types for convenience
pub use config::{HubConfig, CHECK_INTERVAL};
pub use error::{HubError, LocationError, Result};
pub use geocode::{Address, ErrorHandler, Geocoder, GeocoderError, LatLng, LatLngBounds, LocationInfo};
pub use hub::{ConnectionState, HubCallbacks, LocationHub};
pub use iter::LocationStream;
pub use scheduler::{ScheduledTask, Scheduler};
pub use subscriber::{LocationObserver, SubscriberId, Subscription};

// Re-export commonly used types from dependencies
pub use location_api::{
    Availability, AvailabilityChecker, ConnectionCallbacks, Location, LocationConnector,
    LocationListener, LocationRequest, Priority,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Availability, AvailabilityChecker, HubConfig, HubError, Location, LocationConnector,
        LocationError, LocationHub, LocationObserver, LocationRequest, LocationStream, Priority,
        Result, Subscription,
    };
}
