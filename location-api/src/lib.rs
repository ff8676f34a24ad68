//! Location data model and upstream provider interfaces
//!
//! This crate defines the types shared by every part of location-sdk: the
//! [`Location`] sample, the [`LocationRequest`] profile used when starting
//! continuous updates, and the traits implemented by the platform glue that
//! talks to the real location provider.
//!
//! # Provider Integration
//!
//! A platform integration implements [`LocationConnector`] (the expensive,
//! shared upstream connection) and [`AvailabilityChecker`] (permission and
//! settings checks). The hub in `location-hub` drives both:
//!
//! ```rust,ignore
//! use location_api::{Availability, AvailabilityChecker, LocationConnector};
//!
//! struct Settings;
//!
//! impl AvailabilityChecker for Settings {
//!     fn check_availability(&self, high_accuracy_required: bool) -> Availability {
//!         if high_accuracy_required { Availability::Disabled } else { Availability::Enabled }
//!     }
//! }
//! ```

pub mod availability;
pub mod connector;
pub mod error;
pub mod location;
pub mod request;

pub use availability::{Availability, AvailabilityChecker};
pub use connector::{ConnectionCallbacks, LocationConnector, LocationListener};
pub use error::{RequestError, Result};
pub use location::Location;
pub use request::{LocationRequest, Priority, FASTEST_INTERVAL, LONGER_INTERVAL};
