//! Upstream location provider connection
//!
//! The connector is the single, expensive handle to the platform's location
//! service. It is driven exclusively by the hub: nothing else may call
//! `connect` or `disconnect`. Results of `connect` are reported later through
//! [`ConnectionCallbacks`], and continuous updates arrive through a
//! [`LocationListener`], both possibly on a thread the connector owns.

use std::sync::Arc;

use crate::location::Location;
use crate::request::LocationRequest;

/// Connection lifecycle notifications sent by the connector
pub trait ConnectionCallbacks: Send + Sync {
    /// The connection requested through [`LocationConnector::connect`] is up
    fn on_connected(&self);

    /// The connection was temporarily lost; the connector reconnects on its own
    fn on_connection_suspended(&self, cause: i32);

    /// The connection attempt failed or the connection broke permanently
    fn on_connection_failed(&self, reason: String);
}

/// Receives continuous location updates
pub trait LocationListener: Send + Sync {
    fn on_location_changed(&self, location: Location);
}

/// The shared upstream connection to the platform location provider
///
/// All methods are fire-and-forget from the caller's point of view and must
/// not block waiting for the provider.
pub trait LocationConnector: Send + Sync {
    /// Start connecting; `callbacks` receive the outcome
    fn connect(&self, callbacks: Arc<dyn ConnectionCallbacks>);

    /// Drop the connection
    fn disconnect(&self);

    fn is_connected(&self) -> bool;

    fn is_connecting(&self) -> bool;

    /// One-shot query of the most recent fix known to the provider
    fn last_known_location(&self) -> Option<Location>;

    /// Start continuous updates using the given profile
    fn request_location_updates(&self, request: &LocationRequest, listener: Arc<dyn LocationListener>);

    /// Stop continuous updates previously started with `listener`
    fn remove_location_updates(&self, listener: Arc<dyn LocationListener>);
}
