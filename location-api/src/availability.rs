//! Permission and settings availability

use serde::{Deserialize, Serialize};

/// Result of checking whether location can be obtained at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Availability {
    /// Permission granted and location services switched on
    Enabled,
    /// Permission granted but location services are switched off
    Disabled,
    /// The required location permission has not been granted
    NoPermission,
}

impl Availability {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Availability::Enabled)
    }
}

/// Checks permissions and device settings before subscribing
///
/// Implemented by the platform layer. When `high_accuracy_required` is true
/// the check must require fine-grained permission and high accuracy mode;
/// otherwise coarse permission and any enabled mode suffice.
pub trait AvailabilityChecker: Send + Sync {
    fn check_availability(&self, high_accuracy_required: bool) -> Availability;
}

impl<F> AvailabilityChecker for F
where
    F: Fn(bool) -> Availability + Send + Sync,
{
    fn check_availability(&self, high_accuracy_required: bool) -> Availability {
        self(high_accuracy_required)
    }
}
