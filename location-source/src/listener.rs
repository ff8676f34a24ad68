//! Listener receiving the locations of a [`MapLocationSource`](crate::MapLocationSource)

use std::fmt;
use std::sync::{Arc, Weak};

use location_api::Location;

/// Receives locations forwarded by a location source
///
/// May be called on a thread other than the one that activated the source.
pub trait OnLocationChangedListener: Send + Sync {
    fn on_location_changed(&self, location: &Location);
}

impl<F> OnLocationChangedListener for F
where
    F: Fn(&Location) + Send + Sync,
{
    fn on_location_changed(&self, location: &Location) {
        self(location)
    }
}

/// Liveness-checked reference to a listener
///
/// A `Weak` handle lets the listener's owner go away without deactivating the
/// source first; the source notices on the next delivery or check.
#[derive(Clone)]
pub enum ListenerHandle {
    Strong(Arc<dyn OnLocationChangedListener>),
    Weak(Weak<dyn OnLocationChangedListener>),
}

impl ListenerHandle {
    pub fn strong(listener: Arc<dyn OnLocationChangedListener>) -> Self {
        ListenerHandle::Strong(listener)
    }

    pub fn weak(listener: &Arc<dyn OnLocationChangedListener>) -> Self {
        ListenerHandle::Weak(Arc::downgrade(listener))
    }

    pub fn is_weak(&self) -> bool {
        matches!(self, ListenerHandle::Weak(_))
    }

    pub fn is_valid(&self) -> bool {
        match self {
            ListenerHandle::Strong(_) => true,
            ListenerHandle::Weak(weak) => weak.strong_count() > 0,
        }
    }

    /// Hand `location` to the listener; false if the listener is gone
    pub fn deliver(&self, location: &Location) -> bool {
        match self {
            ListenerHandle::Strong(listener) => {
                listener.on_location_changed(location);
                true
            }
            ListenerHandle::Weak(weak) => match weak.upgrade() {
                Some(listener) => {
                    listener.on_location_changed(location);
                    true
                }
                None => false,
            },
        }
    }
}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenerHandle::Strong(_) => f.write_str("ListenerHandle::Strong"),
            ListenerHandle::Weak(_) => write!(f, "ListenerHandle::Weak(valid={})", self.is_valid()),
        }
    }
}
