//! Subscribers of the location stream
//!
//! A subscriber is an observer plus a liveness flag. The flag is flipped from
//! the subscriber side only: by [`Subscription::unsubscribe`], by dropping the
//! [`Subscription`], or when the subscriber consumes its terminal event. The
//! hub never flips it; it only notices dead subscribers and prunes them on the
//! next fan-out or watchdog tick.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use location_api::Location;

use crate::error::LocationError;

/// Receives the events of one location stream session
///
/// A session is zero or more `on_next` calls followed by at most one of
/// `on_error` or `on_complete`. Calls may arrive on any thread.
pub trait LocationObserver: Send + Sync {
    fn on_next(&self, location: &Location);

    fn on_error(&self, error: &LocationError);

    fn on_complete(&self);
}

/// Process-unique subscriber identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subscriber-{}", self.0)
    }
}

/// Shared state between the hub's collection and the caller's handle
pub(crate) struct SubscriberCell {
    id: SubscriberId,
    observer: Arc<dyn LocationObserver>,
    unsubscribed: AtomicBool,
}

impl SubscriberCell {
    pub(crate) fn new(observer: Arc<dyn LocationObserver>) -> Arc<Self> {
        Arc::new(Self {
            id: SubscriberId::next(),
            observer,
            unsubscribed: AtomicBool::new(false),
        })
    }

    pub(crate) fn id(&self) -> SubscriberId {
        self.id
    }

    pub(crate) fn is_unsubscribed(&self) -> bool {
        self.unsubscribed.load(Ordering::Acquire)
    }

    pub(crate) fn unsubscribe(&self) {
        self.unsubscribed.store(true, Ordering::Release);
    }

    /// Deliver a location; returns false if the subscriber is dead
    pub(crate) fn deliver_next(&self, location: &Location) -> bool {
        if self.is_unsubscribed() {
            return false;
        }
        self.observer.on_next(location);
        true
    }

    /// Deliver the terminal error, at most once
    pub(crate) fn deliver_error(&self, error: &LocationError) {
        if !self.unsubscribed.swap(true, Ordering::AcqRel) {
            self.observer.on_error(error);
        }
    }

    /// Deliver the terminal completion, at most once
    pub(crate) fn deliver_complete(&self) {
        if !self.unsubscribed.swap(true, Ordering::AcqRel) {
            self.observer.on_complete();
        }
    }
}

/// Caller-side handle of a subscription
///
/// Unsubscribing is fire-and-forget: the hub observes it on its next fan-out
/// or watchdog tick. Dropping the handle unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cell: Arc<SubscriberCell>,
}

impl Subscription {
    pub(crate) fn new(cell: Arc<SubscriberCell>) -> Self {
        Self { cell }
    }

    pub fn id(&self) -> SubscriberId {
        self.cell.id()
    }

    /// Mark the subscriber dead
    pub fn unsubscribe(&self) {
        self.cell.unsubscribe();
    }

    /// Whether the subscriber unsubscribed or already got its terminal event
    pub fn is_unsubscribed(&self) -> bool {
        self.cell.is_unsubscribed()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.cell.id())
            .field("unsubscribed", &self.cell.is_unsubscribed())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cell.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl LocationObserver for Recorder {
        fn on_next(&self, location: &Location) {
            self.events.lock().push(format!("next {}", location.latitude));
        }

        fn on_error(&self, error: &LocationError) {
            self.events.lock().push(format!("error {error}"));
        }

        fn on_complete(&self) {
            self.events.lock().push("complete".to_string());
        }
    }

    #[test]
    fn test_single_terminal_event() {
        let recorder = Arc::new(Recorder::default());
        let cell = SubscriberCell::new(recorder.clone());

        assert!(cell.deliver_next(&Location::new(1.0, 2.0)));
        cell.deliver_complete();
        cell.deliver_error(&LocationError::ConnectionFailure("late".into()));
        assert!(!cell.deliver_next(&Location::new(3.0, 4.0)));

        assert_eq!(*recorder.events.lock(), vec!["next 1", "complete"]);
        assert!(cell.is_unsubscribed());
    }

    #[test]
    fn test_drop_unsubscribes() {
        let cell = SubscriberCell::new(Arc::new(Recorder::default()));
        let subscription = Subscription::new(Arc::clone(&cell));
        assert!(!cell.is_unsubscribed());
        assert_eq!(subscription.id(), cell.id());

        drop(subscription);
        assert!(cell.is_unsubscribed());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = SubscriberCell::new(Arc::new(Recorder::default()));
        let b = SubscriberCell::new(Arc::new(Recorder::default()));
        assert_ne!(a.id(), b.id());
        assert!(a.id().to_string().starts_with("subscriber-"));
    }
}
