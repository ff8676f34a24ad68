//! Blocking iterator over a location stream session
//!
//! [`LocationStream`] is a channel-backed subscriber for callers that prefer
//! pulling locations over implementing [`LocationObserver`]. It yields
//! `Ok(location)` items, then either one `Err(error)` item or nothing once the
//! session completes.

use std::sync::mpsc;
use std::time::Duration;

use location_api::Location;

use crate::error::LocationError;
use crate::subscriber::{LocationObserver, Subscription};

pub(crate) enum StreamEvent {
    Next(Location),
    Error(LocationError),
    Complete,
}

/// Observer forwarding every event into a channel
pub(crate) struct ChannelObserver {
    tx: mpsc::Sender<StreamEvent>,
}

impl ChannelObserver {
    pub(crate) fn new(tx: mpsc::Sender<StreamEvent>) -> Self {
        Self { tx }
    }
}

impl LocationObserver for ChannelObserver {
    fn on_next(&self, location: &Location) {
        let _ = self.tx.send(StreamEvent::Next(location.clone()));
    }

    fn on_error(&self, error: &LocationError) {
        let _ = self.tx.send(StreamEvent::Error(error.clone()));
    }

    fn on_complete(&self) {
        let _ = self.tx.send(StreamEvent::Complete);
    }
}

/// Blocking iterator over locations
///
/// Holds its own subscription; dropping the stream unsubscribes.
pub struct LocationStream {
    rx: mpsc::Receiver<StreamEvent>,
    subscription: Subscription,
    finished: bool,
}

impl LocationStream {
    pub(crate) fn new(rx: mpsc::Receiver<StreamEvent>, subscription: Subscription) -> Self {
        Self {
            rx,
            subscription,
            finished: false,
        }
    }

    /// Block until the next item is available
    ///
    /// Returns `None` once the session is over.
    pub fn recv(&mut self) -> Option<Result<Location, LocationError>> {
        if self.finished {
            return None;
        }
        let event = self.rx.recv().ok();
        self.handle(event)
    }

    /// Try to receive an item without blocking
    ///
    /// Returns `None` if nothing is available yet or the session is over.
    pub fn try_recv(&mut self) -> Option<Result<Location, LocationError>> {
        if self.finished {
            return None;
        }
        match self.rx.try_recv() {
            Ok(event) => self.handle(Some(event)),
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => self.handle(None),
        }
    }

    /// Block until an item is available or `timeout` expires
    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<Result<Location, LocationError>> {
        if self.finished {
            return None;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(event) => self.handle(Some(event)),
            Err(mpsc::RecvTimeoutError::Timeout) => None,
            Err(mpsc::RecvTimeoutError::Disconnected) => self.handle(None),
        }
    }

    /// Non-blocking iterator over currently available items
    pub fn try_iter(&mut self) -> TryIter<'_> {
        TryIter { inner: self }
    }

    /// Blocking iterator waiting up to `timeout` for each item
    pub fn timeout_iter(&mut self, timeout: Duration) -> TimeoutIter<'_> {
        TimeoutIter {
            inner: self,
            timeout,
        }
    }

    /// Whether the session delivered its terminal event
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The subscription backing this stream
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    fn handle(&mut self, event: Option<StreamEvent>) -> Option<Result<Location, LocationError>> {
        match event {
            Some(StreamEvent::Next(location)) => Some(Ok(location)),
            Some(StreamEvent::Error(error)) => {
                self.finished = true;
                Some(Err(error))
            }
            Some(StreamEvent::Complete) | None => {
                self.finished = true;
                None
            }
        }
    }
}

impl Iterator for LocationStream {
    type Item = Result<Location, LocationError>;

    /// Block until the next item is available
    fn next(&mut self) -> Option<Self::Item> {
        self.recv()
    }
}

/// Non-blocking iterator over currently available items
pub struct TryIter<'a> {
    inner: &'a mut LocationStream,
}

impl<'a> Iterator for TryIter<'a> {
    type Item = Result<Location, LocationError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.try_recv()
    }
}

/// Blocking iterator with timeout
pub struct TimeoutIter<'a> {
    inner: &'a mut LocationStream,
    timeout: Duration,
}

impl<'a> Iterator for TimeoutIter<'a> {
    type Item = Result<Location, LocationError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.recv_timeout(self.timeout)
    }
}
