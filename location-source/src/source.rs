//! Self-healing location source
//!
//! [`MapLocationSource`] keeps exactly one subscription to a [`LocationHub`]
//! open while activated and forwards every location to a single listener.
//! When the stream ends, with an error or a completion, it subscribes again
//! after a linearly growing delay until it is deactivated.

use std::sync::{Arc, Weak};

use location_api::Location;
use location_hub::{LocationError, LocationHub, LocationObserver, ScheduledTask, Subscription};
use parking_lot::{Mutex, ReentrantMutex};

use crate::backoff::RetryPolicy;
use crate::config::SourceConfig;
use crate::error::Result;
use crate::listener::{ListenerHandle, OnLocationChangedListener};

/// Location source for a map view, resubscribing with backoff on failure
///
/// Cheap to clone; clones control the same source. Dropping the last clone
/// deactivates it.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use location_source::{MapLocationSource, SourceConfig};
///
/// let source = MapLocationSource::new(hub.clone(), SourceConfig::default())?;
/// source.activate(Arc::new(|location: &Location| {
///     println!("Blue dot moves to {}", location);
/// }));
///
/// // Later, when the map goes away
/// source.deactivate();
/// ```
#[derive(Clone)]
pub struct MapLocationSource {
    inner: Arc<SourceInner>,
}

struct SourceState {
    activated: bool,

    /// Bumped by every activate and deactivate; stale timers compare it
    episode: u64,

    /// Bumped by every subscription attempt and terminal event; events from
    /// older subscriptions are ignored
    generation: u64,

    /// Consecutive resubscriptions since the last activate
    retry_count: u32,

    listener: Option<ListenerHandle>,
    subscription: Option<Subscription>,
    pending_retry: Option<ScheduledTask>,

    /// Periodic check for a dropped weak listener
    listener_check: Option<ScheduledTask>,
}

struct SourceInner {
    hub: LocationHub,
    config: SourceConfig,
    policy: RetryPolicy,

    /// Held while forwarding to the listener and while deactivating, so that
    /// no delivery starts after `deactivate()` returns
    delivery: ReentrantMutex<()>,

    state: Mutex<SourceState>,
}

impl MapLocationSource {
    /// Create an inactive source on top of `hub`
    pub fn new(hub: LocationHub, config: SourceConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            inner: Arc::new(SourceInner {
                hub,
                policy: config.retry_policy(),
                config,
                delivery: ReentrantMutex::new(()),
                state: Mutex::new(SourceState {
                    activated: false,
                    episode: 0,
                    generation: 0,
                    retry_count: 0,
                    listener: None,
                    subscription: None,
                    pending_retry: None,
                    listener_check: None,
                }),
            }),
        })
    }

    pub fn with_defaults(hub: LocationHub) -> Result<Self> {
        Self::new(hub, SourceConfig::default())
    }

    /// Start forwarding locations to `listener`
    ///
    /// Ignored with a warning when already activated.
    pub fn activate(&self, listener: Arc<dyn OnLocationChangedListener>) {
        self.inner.activate(ListenerHandle::strong(listener));
    }

    /// Like [`activate`](Self::activate) without keeping `listener` alive
    ///
    /// Once the listener is dropped elsewhere the source deactivates itself,
    /// at the latest after `listener_check_interval`.
    pub fn activate_weak(&self, listener: &Arc<dyn OnLocationChangedListener>) {
        self.inner.activate(ListenerHandle::weak(listener));
    }

    /// Stop forwarding and cancel any pending retry
    ///
    /// Idempotent. Once this returns the listener is not called again.
    pub fn deactivate(&self) {
        self.inner.deactivate();
    }

    pub fn is_activated(&self) -> bool {
        self.inner.state.lock().activated
    }

    /// Resubscriptions since the last activation
    pub fn retry_count(&self) -> u32 {
        self.inner.state.lock().retry_count
    }

    /// Whether a hub subscription is currently open
    pub fn has_subscription(&self) -> bool {
        self.inner.state.lock().subscription.is_some()
    }

    pub fn has_pending_retry(&self) -> bool {
        self.inner
            .state
            .lock()
            .pending_retry
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    pub fn config(&self) -> &SourceConfig {
        &self.inner.config
    }
}

impl std::fmt::Debug for MapLocationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("MapLocationSource")
            .field("activated", &state.activated)
            .field("retry_count", &state.retry_count)
            .field("subscribed", &state.subscription.is_some())
            .finish()
    }
}

impl SourceInner {
    fn activate(self: &Arc<Self>, listener: ListenerHandle) {
        let episode = {
            let mut state = self.state.lock();
            if state.activated {
                tracing::warn!("Location source already activated, ignoring");
                return;
            }

            state.activated = true;
            state.episode += 1;
            state.retry_count = 0;
            if listener.is_weak() {
                state.listener_check = Some(self.start_listener_check(state.episode));
            }
            state.listener = Some(listener);
            state.episode
        };

        tracing::debug!("Location source activated");
        self.subscribe_to_hub(episode);
    }

    fn start_listener_check(self: &Arc<Self>, episode: u64) -> ScheduledTask {
        let weak = Arc::downgrade(self);
        let period = self.config.listener_check_interval;

        self.hub.scheduler().schedule_at_fixed_rate(period, period, move || {
            if let Some(inner) = weak.upgrade() {
                inner.check_listener(episode);
            }
        })
    }

    fn check_listener(&self, episode: u64) {
        let gone = {
            let state = self.state.lock();
            state.activated
                && state.episode == episode
                && state.listener.as_ref().is_some_and(|l| !l.is_valid())
        };

        if gone {
            tracing::debug!("Location listener was dropped, deactivating location source");
            self.deactivate();
        }
    }

    /// Open a new hub subscription for `episode`
    ///
    /// The state lock is released around `subscribe`, which may call the
    /// observer back synchronously. The hub re-checks the episode under its
    /// exclusion before registering, so a concurrent `deactivate` either
    /// wins and nothing is registered, or runs after the registration and
    /// the subscription is released here.
    fn subscribe_to_hub(self: &Arc<Self>, episode: u64) {
        let generation = {
            let mut state = self.state.lock();
            if !state.activated || state.episode != episode {
                return;
            }
            state.generation += 1;
            state.generation
        };

        let observer = Arc::new(SourceObserver {
            inner: Arc::downgrade(self),
            generation,
        });
        let subscription = self.hub.subscribe_if(observer, || {
            let state = self.state.lock();
            state.activated && state.episode == episode && state.generation == generation
        });

        let stale = {
            let mut state = self.state.lock();
            if state.activated && state.generation == generation && !subscription.is_unsubscribed() {
                state.subscription = Some(subscription);
                None
            } else {
                Some(subscription)
            }
        };

        if let Some(subscription) = stale {
            subscription.unsubscribe();
        }
    }

    fn on_location(&self, generation: u64, location: &Location) {
        let _delivery = self.delivery.lock();

        let listener = {
            let state = self.state.lock();
            if !state.activated || state.generation != generation {
                return;
            }
            state.listener.clone()
        };

        if let Some(listener) = listener {
            if !listener.deliver(location) {
                tracing::debug!("Location listener was dropped, deactivating location source");
                self.deactivate();
            }
        }
    }

    fn on_error(self: &Arc<Self>, generation: u64, error: &LocationError) {
        tracing::error!("Location subscription error: {}", error);

        let mut state = self.state.lock();
        if !self.end_subscription(&mut state, generation) {
            return;
        }

        if error.is_no_permission() && !self.config.retry_always {
            tracing::debug!("No location permission, not retrying");
            return;
        }
        self.schedule_retry(&mut state);
    }

    fn on_complete(self: &Arc<Self>, generation: u64) {
        let mut state = self.state.lock();
        if !self.end_subscription(&mut state, generation) {
            return;
        }

        tracing::debug!("Location subscription completed");
        self.schedule_retry(&mut state);
    }

    /// Forget the subscription that produced a terminal event
    ///
    /// Returns false when the event belongs to an outdated subscription.
    fn end_subscription(&self, state: &mut SourceState, generation: u64) -> bool {
        if !state.activated || state.generation != generation {
            return false;
        }
        state.generation += 1;
        state.subscription = None;
        true
    }

    fn schedule_retry(self: &Arc<Self>, state: &mut SourceState) {
        state.retry_count = state.retry_count.saturating_add(1);
        let delay = self.policy.delay_for(state.retry_count);
        let episode = state.episode;

        tracing::debug!(
            "Resubscribing to location in {:?} (retry {})",
            delay,
            state.retry_count
        );

        let weak = Arc::downgrade(self);
        let task = self.hub.scheduler().schedule(delay, move || {
            if let Some(inner) = weak.upgrade() {
                inner.retry(episode);
            }
        });

        if let Some(previous) = state.pending_retry.replace(task) {
            previous.cancel();
        }
    }

    fn retry(self: &Arc<Self>, episode: u64) {
        {
            let mut state = self.state.lock();
            if !state.activated || state.episode != episode {
                return;
            }
            state.pending_retry = None;
        }

        self.subscribe_to_hub(episode);
    }

    /// Lock order: hub exclusion, then delivery, then state
    fn deactivate(&self) {
        let (was_active, listener, subscription, retry, check) = self.hub.with_exclusion(|| {
            let _delivery = self.delivery.lock();
            let mut state = self.state.lock();
            let was_active = std::mem::replace(&mut state.activated, false);
            state.episode += 1;
            state.generation += 1;
            (
                was_active,
                state.listener.take(),
                state.subscription.take(),
                state.pending_retry.take(),
                state.listener_check.take(),
            )
        });

        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }
        if let Some(task) = retry {
            task.cancel();
        }
        if let Some(task) = check {
            task.cancel();
        }
        drop(listener);

        if was_active {
            tracing::debug!("Location source deactivated");
        }
    }
}

impl Drop for SourceInner {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if let Some(task) = state.pending_retry.take() {
            task.cancel();
        }
        if let Some(task) = state.listener_check.take() {
            task.cancel();
        }
        if let Some(subscription) = state.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

/// Hub subscriber feeding one subscription generation back to its source
struct SourceObserver {
    inner: Weak<SourceInner>,
    generation: u64,
}

impl LocationObserver for SourceObserver {
    fn on_next(&self, location: &Location) {
        if let Some(inner) = self.inner.upgrade() {
            inner.on_location(self.generation, location);
        }
    }

    fn on_error(&self, error: &LocationError) {
        if let Some(inner) = self.inner.upgrade() {
            inner.on_error(self.generation, error);
        }
    }

    fn on_complete(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.on_complete(self.generation);
        }
    }
}

/// Creates location sources sharing a hub
pub trait LocationSourceExt {
    /// A new inactive source; `retry_always` also retries after a
    /// missing-permission error
    fn new_location_source(&self, retry_always: bool) -> Result<MapLocationSource>;
}

impl LocationSourceExt for LocationHub {
    fn new_location_source(&self, retry_always: bool) -> Result<MapLocationSource> {
        MapLocationSource::new(
            self.clone(),
            SourceConfig::default().with_retry_always(retry_always),
        )
    }
}
