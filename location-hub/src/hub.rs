//! Broadcast hub multiplexing one upstream location connection
//!
//! The hub keeps an ordered set of live subscribers behind a single
//! [`LocationConnector`]. The connection is opened when the first subscriber
//! arrives and closed once none is left, as noticed by the next fan-out or
//! watchdog tick.

use std::sync::{mpsc, Arc, Weak};
use std::time::Duration;

use location_api::{
    Availability, AvailabilityChecker, ConnectionCallbacks, Location, LocationConnector,
    LocationListener,
};
use parking_lot::{Mutex, ReentrantMutex, RwLock};

use crate::config::HubConfig;
use crate::error::{HubError, LocationError, Result};
use crate::geocode::{Address, ErrorHandler, Geocoder, LocationInfo};
use crate::iter::{ChannelObserver, LocationStream};
use crate::scheduler::{ScheduledTask, Scheduler};
use crate::subscriber::{LocationObserver, SubscriberCell, Subscription};

/// Connection state as reported by the upstream connector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Fan-out hub for one location profile
///
/// Cheap to clone; all clones share the same subscribers and connection.
/// Every entry point may be called from any thread.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use location_hub::{HubConfig, LocationHub};
///
/// let hub = LocationHub::new(connector, checker, HubConfig::default())?;
///
/// // First subscriber opens the upstream connection
/// let mut stream = hub.locations();
/// for item in stream.timeout_iter(std::time::Duration::from_secs(30)) {
///     println!("Location: {:?}", item?);
/// }
///
/// // Dropping the stream unsubscribes; the watchdog disconnects later
/// ```
#[derive(Clone)]
pub struct LocationHub {
    inner: Arc<HubInner>,
}

struct HubState {
    /// Live subscribers in fan-out order
    subscribers: Vec<Arc<SubscriberCell>>,

    /// Liveness watchdog, present while connecting or connected
    watchdog: Option<ScheduledTask>,

    /// A connect was issued and not yet matched by a disconnect
    session_open: bool,

    /// Continuous updates were requested in the current session
    updates_requested: bool,
}

struct HubInner {
    connector: Arc<dyn LocationConnector>,
    checker: Arc<dyn AvailabilityChecker>,
    config: HubConfig,

    /// Serializes subscribe, fan-out, watchdog ticks and teardown
    ///
    /// Re-entrant so that observers and connectors calling back on the same
    /// thread do not deadlock.
    exclusion: ReentrantMutex<()>,

    state: Mutex<HubState>,

    /// Handed to the connector; holds only a weak reference back
    callbacks: Arc<HubCallbacks>,

    geocoder: RwLock<Option<Arc<dyn Geocoder>>>,
    error_watch: RwLock<Option<Arc<dyn ErrorHandler>>>,

    scheduler: Scheduler,
}

impl LocationHub {
    /// Create a hub with the given connector, checker and configuration
    ///
    /// Starts the hub's private scheduler thread. No connection is made until
    /// the first subscriber arrives.
    pub fn new(
        connector: Arc<dyn LocationConnector>,
        checker: Arc<dyn AvailabilityChecker>,
        config: HubConfig,
    ) -> Result<Self> {
        config.validate()?;
        let scheduler = Scheduler::start("location-hub-scheduler")?;

        let inner = Arc::new_cyclic(|weak: &Weak<HubInner>| HubInner {
            connector,
            checker,
            config,
            exclusion: ReentrantMutex::new(()),
            state: Mutex::new(HubState {
                subscribers: Vec::new(),
                watchdog: None,
                session_open: false,
                updates_requested: false,
            }),
            callbacks: Arc::new(HubCallbacks {
                inner: weak.clone(),
            }),
            geocoder: RwLock::new(None),
            error_watch: RwLock::new(None),
            scheduler,
        });

        tracing::debug!(
            "Location hub created (interval {:?}, priority {:?})",
            inner.config.request.interval,
            inner.config.request.priority
        );

        Ok(Self { inner })
    }

    /// Create a hub with the default configuration
    pub fn with_defaults(
        connector: Arc<dyn LocationConnector>,
        checker: Arc<dyn AvailabilityChecker>,
    ) -> Result<Self> {
        Self::new(connector, checker, HubConfig::default())
    }

    /// Register a subscriber
    ///
    /// Without permission the observer gets a [`LocationError::NoPermission`]
    /// and is not registered; with location services disabled it gets a
    /// completion and is not registered. Otherwise it joins the live set and
    /// either triggers the connection or, if the connection is already up,
    /// immediately receives the last known location.
    pub fn subscribe(&self, observer: Arc<dyn LocationObserver>) -> Subscription {
        self.inner.subscribe_if(observer, || true)
    }

    /// Register a subscriber only if `admit` still holds
    ///
    /// `admit` runs after the availability check, under the same exclusion
    /// as fan-out and teardown. When it returns false the observer is not
    /// registered, receives nothing, no connection is made, and the returned
    /// subscription is already unsubscribed. Pair it with
    /// [`with_exclusion`](Self::with_exclusion) to revoke a pending
    /// subscription atomically.
    pub fn subscribe_if<P>(&self, observer: Arc<dyn LocationObserver>, admit: P) -> Subscription
    where
        P: FnOnce() -> bool,
    {
        self.inner.subscribe_if(observer, admit)
    }

    /// Run `f` serialized with subscribe, fan-out, watchdog ticks and teardown
    ///
    /// Re-entrant: observers may call it from inside a delivery. `f` must not
    /// block on another thread that uses this hub.
    pub fn with_exclusion<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.inner.exclusion.lock();
        f()
    }

    /// Subscribe through a blocking iterator
    pub fn locations(&self) -> LocationStream {
        let (tx, rx) = mpsc::channel();
        let subscription = self.subscribe(Arc::new(ChannelObserver::new(tx)));
        LocationStream::new(rx, subscription)
    }

    /// Run one watchdog pass now
    ///
    /// Prunes dead subscribers and tears the connection down if none is left.
    /// Returns whether any subscriber is still alive.
    pub fn check_subscribers(&self) -> bool {
        self.inner.watchdog_tick()
    }

    /// Number of subscribers currently held, dead ones not yet pruned included
    pub fn subscriber_count(&self) -> usize {
        self.inner.state.lock().subscribers.len()
    }

    /// Whether the liveness watchdog is scheduled
    pub fn has_watchdog(&self) -> bool {
        self.inner.state.lock().watchdog.is_some()
    }

    pub fn connection_state(&self) -> ConnectionState {
        let connector = &self.inner.connector;
        if connector.is_connected() {
            ConnectionState::Connected
        } else if connector.is_connecting() {
            ConnectionState::Connecting
        } else {
            ConnectionState::Disconnected
        }
    }

    /// Current permission and settings status for this hub's accuracy needs
    pub fn availability(&self) -> Availability {
        self.inner
            .checker
            .check_availability(self.inner.config.high_accuracy_required)
    }

    pub fn config(&self) -> &HubConfig {
        &self.inner.config
    }

    /// The hub's private executor, shared with components layered on top
    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    /// Install the geocoding client used by the address lookups
    pub fn set_geocoder(&self, geocoder: Arc<dyn Geocoder>) {
        *self.inner.geocoder.write() = Some(geocoder);
    }

    /// Install or clear the handler that may swallow geocoder errors
    pub fn set_global_error_watch(&self, handler: Option<Arc<dyn ErrorHandler>>) {
        *self.inner.error_watch.write() = handler;
    }

    /// Whether an API key and a geocoder are both configured
    pub fn is_geocoder_enabled(&self) -> bool {
        self.inner.config.google_api_key.is_some() && self.inner.geocoder.read().is_some()
    }

    /// Addresses near `location`
    ///
    /// Geocoder errors go through the global error watch first; an
    /// intercepted error yields an empty list.
    pub fn addresses_at_location(
        &self,
        location: &Location,
        max_results: usize,
    ) -> Result<Vec<Address>> {
        let (geocoder, api_key) = self.geocoding()?;

        match geocoder.addresses_from_location(
            location.latitude,
            location.longitude,
            max_results,
            &self.inner.config.language,
            api_key,
        ) {
            Ok(addresses) => Ok(addresses),
            Err(error) => {
                let watch = self.inner.error_watch.read().clone();
                match watch {
                    Some(handler) if handler.intercept_geocoder_error(&error) => {
                        tracing::debug!("Geocoder error intercepted: {}", error);
                        Ok(Vec::new())
                    }
                    _ => Err(error.into()),
                }
            }
        }
    }

    /// Addresses near the current location
    ///
    /// Blocks until the first location arrives (up to `timeout`), then
    /// geocodes it. Must not be called from an observer or connector
    /// callback, which would wait on itself.
    pub fn addresses_at_my_location(
        &self,
        max_results: usize,
        timeout: Duration,
    ) -> Result<Vec<Address>> {
        self.geocoding()?;

        let location = {
            let mut stream = self.locations();
            match stream.recv_timeout(timeout) {
                Some(Ok(location)) => location,
                Some(Err(error)) => return Err(error.into()),
                None if stream.is_finished() => return Err(HubError::StreamEnded),
                None => return Err(HubError::Timeout(timeout)),
            }
        };

        self.addresses_at_location(&location, max_results)
    }

    /// Position and viewport of a named place
    pub fn location_info(&self, place_name: &str) -> Result<LocationInfo> {
        let (geocoder, api_key) = self.geocoding()?;
        Ok(geocoder.location_info(place_name, &self.inner.config.language, api_key)?)
    }

    fn geocoding(&self) -> Result<(Arc<dyn Geocoder>, &str)> {
        let api_key = self
            .inner
            .config
            .google_api_key
            .as_deref()
            .ok_or(HubError::GeocoderDisabled)?;
        let geocoder = self
            .inner
            .geocoder
            .read()
            .clone()
            .ok_or(HubError::GeocoderDisabled)?;
        Ok((geocoder, api_key))
    }
}

impl HubInner {
    fn subscribe_if<P>(&self, observer: Arc<dyn LocationObserver>, admit: P) -> Subscription
    where
        P: FnOnce() -> bool,
    {
        let cell = SubscriberCell::new(observer);
        let subscription = Subscription::new(Arc::clone(&cell));

        match self
            .checker
            .check_availability(self.config.high_accuracy_required)
        {
            Availability::NoPermission => {
                tracing::warn!("{} subscribed without location permission", cell.id());
                cell.deliver_error(&LocationError::no_permission());
                return subscription;
            }
            Availability::Disabled => {
                tracing::debug!(
                    "Trying to subscribe to location, but it's disabled... finishing {}",
                    cell.id()
                );
                cell.deliver_complete();
                return subscription;
            }
            Availability::Enabled => {
                tracing::debug!("{} subscribed to location", cell.id());
            }
        }

        let _guard = self.exclusion.lock();
        if !admit() {
            tracing::debug!("{} withdrawn before registration", cell.id());
            cell.unsubscribe();
            return subscription;
        }
        self.state.lock().subscribers.push(Arc::clone(&cell));

        if self.connector.is_connected() {
            // Catch-up for the newcomer only: the last known sample, no backlog
            if let Some(location) = self.connector.last_known_location() {
                cell.deliver_next(&location);
            }
            if !self.prune_dead_subscribers() {
                self.end_client();
            }
        } else if !self.connector.is_connecting() {
            tracing::debug!("Will connect to the location provider");
            self.connect_client();
        }
        // While connecting, on_connected delivers the first sample to everyone

        subscription
    }

    fn connect_client(&self) {
        let _guard = self.exclusion.lock();

        {
            let mut state = self.state.lock();
            state.session_open = true;
            if state.watchdog.is_none() {
                state.watchdog = Some(self.start_watchdog());
            }
        }

        // May call back synchronously; no state lock held here
        self.connector.connect(self.callbacks.clone());
    }

    fn start_watchdog(&self) -> ScheduledTask {
        let weak = self.callbacks.inner.clone();
        let period = self.config.watchdog_interval;

        tracing::debug!("Starting subscriber watchdog every {:?}", period);
        self.scheduler.schedule_at_fixed_rate(period, period, move || {
            if let Some(inner) = weak.upgrade() {
                inner.watchdog_tick();
            }
        })
    }

    fn watchdog_tick(&self) -> bool {
        let _guard = self.exclusion.lock();
        let alive = self.prune_dead_subscribers();
        if !alive {
            tracing::debug!("Watchdog found no live subscribers");
            self.end_client();
        }
        alive
    }

    /// Drop dead subscribers; returns whether any remain
    fn prune_dead_subscribers(&self) -> bool {
        let mut state = self.state.lock();
        let before = state.subscribers.len();
        state.subscribers.retain(|s| !s.is_unsubscribed());
        let pruned = before - state.subscribers.len();
        if pruned > 0 {
            tracing::debug!("Pruned {} dead subscribers", pruned);
        }
        !state.subscribers.is_empty()
    }

    /// Fan a sample out to every live subscriber
    ///
    /// A missing sample still prunes and may tear down. Returns whether any
    /// subscriber remained alive.
    fn dispatch_location(&self, location: Option<&Location>) -> bool {
        let _guard = self.exclusion.lock();

        let snapshot: Vec<Arc<SubscriberCell>> = self.state.lock().subscribers.clone();
        let mut delivered = 0usize;
        if let Some(location) = location {
            for subscriber in &snapshot {
                if subscriber.deliver_next(location) {
                    delivered += 1;
                }
            }
            tracing::debug!("Location {} delivered to {} subscribers", location, delivered);
        }

        let alive = self.prune_dead_subscribers();
        if !alive {
            tracing::debug!("No more subscribers, location hub will disconnect");
            self.end_client();
        }
        alive
    }

    /// Complete every live subscriber and clear the set
    fn dispatch_completed(&self) {
        let _guard = self.exclusion.lock();

        let subscribers = std::mem::take(&mut self.state.lock().subscribers);
        for subscriber in subscribers {
            subscriber.deliver_complete();
        }
    }

    /// Fail every live subscriber, clear the set and tear down
    fn dispatch_error(&self, error: LocationError) {
        let _guard = self.exclusion.lock();

        let subscribers = std::mem::take(&mut self.state.lock().subscribers);
        tracing::debug!("Delivering {} to {} subscribers", error, subscribers.len());
        for subscriber in subscribers {
            subscriber.deliver_error(&error);
        }
        self.end_client();
    }

    /// Stop updates, disconnect and cancel the watchdog
    ///
    /// An in-flight connect cannot be cancelled: teardown is skipped and the
    /// next watchdog tick or fan-out tries again.
    fn end_client(&self) {
        let _guard = self.exclusion.lock();

        if self.connector.is_connecting() {
            tracing::debug!("Tried disconnect while still connecting... ignore");
            return;
        }

        let (watchdog, was_open, updates_requested) = {
            let mut state = self.state.lock();
            (
                state.watchdog.take(),
                std::mem::replace(&mut state.session_open, false),
                std::mem::replace(&mut state.updates_requested, false),
            )
        };

        if let Some(watchdog) = watchdog {
            watchdog.cancel();
        }

        if !was_open {
            return;
        }

        if updates_requested {
            self.connector.remove_location_updates(self.callbacks.clone());
        }
        self.connector.disconnect();
        tracing::debug!("Disconnected from the location provider");
    }

    fn on_connected(&self) {
        let _guard = self.exclusion.lock();

        if !self.prune_dead_subscribers() {
            tracing::debug!("Connected but no one subscribed, will disconnect");
            self.end_client();
            return;
        }

        if !self.connector.is_connected() {
            // A disconnect raced the connect
            tracing::debug!("on_connected called, but client disconnected");
            self.dispatch_completed();
            self.end_client();
            return;
        }

        if self
            .checker
            .check_availability(self.config.high_accuracy_required)
            == Availability::NoPermission
        {
            tracing::warn!("Location permission revoked while connecting");
            self.dispatch_error(LocationError::permission_revoked());
            return;
        }

        let last_known = self.connector.last_known_location();
        if self.dispatch_location(last_known.as_ref()) {
            self.state.lock().updates_requested = true;
            self.connector
                .request_location_updates(&self.config.request, self.callbacks.clone());
            tracing::debug!("Requested continuous location updates");
        }
    }
}

impl Drop for HubInner {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        tracing::debug!(
            "Location hub dropping, {} subscribers held",
            state.subscribers.len()
        );

        if let Some(watchdog) = state.watchdog.take() {
            watchdog.cancel();
        }
        if state.session_open && !self.connector.is_connecting() {
            if state.updates_requested {
                self.connector.remove_location_updates(self.callbacks.clone());
            }
            self.connector.disconnect();
        }
    }
}

/// Connector-facing callbacks of a hub
///
/// Holds a weak reference so the connector never keeps the hub alive.
pub struct HubCallbacks {
    inner: Weak<HubInner>,
}

impl ConnectionCallbacks for HubCallbacks {
    fn on_connected(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.on_connected();
        }
    }

    fn on_connection_suspended(&self, cause: i32) {
        tracing::debug!("Location provider connection suspended (cause {})", cause);
    }

    fn on_connection_failed(&self, reason: String) {
        tracing::warn!("Location provider connection failed: {}", reason);
        if let Some(inner) = self.inner.upgrade() {
            inner.dispatch_error(LocationError::ConnectionFailure(reason));
        }
    }
}

impl LocationListener for HubCallbacks {
    fn on_location_changed(&self, location: Location) {
        if let Some(inner) = self.inner.upgrade() {
            inner.dispatch_location(Some(&location));
        }
    }
}
