//! Simulated Provider - demonstrates the lazy connection lifecycle of the hub
//!
//! This example wires a `LocationHub` to a fake provider that walks along a
//! straight line:
//! - The first subscriber opens the connection
//! - Every subscriber receives every sample
//! - A late subscriber catches up with the last known location only
//! - The watchdog disconnects once all subscribers are gone
//!
//! Run with: LOCATION_SDK_LOG_MODE=development cargo run -p location-sdk-hub --example simulated_provider

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use location_hub::logging::init_logging_from_env;
use location_hub::prelude::*;
use location_hub::{ConnectionCallbacks, LocationListener};
use parking_lot::Mutex;

/// Provider that connects after a short delay and emits a sample every 200ms
struct SimulatedProvider {
    connected: Arc<AtomicBool>,
    connecting: Arc<AtomicBool>,
    streaming: Arc<AtomicBool>,
    last_known: Arc<Mutex<Option<Location>>>,
}

impl SimulatedProvider {
    fn new() -> Self {
        Self {
            connected: Arc::new(AtomicBool::new(false)),
            connecting: Arc::new(AtomicBool::new(false)),
            streaming: Arc::new(AtomicBool::new(false)),
            last_known: Arc::new(Mutex::new(None)),
        }
    }
}

impl LocationConnector for SimulatedProvider {
    fn connect(&self, callbacks: Arc<dyn ConnectionCallbacks>) {
        println!("[provider] connect()");
        self.connecting.store(true, Ordering::SeqCst);
        let connected = Arc::clone(&self.connected);
        let connecting = Arc::clone(&self.connecting);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            connected.store(true, Ordering::SeqCst);
            connecting.store(false, Ordering::SeqCst);
            callbacks.on_connected();
        });
    }

    fn disconnect(&self) {
        println!("[provider] disconnect()");
        self.connected.store(false, Ordering::SeqCst);
        self.connecting.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn is_connecting(&self) -> bool {
        self.connecting.load(Ordering::SeqCst)
    }

    fn last_known_location(&self) -> Option<Location> {
        self.last_known.lock().clone()
    }

    fn request_location_updates(&self, request: &LocationRequest, listener: Arc<dyn LocationListener>) {
        println!("[provider] streaming with priority {:?}", request.priority);
        self.streaming.store(true, Ordering::SeqCst);
        let streaming = Arc::clone(&self.streaming);
        let last_known = Arc::clone(&self.last_known);
        thread::spawn(move || {
            let mut step = 0u32;
            while streaming.load(Ordering::SeqCst) {
                let location = Location::new(52.52 + f64::from(step) * 0.001, 13.405)
                    .with_accuracy(5.0)
                    .with_provider("simulated");
                *last_known.lock() = Some(location.clone());
                listener.on_location_changed(location);
                step += 1;
                thread::sleep(Duration::from_millis(200));
            }
        });
    }

    fn remove_location_updates(&self, _listener: Arc<dyn LocationListener>) {
        println!("[provider] updates removed");
        self.streaming.store(false, Ordering::SeqCst);
    }
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    init_logging_from_env()?;

    println!("=== Location Hub with a Simulated Provider ===\n");

    let provider = Arc::new(SimulatedProvider::new());
    let checker = Arc::new(|_high_accuracy: bool| Availability::Enabled);
    let config = HubConfig::high_accuracy().with_watchdog_interval(Duration::from_millis(500));
    let hub = LocationHub::new(provider, checker, config)?;

    let mut first = hub.locations();
    for item in first.timeout_iter(Duration::from_secs(1)).take(3) {
        println!("first  <- {}", item?);
    }

    let mut second = hub.locations();
    if let Some(item) = second.recv_timeout(Duration::from_secs(1)) {
        println!("second <- {} (catch-up)", item?);
    }
    for item in second.timeout_iter(Duration::from_secs(1)).take(2) {
        println!("second <- {}", item?);
    }

    println!("\nDropping both subscribers...");
    drop(first);
    drop(second);

    thread::sleep(Duration::from_secs(1));
    println!("Connection state after the watchdog ran: {:?}", hub.connection_state());

    Ok(())
}
