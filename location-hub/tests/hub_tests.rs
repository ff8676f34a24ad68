//! Integration tests for the location hub.
//!
//! These tests verify:
//! - Lazy connect/disconnect driven by subscriber liveness
//! - Exactly-once, in-order fan-out to every live subscriber
//! - Catch-up of late subscribers and terminal event policies
//! - Watchdog pruning, both on demand and on the real scheduler


use location_hub::{
    Availability, ConnectionState, HubConfig, LocationConnector, LocationError, LocationHub,
    Priority,
};
use mock_connector::{sample, MockConnector, Recorded, RecordingObserver, StaticChecker};
use proptest::prelude::*;
use rstest::rstest;
use std::sync::Arc;
use std::time::Duration;

/// Watchdog period long enough never to fire during a test
fn quiet_config() -> HubConfig {
    HubConfig::default().with_watchdog_interval(Duration::from_secs(600))
}

fn create_hub(connector: &Arc<MockConnector>, checker: &Arc<StaticChecker>) -> LocationHub {
    LocationHub::new(connector.clone(), checker.clone(), quiet_config())
        .expect("Failed to create hub")
}

#[test]
fn test_two_subscribers_share_one_connection() {
    let connector = MockConnector::new();
    let checker = StaticChecker::enabled();
    let hub = create_hub(&connector, &checker);

    let s1 = RecordingObserver::new();
    let s2 = RecordingObserver::new();
    let _sub1 = hub.subscribe(s1.clone());
    let _sub2 = hub.subscribe(s2.clone());

    assert_eq!(connector.connect_calls(), 1);
    assert_eq!(hub.connection_state(), ConnectionState::Connecting);
    assert!(hub.has_watchdog());

    let l0 = sample(0);
    connector.set_last_known(Some(l0.clone()));
    connector.complete_connect();

    assert_eq!(s1.events(), vec![Recorded::Next(l0.clone())]);
    assert_eq!(s2.events(), vec![Recorded::Next(l0)]);
    assert_eq!(connector.request_updates_calls(), 1);
    assert_eq!(connector.storm_violations(), 0);
    assert!(hub.has_watchdog());
    assert_eq!(hub.connection_state(), ConnectionState::Connected);
}

#[test]
fn test_cached_fix_not_replayed_while_connecting() {
    let connector = MockConnector::new();
    let checker = StaticChecker::enabled();
    let hub = create_hub(&connector, &checker);

    let l0 = sample(0);
    connector.set_last_known(Some(l0.clone()));

    let s1 = RecordingObserver::new();
    let s2 = RecordingObserver::new();
    let _sub1 = hub.subscribe(s1.clone());
    let _sub2 = hub.subscribe(s2.clone());

    assert!(s2.events().is_empty());
    connector.complete_connect();

    assert_eq!(s1.events(), vec![Recorded::Next(l0.clone())]);
    assert_eq!(s2.events(), vec![Recorded::Next(l0)]);
}

#[test]
fn test_permission_revoked_while_connecting() {
    let connector = MockConnector::new();
    let checker = StaticChecker::enabled();
    let hub = create_hub(&connector, &checker);

    let s1 = RecordingObserver::new();
    let s2 = RecordingObserver::new();
    let _sub1 = hub.subscribe(s1.clone());
    let _sub2 = hub.subscribe(s2.clone());

    checker.set(Availability::NoPermission);
    connector.set_last_known(Some(sample(0)));
    connector.complete_connect();

    assert!(matches!(s1.error(), Some(LocationError::NoPermission(_))));
    assert!(matches!(s2.error(), Some(LocationError::NoPermission(_))));
    assert!(s1.locations().is_empty());
    assert_eq!(connector.request_updates_calls(), 0);
    assert_eq!(connector.disconnect_calls(), 1);
    assert_eq!(hub.subscriber_count(), 0);
    assert!(!hub.has_watchdog());
}

#[test]
fn test_connection_lost_before_on_connected_closes_session() {
    let connector = MockConnector::new();
    let checker = StaticChecker::enabled();
    let hub = create_hub(&connector, &checker);

    let s1 = RecordingObserver::new();
    let _sub1 = hub.subscribe(s1.clone());
    connector.report_connected_while_down();

    assert_eq!(s1.events(), vec![Recorded::Complete]);
    assert_eq!(connector.disconnect_calls(), 1);
    assert!(!hub.has_watchdog());

    // The closed session is neither torn down again nor blocking a new one
    assert!(!hub.check_subscribers());
    assert_eq!(connector.disconnect_calls(), 1);

    let _sub2 = hub.subscribe(RecordingObserver::new());
    assert_eq!(connector.connect_calls(), 2);
    assert!(hub.has_watchdog());
}

#[test]
fn test_subscribe_if_rejected_registers_nothing() {
    let connector = MockConnector::new();
    let checker = StaticChecker::enabled();
    let hub = create_hub(&connector, &checker);

    let observer = RecordingObserver::new();
    let subscription = hub.subscribe_if(observer.clone(), || false);

    assert!(subscription.is_unsubscribed());
    assert!(observer.events().is_empty());
    assert_eq!(hub.subscriber_count(), 0);
    assert_eq!(connector.connect_calls(), 0);
    assert!(!hub.has_watchdog());
}

#[test]
fn test_watchdog_prunes_but_stays_connected() {
    let connector = MockConnector::new();
    let checker = StaticChecker::enabled();
    let hub = create_hub(&connector, &checker);

    let sub1 = hub.subscribe(RecordingObserver::new());
    let _sub2 = hub.subscribe(RecordingObserver::new());
    connector.complete_connect();

    sub1.unsubscribe();
    assert_eq!(hub.subscriber_count(), 2, "pruning is lazy");

    assert!(hub.check_subscribers());
    assert_eq!(hub.subscriber_count(), 1);
    assert_eq!(connector.disconnect_calls(), 0);
    assert_eq!(hub.connection_state(), ConnectionState::Connected);
}

#[test]
fn test_last_unsubscribe_disconnects_once() {
    let connector = MockConnector::new();
    let checker = StaticChecker::enabled();
    let hub = create_hub(&connector, &checker);

    let sub1 = hub.subscribe(RecordingObserver::new());
    let sub2 = hub.subscribe(RecordingObserver::new());
    connector.complete_connect();

    sub1.unsubscribe();
    drop(sub2);

    assert!(!hub.check_subscribers());
    assert_eq!(connector.disconnect_calls(), 1);
    assert_eq!(connector.remove_updates_calls(), 1);
    assert!(!hub.has_watchdog());

    // Further ticks find nothing to tear down
    assert!(!hub.check_subscribers());
    assert_eq!(connector.disconnect_calls(), 1);
    assert_eq!(hub.connection_state(), ConnectionState::Disconnected);
}

#[test]
fn test_fan_out_preserves_order() {
    let connector = MockConnector::auto_connecting();
    let checker = StaticChecker::enabled();
    let hub = create_hub(&connector, &checker);

    let observers: Vec<_> = (0..3).map(|_| RecordingObserver::new()).collect();
    let _subs: Vec<_> = observers.iter().map(|o| hub.subscribe(o.clone())).collect();

    let produced: Vec<_> = (1..=5).map(sample).collect();
    for location in &produced {
        connector.emit(location.clone());
    }

    for observer in &observers {
        assert_eq!(observer.locations(), produced);
    }
    assert_eq!(connector.connect_calls(), 1);
}

#[test]
fn test_dead_subscriber_skipped_during_fan_out() {
    let connector = MockConnector::auto_connecting();
    let checker = StaticChecker::enabled();
    let hub = create_hub(&connector, &checker);

    let dead = RecordingObserver::new();
    let live = RecordingObserver::new();
    let dead_sub = hub.subscribe(dead.clone());
    let _live_sub = hub.subscribe(live.clone());

    dead_sub.unsubscribe();
    connector.emit(sample(1));

    assert!(dead.locations().is_empty());
    assert_eq!(live.locations(), vec![sample(1)]);
    assert_eq!(hub.subscriber_count(), 1);
    assert_eq!(connector.disconnect_calls(), 0);
}

#[test]
fn test_fan_out_to_nobody_disconnects() {
    let connector = MockConnector::auto_connecting();
    let checker = StaticChecker::enabled();
    let hub = create_hub(&connector, &checker);

    let sub = hub.subscribe(RecordingObserver::new());
    drop(sub);
    connector.emit(sample(1));

    assert_eq!(connector.disconnect_calls(), 1);
    assert_eq!(hub.subscriber_count(), 0);
    assert!(!connector.has_listener());
}

#[test]
fn test_late_subscriber_gets_only_last_known() {
    let connector = MockConnector::auto_connecting();
    let checker = StaticChecker::enabled();
    let hub = create_hub(&connector, &checker);

    let early = RecordingObserver::new();
    let _early_sub = hub.subscribe(early.clone());
    connector.emit(sample(1));
    connector.emit(sample(2));

    let late = RecordingObserver::new();
    let _late_sub = hub.subscribe(late.clone());

    assert_eq!(late.locations(), vec![sample(2)]);
    assert_eq!(early.locations(), vec![sample(1), sample(2)]);
    assert_eq!(connector.connect_calls(), 1);
}

#[test]
fn test_no_permission_errors_only_the_subscriber() {
    let connector = MockConnector::auto_connecting();
    let checker = StaticChecker::enabled();
    let hub = create_hub(&connector, &checker);

    let existing = RecordingObserver::new();
    let _existing_sub = hub.subscribe(existing.clone());

    checker.set(Availability::NoPermission);
    let denied = RecordingObserver::new();
    let denied_sub = hub.subscribe(denied.clone());

    assert!(matches!(denied.error(), Some(LocationError::NoPermission(_))));
    assert!(denied_sub.is_unsubscribed());
    assert!(existing.error().is_none());
    assert_eq!(hub.subscriber_count(), 1);
    assert_eq!(connector.connect_calls(), 1);
}

#[test]
fn test_disabled_completes_without_connecting() {
    let connector = MockConnector::new();
    let checker = StaticChecker::new(Availability::Disabled);
    let hub = create_hub(&connector, &checker);

    let observer = RecordingObserver::new();
    let _sub = hub.subscribe(observer.clone());

    assert_eq!(observer.events(), vec![Recorded::Complete]);
    assert_eq!(connector.connect_calls(), 0);
    assert_eq!(hub.subscriber_count(), 0);
    assert!(!hub.has_watchdog());
}

#[rstest]
#[case::enabled(Availability::Enabled, 1, 1)]
#[case::disabled(Availability::Disabled, 0, 0)]
#[case::no_permission(Availability::NoPermission, 0, 0)]
fn test_availability_outcomes(
    #[case] availability: Availability,
    #[case] expected_connects: usize,
    #[case] expected_held: usize,
) {
    let connector = MockConnector::new();
    let checker = StaticChecker::new(availability);
    let hub = create_hub(&connector, &checker);

    let subscription = hub.subscribe(RecordingObserver::new());

    assert_eq!(connector.connect_calls(), expected_connects);
    assert_eq!(hub.subscriber_count(), expected_held);
    assert_eq!(subscription.is_unsubscribed(), expected_held == 0);
}

#[test]
fn test_high_accuracy_flag_reaches_checker() {
    let connector = MockConnector::new();
    let checker = StaticChecker::enabled();
    let hub = LocationHub::new(connector.clone(), checker.clone(), HubConfig::high_accuracy())
        .unwrap();

    let _sub = hub.subscribe(RecordingObserver::new());
    assert_eq!(checker.last_high_accuracy(), Some(true));
}

#[test]
fn test_connected_with_nobody_left_tears_down() {
    let connector = MockConnector::new();
    let checker = StaticChecker::enabled();
    let hub = create_hub(&connector, &checker);

    let sub = hub.subscribe(RecordingObserver::new());
    sub.unsubscribe();

    // Teardown is deferred while connecting
    assert!(!hub.check_subscribers());
    assert_eq!(connector.disconnect_calls(), 0);
    assert!(hub.has_watchdog());

    connector.complete_connect();

    assert_eq!(connector.disconnect_calls(), 1);
    assert_eq!(connector.request_updates_calls(), 0);
    assert!(!hub.has_watchdog());
}

#[test]
fn test_connection_failure_reaches_everyone() {
    let connector = MockConnector::new();
    let checker = StaticChecker::enabled();
    let hub = create_hub(&connector, &checker);

    let s1 = RecordingObserver::new();
    let s2 = RecordingObserver::new();
    let _sub1 = hub.subscribe(s1.clone());
    let _sub2 = hub.subscribe(s2.clone());

    connector.fail_connect("service missing");

    let expected = LocationError::ConnectionFailure("service missing".to_string());
    assert_eq!(s1.error(), Some(expected.clone()));
    assert_eq!(s2.error(), Some(expected));
    assert_eq!(hub.subscriber_count(), 0);
    assert_eq!(connector.disconnect_calls(), 1);
    assert!(!hub.has_watchdog());

    // A new subscriber starts a fresh session
    let s3 = RecordingObserver::new();
    let _sub3 = hub.subscribe(s3.clone());
    assert_eq!(connector.connect_calls(), 2);
    assert!(s3.error().is_none());
}

#[test]
fn test_no_connect_storm_while_connecting() {
    let connector = MockConnector::new();
    let checker = StaticChecker::enabled();
    let hub = create_hub(&connector, &checker);

    let subs: Vec<_> = (0..10).map(|_| hub.subscribe(RecordingObserver::new())).collect();

    assert_eq!(connector.connect_calls(), 1);
    assert_eq!(connector.storm_violations(), 0);
    assert_eq!(hub.subscriber_count(), subs.len());
}

#[test]
fn test_concurrent_subscribers() {
    let connector = MockConnector::auto_connecting();
    let checker = StaticChecker::enabled();
    let hub = create_hub(&connector, &checker);

    let anchor = RecordingObserver::new();
    let _anchor_sub = hub.subscribe(anchor.clone());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let hub = hub.clone();
            std::thread::spawn(move || {
                for _ in 0..50 {
                    let sub = hub.subscribe(RecordingObserver::new());
                    sub.unsubscribe();
                }
            })
        })
        .collect();

    for n in 0..20 {
        connector.emit(sample(n));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(hub.check_subscribers());
    assert_eq!(hub.subscriber_count(), 1);
    assert_eq!(anchor.locations(), (0..20).map(sample).collect::<Vec<_>>());
    assert_eq!(connector.connect_calls(), 1);
    assert_eq!(connector.storm_violations(), 0);
}

#[test]
fn test_requested_profile_matches_config() {
    let connector = MockConnector::auto_connecting();
    let checker = StaticChecker::enabled();
    let config = quiet_config()
        .with_priority(Priority::HighAccuracy)
        .with_intervals(Duration::from_secs(30), Duration::from_secs(10));
    let hub = LocationHub::new(connector.clone(), checker, config.clone()).unwrap();

    let _sub = hub.subscribe(RecordingObserver::new());

    assert_eq!(connector.requests(), vec![config.request]);
}

#[test]
fn test_location_stream() {
    let connector = MockConnector::auto_connecting();
    connector.set_last_known(Some(sample(7)));
    let checker = StaticChecker::enabled();
    let hub = create_hub(&connector, &checker);

    let mut stream = hub.locations();
    let first = stream.recv_timeout(Duration::from_secs(1));
    assert_eq!(first, Some(Ok(sample(7))));

    connector.emit(sample(8));
    assert_eq!(stream.try_recv(), Some(Ok(sample(8))));

    connector.fail_connect("lost");
    assert!(matches!(
        stream.recv_timeout(Duration::from_secs(1)),
        Some(Err(LocationError::ConnectionFailure(_)))
    ));
    assert!(stream.recv().is_none());
}

#[test]
fn test_scheduled_watchdog_disconnects() {
    let connector = MockConnector::auto_connecting();
    let checker = StaticChecker::enabled();
    let config = HubConfig::default().with_watchdog_interval(Duration::from_millis(30));
    let hub = LocationHub::new(connector.clone(), checker, config).unwrap();

    let sub = hub.subscribe(RecordingObserver::new());
    assert!(hub.has_watchdog());
    drop(sub);

    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while connector.disconnect_calls() == 0 && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }

    assert_eq!(connector.disconnect_calls(), 1);
    assert!(!hub.has_watchdog());
}

#[test]
fn test_invalid_config_rejected() {
    let connector = MockConnector::new();
    let checker = StaticChecker::enabled();
    let config = HubConfig::default().with_watchdog_interval(Duration::ZERO);

    assert!(LocationHub::new(connector, checker, config).is_err());
}

#[derive(Debug, Clone)]
enum Op {
    Subscribe,
    Unsubscribe(usize),
    Tick,
    Emit,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Subscribe),
        3 => (0usize..16).prop_map(Op::Unsubscribe),
        1 => Just(Op::Tick),
        1 => Just(Op::Emit),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// For any sequence of subscribe/unsubscribe/tick/emit, connect and
    /// disconnect alternate: never two connects without a disconnect in
    /// between, never a connect while connected.
    #[test]
    fn prop_lazy_connection(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let connector = MockConnector::auto_connecting();
        let checker = StaticChecker::enabled();
        let hub = create_hub(&connector, &checker);
        let mut subs = Vec::new();

        for (n, op) in ops.into_iter().enumerate() {
            match op {
                Op::Subscribe => subs.push(hub.subscribe(RecordingObserver::new())),
                Op::Unsubscribe(i) => {
                    if !subs.is_empty() {
                        let i = i % subs.len();
                        subs.remove(i);
                    }
                }
                Op::Tick => {
                    hub.check_subscribers();
                }
                Op::Emit => connector.emit(sample(n as u32)),
            }

            let open = connector.connect_calls() - connector.disconnect_calls();
            prop_assert!(open <= 1);
            prop_assert_eq!(open == 1, connector.is_connected());
            prop_assert_eq!(connector.storm_violations(), 0);
        }

        subs.clear();
        hub.check_subscribers();
        prop_assert_eq!(connector.connect_calls(), connector.disconnect_calls());
        prop_assert!(!hub.has_watchdog());
    }
}
