//! Integration tests for the ConnectivityMonitor against the mock radio.
//!
//! One `check` per simulated second, the way the control loop drives it.

use std::cell::RefCell;
use std::rc::Rc;

use tanknode::net::{ConnectivityMonitor, ConnectivityState, Transition};

use crate::mock_hw::{MockRadio, RadioState, TEST_IP, TEST_SSID};

const PASSWORD: &str = "correcthorse";
const SCAN_INTERVAL: u32 = 5;
const CONNECT_TIMEOUT: u32 = 20;

fn monitor(state: RadioState) -> (ConnectivityMonitor<MockRadio>, Rc<RefCell<RadioState>>) {
    let handle = Rc::new(RefCell::new(state));
    let m = ConnectivityMonitor::new(MockRadio(Rc::clone(&handle)), SCAN_INTERVAL, CONNECT_TIMEOUT);
    (m, handle)
}

fn check(m: &mut ConnectivityMonitor<MockRadio>, now: u64) -> ConnectivityState {
    m.check(now, TEST_SSID, PASSWORD)
}

// Scenario B
#[test]
fn absent_network_stays_searching_with_throttled_scans() {
    let (mut m, radio) = monitor(RadioState::default());

    for now in 0..100 {
        assert_eq!(check(&mut m, now), ConnectivityState::Searching);
        assert_eq!(m.state().status_code(), "fnd");
    }

    let r = radio.borrow();
    assert_eq!(r.scans, 20, "one scan per 5 s window");
    assert_eq!(r.connects, 0);
    assert_eq!(m.take_transition(), None);
}

#[test]
fn failed_scan_counts_as_not_found() {
    let (mut m, radio) = monitor(RadioState {
        in_range: true,
        scan_fails: true,
        ..RadioState::default()
    });

    check(&mut m, 0);
    assert_eq!(m.state(), ConnectivityState::Searching);
    assert_eq!(radio.borrow().connects, 0);

    radio.borrow_mut().scan_fails = false;
    check(&mut m, 3);
    assert_eq!(radio.borrow().scans, 1, "still inside the scan window");
    check(&mut m, 5);
    assert_eq!(m.state(), ConnectivityState::Connecting);
}

// Scenario A
#[test]
fn found_network_connects_over_two_checks() {
    let (mut m, _radio) = monitor(RadioState {
        in_range: true,
        associate_immediately: true,
        ..RadioState::default()
    });

    assert_eq!(check(&mut m, 0), ConnectivityState::Connecting);
    assert_eq!(
        m.take_transition(),
        Some(Transition {
            from: ConnectivityState::Searching,
            to: ConnectivityState::Connecting,
        })
    );
    assert!(!m.is_connected());

    assert_eq!(check(&mut m, 1), ConnectivityState::Connected);
    assert!(m.is_connected());
    assert_eq!(m.ip_address(), Some(TEST_IP));
    assert_eq!(m.state().status_code(), "con");
}

#[test]
fn slow_association_times_out_back_to_searching() {
    let (mut m, radio) = monitor(RadioState {
        in_range: true,
        ..RadioState::default()
    });

    check(&mut m, 0);
    assert_eq!(m.state(), ConnectivityState::Connecting);
    for now in 1..20 {
        assert_eq!(check(&mut m, now), ConnectivityState::Connecting);
    }

    assert_eq!(check(&mut m, 20), ConnectivityState::Searching);
    assert_eq!(radio.borrow().disconnects, 1);

    // The next scan happens as soon as the window allows.
    let scans = radio.borrow().scans;
    check(&mut m, 21);
    assert_eq!(radio.borrow().scans, scans + 1);
    assert_eq!(m.state(), ConnectivityState::Connecting);
}

#[test]
fn refused_connect_keeps_searching() {
    let (mut m, radio) = monitor(RadioState {
        in_range: true,
        refuse_connect: true,
        ..RadioState::default()
    });

    check(&mut m, 0);
    assert_eq!(m.state(), ConnectivityState::Searching);
    assert_eq!(m.take_transition(), None);
    assert_eq!(radio.borrow().connects, 1);

    check(&mut m, 5);
    assert_eq!(radio.borrow().connects, 2);
}

#[test]
fn link_loss_returns_to_searching_then_recovers() {
    let (mut m, radio) = monitor(RadioState {
        in_range: true,
        associate_immediately: true,
        ..RadioState::default()
    });
    check(&mut m, 0);
    check(&mut m, 1);
    assert!(m.is_connected());
    let _ = m.take_transition();

    radio.borrow_mut().linked = false;
    assert_eq!(check(&mut m, 30), ConnectivityState::Searching);
    assert_eq!(
        m.take_transition(),
        Some(Transition {
            from: ConnectivityState::Connected,
            to: ConnectivityState::Searching,
        })
    );
    assert_eq!(m.ip_address(), None);

    check(&mut m, 31);
    check(&mut m, 32);
    assert!(m.is_connected());
    assert_eq!(radio.borrow().connects, 2);
}

#[test]
fn disconnect_forces_searching() {
    let (mut m, radio) = monitor(RadioState {
        in_range: true,
        associate_immediately: true,
        ..RadioState::default()
    });
    m.connect(0, TEST_SSID, PASSWORD);
    check(&mut m, 0);
    assert!(m.is_connected());

    m.disconnect();
    assert_eq!(m.state(), ConnectivityState::Searching);
    assert!(!radio.borrow().linked);
    assert_eq!(m.scan_count(), 0, "direct connect skipped the scan");
}

#[test]
fn weak_target_behind_many_neighbours_is_found() {
    let (mut m, radio) = monitor(RadioState {
        in_range: true,
        neighbours: 24,
        ..RadioState::default()
    });

    assert_eq!(check(&mut m, 0), ConnectivityState::Connecting);
    assert_eq!(radio.borrow().connects, 1);
}
