//! End-to-end tests for the ControlLoop → sensors / monitor / reporter
//! pipeline.
//!
//! Timeline with the test config and the network in range: boot finishes at
//! t=3 (1 s intro, 0.75 s settle, 2 s address banner), the first report is
//! due at t=13, the pre-conversion fires at t=8, and the display blanks at
//! t=33.

use crate::mock_hw::{Rig, test_config};

use tanknode::app::display::STATUS_COL;
use tanknode::app::events::AppEvent;
use tanknode::app::ports::Clock;
use tanknode::error::SensorError;
use tanknode::net::{ConnectivityState, ReportStatus};
use tanknode::sensors::flow::PULSES_PER_LITER;
use tanknode::sensors::READING_SENTINEL;

fn started() -> Rig {
    let mut rig = Rig::new();
    rig.start();
    rig
}

// ── Boot ──────────────────────────────────────────────────────

#[test]
fn boot_connects_and_schedules_first_report() {
    let rig = started();

    assert_eq!(rig.clock.now_secs(), 3);
    assert_eq!(rig.control.connectivity(), ConnectivityState::Connected);
    assert_eq!(rig.control.cycle().next_deadline(), 13);

    let radio = rig.radio.borrow();
    assert_eq!(radio.disconnects, 1, "stale association dropped first");
    assert_eq!(radio.connects, 1);
    assert_eq!(radio.scans, 0, "boot connects without scanning");
    drop(radio);

    let panel = rig.panel.borrow();
    assert!(panel.any_write_contains("tank-01"));
    assert!(panel.any_write_contains("FieldHotspot"));
    assert!(panel.any_write_contains("192.168.4.20"));
    assert!(panel.powered);

    assert_eq!(
        rig.sink.events.last(),
        Some(&AppEvent::Started {
            state: ConnectivityState::Connected,
            first_report_in_secs: 10,
        })
    );
    assert_eq!(
        rig.sink
            .count(|e| matches!(e, AppEvent::ConnectivityChanged { .. })),
        2
    );
}

#[test]
fn boot_reads_temperature_once() {
    let rig = started();
    let probe = rig.probe.borrow();
    assert_eq!(probe.conversions, 1);
    assert_eq!(probe.reads, 1);
}

#[test]
fn boot_gives_up_after_startup_timeout() {
    let mut rig = Rig::new();
    rig.radio.borrow_mut().in_range = false;
    rig.start();

    // Connect issued at t=1, polled every 0.5 s until t=5.
    assert_eq!(rig.control.connectivity(), ConnectivityState::Connecting);
    assert_eq!(rig.clock.now_secs(), 5);
    assert_eq!(rig.control.cycle().next_deadline(), 15);
    assert!(!rig.panel.borrow().any_write_contains("IP:"));
}

// ── Display refresh ───────────────────────────────────────────

#[test]
fn readings_screen_shows_countdown_when_connected() {
    let mut rig = started();
    rig.step(); // t=3

    let panel = rig.panel.borrow();
    assert_eq!(panel.text_at(0, 0), Some("g:0.00  "));
    assert_eq!(panel.text_at(0, STATUS_COL), Some("sts:10  "));
    assert_eq!(panel.text_at(1, 0), Some("t:68.0F  "));
    assert_eq!(panel.text_at(1, 10), Some("psi:50.0 "));
}

#[test]
fn readings_screen_shows_state_code_when_not_connected() {
    let mut rig = Rig::new();
    rig.radio.borrow_mut().in_range = false;
    rig.start();
    rig.step(); // t=5

    assert_eq!(rig.panel.borrow().text_at(0, STATUS_COL), Some("sts:ip? "));
}

#[test]
fn refresh_never_resets_the_flow_volume() {
    let mut rig = started();
    rig.pulse(PULSES_PER_LITER);
    rig.run_until(10);
    assert!(!rig.flow.reset_pending());
    assert!((rig.flow.volume(false) - 1.0).abs() < 1e-6);
}

// ── Pre-conversion ────────────────────────────────────────────

#[test]
fn preconversion_fires_lead_seconds_before_report() {
    let mut rig = started();
    rig.run_until(8);
    assert_eq!(rig.probe.borrow().conversions, 1, "nothing before t=8");

    rig.step(); // t=8, five seconds before the deadline
    assert_eq!(rig.probe.borrow().conversions, 2);

    let slept_before_report = rig.clock.slept_ms;
    rig.run_until(14);
    assert_eq!(rig.sink.reports().len(), 1);
    assert_eq!(rig.probe.borrow().conversions, 2, "report reuses the pre-conversion");
    assert_eq!(rig.clock.slept_ms, slept_before_report, "settled long ago, no wait");
}

#[test]
fn conversion_started_in_report_second_is_waited_out() {
    let mut config = test_config();
    config.pre_conversion_lead_secs = 0;
    let mut rig = Rig::with_config(config);
    rig.start();
    rig.run_until(13);

    let slept = rig.clock.slept_ms;
    let conversions = rig.probe.borrow().conversions;
    rig.step(); // t=13: conversion and report in the same second
    assert_eq!(rig.probe.borrow().conversions, conversions + 1);
    assert_eq!(rig.clock.slept_ms, slept + 750);
    assert_eq!(rig.sink.reports().len(), 1);
}

// ── Reporting ─────────────────────────────────────────────────

#[test]
fn first_report_carries_rounded_readings() {
    let mut rig = started();
    rig.pulse(4 * PULSES_PER_LITER);
    rig.run_until(14);

    let reports = rig.sink.reports();
    assert_eq!(reports.len(), 1);
    let r = reports[0];
    assert_eq!(r.status, ReportStatus::Ok);
    assert!((r.gallons - 1.057).abs() < 1e-4, "4 L = 1.057 gal, got {}", r.gallons);
    assert_eq!(r.psi, 50.0);
    assert_eq!(r.temp_f, 68.0);
    assert_eq!(r.next_in_secs, 60);

    let net = rig.net.borrow();
    assert_eq!(net.opens, [("api.thingspeak.com".to_owned(), 80)]);
    assert!(
        net.requests[0].starts_with("GET /update?api_key=KEY123&field1=1.057&field2=50&field3=68 HTTP/1.0\r\n"),
        "request was {:?}",
        net.requests[0]
    );
    assert!(net.requests[0].contains("Host: api.thingspeak.com\r\n"));
    assert_eq!(net.closes, 1);
    drop(net);

    assert_eq!(rig.control.cycle().next_deadline(), 73);
    assert_eq!(rig.control.reporter().last_status(), Some(ReportStatus::Ok));
}

#[test]
fn report_resets_flow_on_next_pulse() {
    let mut rig = started();
    rig.pulse(2 * PULSES_PER_LITER);
    rig.run_until(14);
    assert!(rig.flow.reset_pending());

    // First pulse after the report is consumed by the reset.
    rig.pulse(1 + PULSES_PER_LITER);
    rig.run_until(74);

    let reports = rig.sink.reports();
    assert_eq!(reports.len(), 2);
    assert!((reports[1].gallons - 0.264).abs() < 1e-4, "1 L, got {}", reports[1].gallons);
}

#[test]
fn report_code_is_held_on_screen_then_replaced() {
    let mut rig = started();
    rig.run_until(14); // report at t=13
    assert_eq!(rig.panel.borrow().text_at(0, STATUS_COL), Some("sts:ook "));

    rig.step(); // t=14, still held
    assert_eq!(rig.panel.borrow().text_at(0, STATUS_COL), Some("sts:ook "));

    rig.step(); // t=15, countdown again
    assert_eq!(rig.panel.borrow().text_at(0, STATUS_COL), Some("sts:58  "));
}

#[test]
fn transport_failures_are_coded_and_cycle_advances() {
    let mut rig = started();
    rig.net.borrow_mut().fail_open = true;
    rig.run_until(14);
    assert_eq!(rig.sink.reports()[0].status, ReportStatus::OpenFailed);
    assert_eq!(rig.panel.borrow().text_at(0, STATUS_COL), Some("sts:er1 "));
    assert_eq!(rig.control.cycle().next_deadline(), 73);

    {
        let mut net = rig.net.borrow_mut();
        net.fail_open = false;
        net.fail_send = true;
    }
    rig.run_until(74);
    assert_eq!(rig.sink.reports()[1].status, ReportStatus::SendFailed);
    assert_eq!(rig.net.borrow().closes, 1, "opened socket closed after send failure");
}

#[test]
fn response_without_success_marker_is_nok() {
    let mut rig = started();
    rig.net.borrow_mut().response = b"HTTP/1.1 500 Internal Server Error\r\n\r\n".to_vec();
    rig.run_until(14);
    assert_eq!(rig.sink.reports()[0].status, ReportStatus::NotOk);
}

// Scenario C
#[test]
fn report_while_searching_is_ntc_and_retries_soon() {
    let mut rig = Rig::new();
    rig.radio.borrow_mut().in_range = false;
    rig.start(); // deadline t=15
    rig.run_until(16);

    let reports = rig.sink.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].status, ReportStatus::NotConnected);
    assert_eq!(reports[0].next_in_secs, 7, "retry delay, not a full interval");
    assert_eq!(rig.control.cycle().next_deadline(), 22);
    assert!(rig.net.borrow().opens.is_empty(), "no socket activity");
    assert_eq!(rig.panel.borrow().text_at(0, STATUS_COL), Some("sts:ntc "));
}

#[test]
fn reconnect_pulls_the_next_report_in() {
    let mut rig = started();
    rig.run_until(14);
    assert_eq!(rig.control.cycle().next_deadline(), 73);

    rig.radio.borrow_mut().linked = false;
    rig.step(); // t=14: link lost
    assert_eq!(rig.control.connectivity(), ConnectivityState::Searching);
    rig.step(); // t=15: scan finds the AP, connect issued
    assert_eq!(rig.control.connectivity(), ConnectivityState::Connecting);
    rig.step(); // t=16: address acquired
    assert_eq!(rig.control.connectivity(), ConnectivityState::Connected);
    assert_eq!(rig.control.cycle().next_deadline(), 19);

    // Address banner suppresses the readings for two seconds.
    assert_eq!(rig.panel.borrow().text_at(0, 0), Some("IP:"));

    rig.run_until(20);
    let reports = rig.sink.reports();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[1].status, ReportStatus::Ok);
    assert_eq!(rig.control.cycle().next_deadline(), 79);
}

#[test]
fn reconnect_never_postpones_an_earlier_deadline() {
    let mut rig = Rig::new();
    rig.radio.borrow_mut().in_range = false;
    rig.start(); // Connecting, deadline t=15

    rig.radio.borrow_mut().in_range = true;
    rig.radio.borrow_mut().linked = true;
    rig.clock.set_secs(14);
    rig.step(); // t=14: Connected, expedite(14, 3) keeps t=15
    assert_eq!(rig.control.connectivity(), ConnectivityState::Connected);
    assert_eq!(rig.control.cycle().next_deadline(), 15);
}

// ── Sensor failures ───────────────────────────────────────────

// Scenario D
#[test]
fn single_temperature_glitch_is_retried_away() {
    let mut rig = started();
    rig.probe
        .borrow_mut()
        .readings
        .extend([Ok(85.0), Ok(21.5)]);
    rig.run_until(14);

    let r = rig.sink.reports()[0];
    assert!((r.temp_f - 70.7).abs() < 0.01, "got {}", r.temp_f);
    assert_ne!(r.temp_f, READING_SENTINEL);
}

#[test]
fn persistent_temperature_glitch_sends_sentinel() {
    let mut rig = started();
    rig.probe
        .borrow_mut()
        .readings
        .extend([Ok(85.0), Ok(85.0)]);
    rig.run_until(14);

    assert_eq!(rig.sink.reports()[0].temp_f, READING_SENTINEL);
    assert!(rig.net.borrow().requests[0].contains("&field3=-99.99 "));
}

#[test]
fn probe_bus_error_sends_sentinel() {
    let mut rig = started();
    rig.probe.borrow_mut().readings.push_back(Err(SensorError::NoPresence));
    rig.run_until(14);
    assert_eq!(rig.sink.reports()[0].temp_f, READING_SENTINEL);
}

#[test]
fn pressure_failure_sends_sentinel_and_blanks_field() {
    let mut rig = started();
    rig.adc.set(Err(SensorError::AdcReadFailed));
    rig.run_until(14);

    assert_eq!(rig.sink.reports()[0].psi, READING_SENTINEL);
    assert_eq!(rig.panel.borrow().text_at(1, 10), Some("psi:--   "));
}

#[test]
fn pressure_is_clipped_to_calibrated_range() {
    let mut rig = started();
    rig.adc.set(Ok(0)); // 0 V reads -12.5 psi unclipped
    rig.run_until(14);
    assert_eq!(rig.sink.reports()[0].psi, 0.0);
}

// ── Button and display timeout ────────────────────────────────

#[test]
fn display_blanks_after_timeout() {
    let mut rig = started();
    rig.run_until(33);
    assert!(rig.panel.borrow().powered);

    rig.step(); // t=33
    assert!(!rig.panel.borrow().powered);
    assert!(!rig.control.visibility().is_visible());
    assert_eq!(rig.sink.count(|e| *e == AppEvent::DisplayBlanked), 1);

    rig.run_until(40);
    assert_eq!(rig.sink.count(|e| *e == AppEvent::DisplayBlanked), 1, "blanks once");
}

#[test]
fn button_wakes_a_dark_display() {
    let mut rig = started();
    rig.run_until(34);
    let clears = rig.panel.borrow().clears;

    rig.presses.set(1);
    rig.step(); // t=34
    assert!(rig.panel.borrow().powered);
    assert_eq!(rig.panel.borrow().clears, clears + 1);
    assert_eq!(rig.sink.count(|e| *e == AppEvent::DisplayWoke), 1);
    assert_eq!(rig.control.visibility().blank_deadline(), 64);
}

#[test]
fn press_while_lit_only_extends_timeout() {
    let mut rig = started();
    rig.run_until(20);
    rig.presses.set(1);
    rig.step(); // t=20

    assert_eq!(rig.sink.count(|e| *e == AppEvent::DisplayWoke), 0);
    assert_eq!(rig.control.visibility().blank_deadline(), 50);
    rig.run_until(40);
    assert!(rig.panel.borrow().powered);
}

#[test]
fn sub_tick_polling_catches_presses_between_seconds() {
    let mut rig = started();
    rig.run_until(34); // dark
    rig.presses.set(1);

    let before = rig.clock.now_ms();
    rig.control
        .await_next_second(34, &mut rig.board, &mut rig.clock, &mut rig.sink);
    assert_eq!(rig.clock.now_ms(), before + 1000);
    assert_eq!(rig.sink.count(|e| *e == AppEvent::DisplayWoke), 1);
    assert!(rig.panel.borrow().powered);
}

// ── Loop timing ───────────────────────────────────────────────

#[test]
fn slow_display_never_costs_a_second() {
    let mut rig = started();
    rig.slow_panel(40); // four fields per refresh: 160 ms of each second

    let ticked: Vec<u64> = (0..100).map(|_| rig.run_once()).collect();
    let expected: Vec<u64> = (3..103).collect();
    assert_eq!(ticked, expected);
    assert_eq!(rig.sink.reports().len(), 2, "reports at t=13 and t=73");
}

#[test]
fn overrunning_tick_is_followed_immediately() {
    let mut rig = started();
    rig.run_until(20);
    let sub_ticks_before = rig.clock.slept_ms;

    rig.clock.set_secs(20);
    rig.slow_panel(300); // refresh alone runs past the end of the second
    assert_eq!(rig.run_once(), 20);
    assert_eq!(rig.clock.now_secs(), 21);
    assert_eq!(rig.clock.slept_ms, sub_ticks_before, "no sub-tick sleep needed");
    assert_eq!(rig.run_once(), 21);
}

#[test]
fn report_code_not_drawn_while_dark() {
    let mut config = test_config();
    config.display_timeout_secs = 5;
    let mut rig = Rig::with_config(config);
    rig.start(); // blanks at t=8
    rig.run_until(14);

    assert_eq!(rig.sink.reports().len(), 1);
    assert!(!rig.panel.borrow().powered);
    assert!(!rig.panel.borrow().any_write_contains("sts:ook"));
}
