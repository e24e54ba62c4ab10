//! The 1 Hz control loop.
//!
//! [`ControlLoop`] owns the connectivity monitor, the reporter, the report
//! countdown and the display state.  Hardware comes in through port traits
//! at each call site, so the whole loop runs on the host against mocks.
//!
//! ```text
//!  ButtonPort ─┐                                  ┌─▶ DisplayPort
//!  Temp/Press ─┼─▶ ┌──────────────────────────┐ ──┤
//!  Flow ISR  ──┘   │        ControlLoop        │   └─▶ EventSink
//!                  │ monitor · cycle · screen  │
//!   WifiRadio ◀──▶ │        reporter           │ ──▶ HttpTransport
//!                  └──────────────────────────┘
//! ```
//!
//! Whatever is left of each second after [`ControlLoop::tick`] is spent in
//! 100 ms sub-ticks that only poll the button.  Everything else happens once
//! per second in the tick.
//! Blocking calls (conversion settle, socket I/O) stall the main context but
//! never the flow ISR.

use log::{debug, info, warn};

use crate::config::NodeConfig;
use crate::net::{ConnectivityMonitor, ConnectivityState, ReportStatus, Reporter};
use crate::sensors::flow::PulseAccumulator;
use crate::sensors::units::{celsius_to_fahrenheit, liters_to_gallons, round_to};
use crate::sensors::READING_SENTINEL;

use super::cycle::ReportCycle;
use super::display::{self, DisplayVisibility, Line};
use super::events::{AppEvent, ReportData};
use super::ports::{Clock, EventSink, HttpTransport, NodeHardware, WifiRadio};

/// Sub-ticks per second for button polling.
pub const SUB_TICKS: u32 = 10;
const SUB_TICK_MS: u32 = 1000 / SUB_TICKS;

const INTRO_HOLD_MS: u32 = 1000;
const ADDRESS_HOLD_MS: u32 = 2000;
const STARTUP_POLL_MS: u32 = 500;
/// Seconds a reconnect banner or report code stays on screen.
const HOLD_SECS: u64 = 2;

// ───────────────────────────────────────────────────────────────
// ControlLoop
// ───────────────────────────────────────────────────────────────

pub struct ControlLoop<'a, R, T> {
    config: NodeConfig,
    flow: &'a PulseAccumulator,
    monitor: ConnectivityMonitor<R>,
    reporter: Reporter<T>,
    cycle: ReportCycle,
    visibility: DisplayVisibility,
    /// Second the pre-conversion was started for the pending deadline.
    conversion_started_at: Option<u64>,
    /// Readings area is suppressed until this second (address banner).
    banner_until: u64,
    /// Last report code and the second it stops being shown.
    report_hold: Option<(ReportStatus, u64)>,
}

impl<'a, R: WifiRadio, T: HttpTransport> ControlLoop<'a, R, T> {
    /// Wire up the loop.  Does not touch hardware; call [`start`](Self::start)
    /// next.
    pub fn new(
        config: NodeConfig,
        flow: &'a PulseAccumulator,
        monitor: ConnectivityMonitor<R>,
        reporter: Reporter<T>,
    ) -> Self {
        let cycle = ReportCycle::new(
            config.report_interval_secs,
            config.pre_conversion_lead_secs,
            u64::from(config.first_report_delay_secs),
        );
        let visibility = DisplayVisibility::new(config.display_timeout_secs);
        Self {
            config,
            flow,
            monitor,
            reporter,
            cycle,
            visibility,
            conversion_started_at: None,
            banner_until: 0,
            report_hold: None,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Boot sequence: intro screen, first temperature, initial connect,
    /// first deadline.
    pub fn start(
        &mut self,
        hw: &mut impl NodeHardware,
        clock: &mut impl Clock,
        sink: &mut impl EventSink,
    ) {
        hw.set_power(true);
        display::render_banner(hw, &self.config.hostname, &self.config.ssid);
        clock.sleep_ms(INTRO_HOLD_MS);

        hw.start_conversion();
        clock.sleep_ms(self.config.conversion_settle_ms);
        match hw.read_temperature(false) {
            Ok(c) => info!("Boot: water temperature {:.2}C", c),
            Err(e) => warn!("Boot: temperature unavailable: {}", e),
        }

        self.connect_at_boot(hw, clock, sink);

        let now = clock.now_secs();
        self.cycle
            .reset(now + u64::from(self.config.first_report_delay_secs));
        self.visibility.wake(now);
        hw.clear();

        let state = self.monitor.state();
        let first_report_in_secs = self.cycle.seconds_remaining(now);
        sink.emit(&AppEvent::Started {
            state,
            first_report_in_secs,
        });
        info!(
            "ControlLoop started ({}), first report in {}s",
            state.status_code(),
            first_report_in_secs
        );
    }

    fn connect_at_boot(
        &mut self,
        hw: &mut impl NodeHardware,
        clock: &mut impl Clock,
        sink: &mut impl EventSink,
    ) {
        let ssid = self.config.ssid.clone();
        let password = self.config.password.clone();

        // Drop whatever association survived the reset.
        self.monitor.disconnect();
        self.monitor.connect(clock.now_secs(), &ssid, &password);
        self.forward_transition(sink);
        if self.monitor.state() == ConnectivityState::Searching {
            return;
        }

        let give_up = clock.now_secs() + u64::from(self.config.startup_connect_timeout_secs);
        loop {
            let state = self.monitor.check(clock.now_secs(), &ssid, &password);
            self.forward_transition(sink);
            if state == ConnectivityState::Connected || clock.now_secs() >= give_up {
                break;
            }
            clock.sleep_ms(STARTUP_POLL_MS);
        }

        if self.monitor.is_connected() {
            self.show_address(hw);
            clock.sleep_ms(ADDRESS_HOLD_MS);
        } else {
            warn!(
                "Boot: no connection within {}s, continuing offline",
                self.config.startup_connect_timeout_secs
            );
        }
    }

    /// Run forever.
    pub fn run(
        &mut self,
        hw: &mut impl NodeHardware,
        clock: &mut impl Clock,
        sink: &mut impl EventSink,
    ) -> ! {
        loop {
            let now = clock.now_secs();
            self.tick(now, hw, clock, sink);
            self.await_next_second(now, hw, clock, sink);
        }
    }

    /// Poll the button in sub-ticks until the clock leaves second `now`.
    ///
    /// Time spent inside the tick counts against the second, so a slow tick
    /// shortens the wait instead of pushing the next tick out.
    pub fn await_next_second(
        &mut self,
        now: u64,
        hw: &mut impl NodeHardware,
        clock: &mut impl Clock,
        sink: &mut impl EventSink,
    ) {
        while clock.now_secs() <= now {
            clock.sleep_ms(SUB_TICK_MS);
            self.poll_button(clock.now_secs(), hw, sink);
        }
    }

    // ── Per-second tick ───────────────────────────────────────

    /// One scheduler second.
    pub fn tick(
        &mut self,
        now: u64,
        hw: &mut impl NodeHardware,
        clock: &mut impl Clock,
        sink: &mut impl EventSink,
    ) {
        // 1. Button
        self.poll_button(now, hw, sink);

        // 2. Connectivity
        let state = self
            .monitor
            .check(now, &self.config.ssid, &self.config.password);
        if let Some(t) = self.forward_transition(sink) {
            if t.to == ConnectivityState::Connected {
                self.cycle
                    .expedite(now, self.config.reconnect_report_delay_secs);
                if self.visibility.is_visible() {
                    self.show_address(hw);
                    self.banner_until = now + HOLD_SECS;
                }
            }
        }

        // 3. Pre-conversion
        if self.cycle.should_start_conversion(now) {
            debug!(
                "ControlLoop: pre-conversion, {}s to report",
                self.cycle.seconds_remaining(now)
            );
            hw.start_conversion();
            self.conversion_started_at = Some(now);
        }

        // 4. Readings
        if now >= self.banner_until {
            self.refresh(now, state, hw);
        }

        // 5. Blank on timeout
        if self.visibility.should_blank(now) {
            hw.set_power(false);
            sink.emit(&AppEvent::DisplayBlanked);
        }

        // 6. Report
        if self.cycle.is_due(now) {
            self.report(now, hw, clock, sink);
        }
    }

    fn poll_button(&mut self, now: u64, hw: &mut impl NodeHardware, sink: &mut impl EventSink) {
        if !hw.was_pressed() {
            return;
        }
        if self.visibility.wake(now) {
            hw.set_power(true);
            hw.clear();
            sink.emit(&AppEvent::DisplayWoke);
        }
    }

    fn refresh(&mut self, now: u64, state: ConnectivityState, hw: &mut impl NodeHardware) {
        let gallons = liters_to_gallons(self.flow.volume(false));
        let temp_f = hw.read_temperature(true).ok().map(celsius_to_fahrenheit);
        let psi = hw.read_pressure(true).ok();

        let status: Line = match self.report_hold {
            Some((code, until)) if now < until => display::status_field(code.as_str()),
            _ if state == ConnectivityState::Connected => {
                display::countdown_field(self.cycle.seconds_remaining(now))
            }
            _ => display::status_field(state.status_code()),
        };

        display::render_readings(hw, gallons, &status, temp_f, psi);
    }

    fn report(
        &mut self,
        now: u64,
        hw: &mut impl NodeHardware,
        clock: &mut impl Clock,
        sink: &mut impl EventSink,
    ) {
        // A conversion started this second (or never) has not settled yet.
        match self.conversion_started_at {
            Some(t) if t < now => {}
            Some(_) => clock.sleep_ms(self.config.conversion_settle_ms),
            None => {
                hw.start_conversion();
                clock.sleep_ms(self.config.conversion_settle_ms);
            }
        }
        self.conversion_started_at = None;

        let temp_f = match hw.read_temperature(false) {
            Ok(c) => round_to(celsius_to_fahrenheit(c), 2),
            Err(e) => {
                warn!("ControlLoop: temperature failed ({}), sending sentinel", e);
                READING_SENTINEL
            }
        };
        let gallons = round_to(liters_to_gallons(self.flow.volume(true)), 3);
        let psi = match hw.read_pressure(true) {
            Ok(p) => round_to(p, 1),
            Err(e) => {
                warn!("ControlLoop: pressure failed ({}), sending sentinel", e);
                READING_SENTINEL
            }
        };

        let connected = self.monitor.is_connected();
        let status = self.reporter.send(
            connected,
            &self.config.report_url,
            &self.config.api_key,
            &[gallons, psi, temp_f],
        );

        // The state may have dropped during the attempt; re-read it.
        if self.monitor.is_connected() {
            self.cycle.advance(now);
        } else {
            self.cycle.retry(now, self.config.retry_delay_secs);
        }
        self.report_hold = Some((status, now + HOLD_SECS));
        if self.visibility.is_visible() {
            hw.write(0, display::STATUS_COL, &display::status_field(status.as_str()));
        }

        sink.emit(&AppEvent::ReportCompleted(ReportData {
            status,
            gallons,
            psi,
            temp_f,
            next_in_secs: self.cycle.seconds_remaining(now),
        }));
    }

    fn show_address(&mut self, hw: &mut impl NodeHardware) {
        let mut addr = Line::new();
        if let Some(ip) = self.monitor.ip_address() {
            let _ = core::fmt::Write::write_fmt(&mut addr, format_args!("{}", ip));
        }
        display::render_banner(hw, "IP:", &addr);
    }

    fn forward_transition(
        &mut self,
        sink: &mut impl EventSink,
    ) -> Option<crate::net::Transition> {
        let t = self.monitor.take_transition()?;
        sink.emit(&AppEvent::ConnectivityChanged {
            from: t.from,
            to: t.to,
        });
        Some(t)
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn cycle(&self) -> &ReportCycle {
        &self.cycle
    }

    pub fn visibility(&self) -> &DisplayVisibility {
        &self.visibility
    }

    pub fn connectivity(&self) -> ConnectivityState {
        self.monitor.state()
    }

    pub fn monitor(&self) -> &ConnectivityMonitor<R> {
        &self.monitor
    }

    pub fn monitor_mut(&mut self) -> &mut ConnectivityMonitor<R> {
        &mut self.monitor
    }

    pub fn reporter(&self) -> &Reporter<T> {
        &self.reporter
    }

    pub fn reporter_mut(&mut self) -> &mut Reporter<T> {
        &mut self.reporter
    }
}
