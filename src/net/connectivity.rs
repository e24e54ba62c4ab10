//! Wi-Fi connectivity state machine.
//!
//! ```text
//!             scan finds SSID + connect issued
//!   ┌──────────┐ ─────────────────────────▶ ┌────────────┐
//!   │Searching │                            │ Connecting │
//!   │  "fnd"   │ ◀───────────────────────── │   "ip?"    │
//!   └──────────┘   connect timeout          └────────────┘
//!        ▲                                        │ link has address
//!        │ link lost     ┌───────────┐            │
//!        └────────────── │ Connected │ ◀──────────┘
//!                        │   "con"   │
//!                        └───────────┘
//! ```
//!
//! [`ConnectivityMonitor::check`] runs once per scheduler tick and performs
//! exactly one state evaluation.  Scans are throttled to one per
//! `scan_interval_secs`; a failed scan counts as "not found".

use std::net::Ipv4Addr;

use log::{debug, info, warn};

use crate::app::ports::WifiRadio;

/// Connection state.  Starts in `Searching`; cyclic, no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    Searching,
    Connecting,
    Connected,
}

impl ConnectivityState {
    /// Three-character code shown on the display.
    pub const fn status_code(self) -> &'static str {
        match self {
            Self::Searching => "fnd",
            Self::Connecting => "ip?",
            Self::Connected => "con",
        }
    }
}

/// A state change observed by the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: ConnectivityState,
    pub to: ConnectivityState,
}

/// Long-lived owner of the radio and its connection state.
pub struct ConnectivityMonitor<R> {
    radio: R,
    state: ConnectivityState,
    /// `None` until the first scan, so the first `check` scans immediately.
    last_scan: Option<u64>,
    scan_interval_secs: u64,
    /// 0 disables the timeout.
    connect_timeout_secs: u64,
    connecting_since: u64,
    pending: Option<Transition>,
    scans: u32,
}

impl<R: WifiRadio> ConnectivityMonitor<R> {
    pub fn new(radio: R, scan_interval_secs: u32, connect_timeout_secs: u32) -> Self {
        Self {
            radio,
            state: ConnectivityState::Searching,
            last_scan: None,
            scan_interval_secs: u64::from(scan_interval_secs),
            connect_timeout_secs: u64::from(connect_timeout_secs),
            connecting_since: 0,
            pending: None,
            scans: 0,
        }
    }

    /// One state evaluation.  Returns the state after the evaluation,
    /// whether or not it changed.
    pub fn check(&mut self, now: u64, ssid: &str, password: &str) -> ConnectivityState {
        match self.state {
            ConnectivityState::Searching => self.search(now, ssid, password),
            ConnectivityState::Connecting => {
                if self.radio.is_connected() {
                    if let Some(ip) = self.radio.ip_address() {
                        info!("WiFi: connected to '{}', address {}", ssid, ip);
                    }
                    self.set_state(ConnectivityState::Connected);
                } else if self.connect_timeout_secs > 0
                    && now.saturating_sub(self.connecting_since) >= self.connect_timeout_secs
                {
                    warn!(
                        "WiFi: no address after {}s, back to scanning",
                        self.connect_timeout_secs
                    );
                    if let Err(e) = self.radio.disconnect() {
                        warn!("WiFi: disconnect failed: {}", e);
                    }
                    self.set_state(ConnectivityState::Searching);
                }
            }
            ConnectivityState::Connected => {
                if !self.radio.is_connected() {
                    warn!("WiFi: link to '{}' lost", ssid);
                    self.set_state(ConnectivityState::Searching);
                }
            }
        }
        self.state
    }

    fn search(&mut self, now: u64, ssid: &str, password: &str) {
        if let Some(last) = self.last_scan {
            if now.saturating_sub(last) < self.scan_interval_secs {
                return;
            }
        }
        self.last_scan = Some(now);
        self.scans = self.scans.wrapping_add(1);

        let found = match self.radio.scan_for(ssid) {
            Ok(found) => found,
            Err(e) => {
                debug!("WiFi: scan failed ({}), treating as not found", e);
                false
            }
        };
        if !found {
            debug!("WiFi: '{}' not in range", ssid);
            return;
        }

        info!("WiFi: found '{}', connecting", ssid);
        self.connect(now, ssid, password);
    }

    /// Issue a non-blocking connect request and enter `Connecting`.
    /// A driver refusal leaves the monitor in `Searching`.
    pub fn connect(&mut self, now: u64, ssid: &str, password: &str) {
        match self.radio.connect(ssid, password) {
            Ok(()) => {
                self.connecting_since = now;
                self.set_state(ConnectivityState::Connecting);
            }
            Err(e) => {
                warn!("WiFi: connect to '{}' rejected: {}", ssid, e);
                self.set_state(ConnectivityState::Searching);
            }
        }
    }

    /// Drop any association and enter `Searching`.
    pub fn disconnect(&mut self) {
        if let Err(e) = self.radio.disconnect() {
            warn!("WiFi: disconnect failed: {}", e);
        }
        self.set_state(ConnectivityState::Searching);
    }

    fn set_state(&mut self, to: ConnectivityState) {
        if to == self.state {
            return;
        }
        let from = self.state;
        self.state = to;
        // Keep the oldest unread origin so a burst still reads as one change.
        self.pending = Some(match self.pending {
            Some(t) => Transition { from: t.from, to },
            None => Transition { from, to },
        });
    }

    /// The state change since the last call, if any.
    pub fn take_transition(&mut self) -> Option<Transition> {
        self.pending.take().filter(|t| t.from != t.to)
    }

    pub fn state(&self) -> ConnectivityState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectivityState::Connected
    }

    pub fn ip_address(&self) -> Option<Ipv4Addr> {
        self.radio.ip_address()
    }

    /// Scans performed so far.
    pub fn scan_count(&self) -> u32 {
        self.scans
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }
}
