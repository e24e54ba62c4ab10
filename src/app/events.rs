//! Outbound application events.
//!
//! The [`ControlLoop`](super::control::ControlLoop) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other side
//! decide what to do with them.

use crate::net::{ConnectivityState, ReportStatus};

/// Structured events emitted by the control core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Boot sequence finished; the loop is about to start ticking.
    Started {
        state: ConnectivityState,
        first_report_in_secs: u64,
    },

    /// The connectivity monitor changed state.
    ConnectivityChanged {
        from: ConnectivityState,
        to: ConnectivityState,
    },

    /// One report attempt finished (successful or not).
    ReportCompleted(ReportData),

    /// A button press turned the display on.
    DisplayWoke,

    /// The display timed out and was turned off.
    DisplayBlanked,
}

/// The values that went out (or would have) in one report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportData {
    pub status: ReportStatus,
    pub gallons: f32,
    pub psi: f32,
    pub temp_f: f32,
    /// Seconds until the next attempt.
    pub next_in_secs: u64,
}
