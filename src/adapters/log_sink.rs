//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART in production).  Counts what it
//! has seen so a periodic health line can be added without touching the
//! control core.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::net::ReportStatus;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink {
    reports: u32,
    failed_reports: u32,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report attempts seen so far.
    pub fn reports(&self) -> u32 {
        self.reports
    }

    /// Attempts that did not end in `ook`.
    pub fn failed_reports(&self) -> u32 {
        self.failed_reports
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started {
                state,
                first_report_in_secs,
            } => {
                info!(
                    "START | wifi={} | first report in {}s",
                    state.status_code(),
                    first_report_in_secs
                );
            }
            AppEvent::ConnectivityChanged { from, to } => {
                info!("CONN | {} -> {}", from.status_code(), to.status_code());
            }
            AppEvent::ReportCompleted(r) => {
                self.reports = self.reports.wrapping_add(1);
                if r.status == ReportStatus::Ok {
                    info!(
                        "REPORT | sts={} | gal={:.3} psi={:.1} tF={:.2} | next in {}s",
                        r.status, r.gallons, r.psi, r.temp_f, r.next_in_secs
                    );
                } else {
                    self.failed_reports = self.failed_reports.wrapping_add(1);
                    warn!(
                        "REPORT | sts={} | gal={:.3} psi={:.1} tF={:.2} | next in {}s | failed {}/{}",
                        r.status,
                        r.gallons,
                        r.psi,
                        r.temp_f,
                        r.next_in_secs,
                        self.failed_reports,
                        self.reports
                    );
                }
            }
            AppEvent::DisplayWoke => info!("DISPLAY | on"),
            AppEvent::DisplayBlanked => info!("DISPLAY | off"),
        }
    }
}
