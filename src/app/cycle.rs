//! Report countdown.
//!
//! ```text
//!   ──────────────┬───────────────────────┬──────────▶ t
//!            deadline - lead           deadline
//!          start conversion            report, advance
//! ```
//!
//! The deadline only moves forward in whole intervals, except for the
//! reconnect fast path ([`ReportCycle::expedite`]) and the short retry after
//! a report that found no connection ([`ReportCycle::retry`]).

/// Countdown to the next report plus the pre-conversion trigger.
#[derive(Debug, Clone)]
pub struct ReportCycle {
    next_deadline: u64,
    interval: u64,
    lead: u64,
    /// Deadline the pre-conversion has already fired for.
    armed_for: Option<u64>,
}

impl ReportCycle {
    pub fn new(interval_secs: u32, lead_secs: u32, first_deadline: u64) -> Self {
        Self {
            next_deadline: first_deadline,
            // A zero interval would never advance.
            interval: u64::from(interval_secs.max(1)),
            lead: u64::from(lead_secs),
            armed_for: None,
        }
    }

    pub fn next_deadline(&self) -> u64 {
        self.next_deadline
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    /// Seconds until the deadline, 0 once it has passed.
    pub fn seconds_remaining(&self, now: u64) -> u64 {
        self.next_deadline.saturating_sub(now)
    }

    /// True from the deadline onward, so a skipped tick never loses a report.
    pub fn is_due(&self, now: u64) -> bool {
        now >= self.next_deadline
    }

    /// True once per deadline, the first time the remaining time is within
    /// the pre-conversion lead.
    pub fn should_start_conversion(&mut self, now: u64) -> bool {
        if self.armed_for == Some(self.next_deadline) {
            return false;
        }
        if self.seconds_remaining(now) <= self.lead {
            self.armed_for = Some(self.next_deadline);
            return true;
        }
        false
    }

    /// Whether the pre-conversion already ran for the current deadline.
    pub fn conversion_armed(&self) -> bool {
        self.armed_for == Some(self.next_deadline)
    }

    /// Move past `now` in whole intervals.
    pub fn advance(&mut self, now: u64) {
        while self.next_deadline <= now {
            self.next_deadline += self.interval;
        }
    }

    /// Try again `delay_secs` from now.
    pub fn retry(&mut self, now: u64, delay_secs: u32) {
        self.next_deadline = now + u64::from(delay_secs.max(1));
    }

    /// Pull the deadline in to `now + delay_secs` if it is later than that.
    pub fn expedite(&mut self, now: u64, delay_secs: u32) {
        self.next_deadline = self.next_deadline.min(now + u64::from(delay_secs));
    }

    /// Replace the deadline outright (boot).
    pub fn reset(&mut self, deadline: u64) {
        self.next_deadline = deadline;
        self.armed_for = None;
    }
}
