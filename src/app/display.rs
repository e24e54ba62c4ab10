//! Display visibility and screen layout.
//!
//! ```text
//!   col 0        9
//!   g:12.34  sts:120      gallons since last report / countdown or code
//!   t:72.3F   psi:24.0    last-known temperature / line pressure
//! ```
//!
//! Fields are padded to a fixed width so a shorter value overwrites a longer
//! one left on the panel.

use core::fmt::Write as _;

use heapless::String;

use super::ports::DisplayPort;

/// Widest supported panel (SSD1306, 6 px font).
pub const LINE_WIDTH: usize = 21;

pub type Line = String<LINE_WIDTH>;

pub const STATUS_COL: u8 = 9;
pub const PRESSURE_COL: u8 = 10;

/// Whether the panel is lit and when it should go dark.
#[derive(Debug, Clone)]
pub struct DisplayVisibility {
    visible: bool,
    blank_deadline: u64,
    timeout: u64,
}

impl DisplayVisibility {
    pub fn new(timeout_secs: u32) -> Self {
        Self {
            visible: false,
            blank_deadline: 0,
            timeout: u64::from(timeout_secs),
        }
    }

    /// Light the panel and push the blank deadline out.  Returns `true` if
    /// the panel was off.
    pub fn wake(&mut self, now: u64) -> bool {
        let was_hidden = !self.visible;
        self.visible = true;
        self.blank_deadline = now + self.timeout;
        was_hidden
    }

    /// Hide the panel once the deadline has passed.  Returns `true` on the
    /// tick it goes dark.
    pub fn should_blank(&mut self, now: u64) -> bool {
        if self.visible && now >= self.blank_deadline {
            self.visible = false;
            return true;
        }
        false
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn blank_deadline(&self) -> u64 {
        self.blank_deadline
    }
}

// ── Formatting ────────────────────────────────────────────────

fn line(args: core::fmt::Arguments<'_>) -> Line {
    let mut s = Line::new();
    // Overflow truncates; the panel would clip it anyway.
    let _ = s.write_fmt(args);
    s
}

pub fn gallons_field(gallons: f32) -> Line {
    line(format_args!("g:{:<6.2}", gallons))
}

/// `sts:` followed by the countdown or a three-character code.
pub fn status_field(status: &str) -> Line {
    line(format_args!("sts:{:<4}", status))
}

pub fn countdown_field(seconds: u64) -> Line {
    line(format_args!("sts:{:<4}", seconds))
}

/// `None` means no reading yet.
pub fn temperature_field(temp_f: Option<f32>) -> Line {
    match temp_f {
        Some(t) => {
            let mut v: String<8> = String::new();
            let _ = write!(v, "{:.1}F", t);
            line(format_args!("t:{:<7}", v.as_str()))
        }
        None => line(format_args!("t:{:<7}", "--.-F")),
    }
}

pub fn pressure_field(psi: Option<f32>) -> Line {
    match psi {
        Some(p) => line(format_args!("psi:{:<5.1}", p)),
        None => line(format_args!("psi:{:<5}", "--")),
    }
}

/// Idle screen with the live readings.
pub fn render_readings(
    display: &mut impl DisplayPort,
    gallons: f32,
    status: &Line,
    temp_f: Option<f32>,
    psi: Option<f32>,
) {
    display.write(0, 0, &gallons_field(gallons));
    display.write(0, STATUS_COL, status);
    display.write(1, 0, &temperature_field(temp_f));
    display.write(1, PRESSURE_COL, &pressure_field(psi));
}

/// Two-line banner, rest of the panel cleared.
pub fn render_banner(display: &mut impl DisplayPort, top: &str, bottom: &str) {
    display.clear();
    display.write(0, 0, top);
    display.write(1, 0, bottom);
}
