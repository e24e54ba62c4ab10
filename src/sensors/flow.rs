//! Hall-effect water flow meter: interrupt-driven pulse accumulator.
//!
//! The meter emits one falling edge per fixed fraction of a liter.  The GPIO
//! ISR calls [`PulseAccumulator::on_pulse`]; the control loop reads the
//! running volume with [`PulseAccumulator::volume`].
//!
//! ## Concurrency contract
//!
//! Two execution contexts touch the accumulator:
//!
//! | Field             | Written by | Read by          |
//! |-------------------|------------|------------------|
//! | `raw_pulses`      | ISR        | ISR, main loop   |
//! | `units`           | ISR        | ISR, main loop   |
//! | `reset_requested` | main (set) | ISR (clear)      |
//!
//! Each field has exactly one writer per direction, so no lock is needed
//! and the ISR never blocks.  The ISR is not re-entrant, which makes its
//! load-then-store on `raw_pulses` atomic with respect to itself.
//!
//! A wrap stores `raw_pulses = 0` *before* publishing `units + 1` with
//! `Release`.  The reader loads `units` (`Acquire`) first and `raw_pulses`
//! second, so it can observe at worst one pulse too few, never one too many.
//!
//! ## Deferred reset
//!
//! `volume(true)` only raises `reset_requested`.  The counters are zeroed by
//! the next pulse, and that pulse itself is discarded.  Until then readers
//! still see the pre-reset volume.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Calibration: pulses per liter for the installed meter.
/// Bench fill of a 5 gal bucket: 8661 pulses / 18.927 L = 468.17.
pub const PULSES_PER_LITER: u32 = 468;

/// The installed meter.  `static` because ESP-IDF ISR callbacks cannot
/// capture state.
pub static FLOW_METER: PulseAccumulator = PulseAccumulator::new(PULSES_PER_LITER);

/// GPIO ISR entry point for the flow input.
#[inline]
pub fn flow_isr_handler() {
    FLOW_METER.on_pulse();
}

/// Interrupt-safe pulse counter with deferred reset.
pub struct PulseAccumulator {
    pulses_per_unit: u32,
    raw_pulses: AtomicU32,
    units: AtomicU32,
    reset_requested: AtomicBool,
}

impl PulseAccumulator {
    /// Create an accumulator.  `const` so it can live in a `static` that the
    /// ISR trampoline can reach.
    pub const fn new(pulses_per_unit: u32) -> Self {
        // A zero ratio would divide by zero in volume(); treat it as 1.
        let pulses_per_unit = if pulses_per_unit == 0 { 1 } else { pulses_per_unit };
        Self {
            pulses_per_unit,
            raw_pulses: AtomicU32::new(0),
            units: AtomicU32::new(0),
            reset_requested: AtomicBool::new(false),
        }
    }

    /// Record one falling edge.  ISR context only: bounded, allocation-free.
    pub fn on_pulse(&self) {
        if self.reset_requested.swap(false, Ordering::AcqRel) {
            self.raw_pulses.store(0, Ordering::Relaxed);
            self.units.store(0, Ordering::Release);
            return;
        }

        let next = self.raw_pulses.load(Ordering::Relaxed) + 1;
        if next >= self.pulses_per_unit {
            self.raw_pulses.store(0, Ordering::Relaxed);
            self.units.fetch_add(1, Ordering::Release);
        } else {
            self.raw_pulses.store(next, Ordering::Release);
        }
    }

    /// Accumulated volume in units (liters), fractional progress included.
    ///
    /// With `reset == true` a reset is requested; it takes effect on the next
    /// pulse, not synchronously.
    pub fn volume(&self, reset: bool) -> f32 {
        let units = self.units.load(Ordering::Acquire);
        let raw = self.raw_pulses.load(Ordering::Acquire);
        if reset {
            self.reset_requested.store(true, Ordering::Release);
        }
        units as f32 + raw as f32 / self.pulses_per_unit as f32
    }

    /// Calibration ratio.
    pub fn pulses_per_unit(&self) -> u32 {
        self.pulses_per_unit
    }

    /// Pulses counted toward the current (incomplete) unit.
    pub fn raw_pulses(&self) -> u32 {
        self.raw_pulses.load(Ordering::Acquire)
    }

    /// Whole units completed since the last reset.
    pub fn units(&self) -> u32 {
        self.units.load(Ordering::Acquire)
    }

    /// True while a reset is waiting for the next pulse.
    pub fn reset_pending(&self) -> bool {
        self.reset_requested.load(Ordering::Acquire)
    }
}
