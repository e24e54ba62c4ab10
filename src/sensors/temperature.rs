//! Tank water temperature with glitch retry.
//!
//! The DS18B20 occasionally answers with its 85 °C power-on value (or other
//! junk) at room temperature.  [`Thermometer`] treats anything outside the
//! plausible range as a glitch: it restarts the conversion, waits the
//! settle time, and reads once more before giving up.

use embedded_hal::delay::DelayNs;
use log::{debug, warn};

use crate::app::ports::TemperaturePort;
use crate::error::SensorError;

/// Readings at or below this are glitches (-30 °C = -22 °F).
pub const BAD_READ_LOW_C: f32 = -30.0;
/// Readings at or above this are glitches (65 °C = 149 °F).
pub const BAD_READ_HIGH_C: f32 = 65.0;
/// DS18B20 12-bit conversion time.
pub const CONVERSION_SETTLE_MS: u32 = 750;

/// Raw probe access: start a conversion, fetch the last result.
pub trait TemperatureProbe {
    fn start_conversion(&mut self) -> Result<(), SensorError>;
    fn read_celsius(&mut self) -> Result<f32, SensorError>;
}

fn plausible(celsius: f32) -> bool {
    celsius > BAD_READ_LOW_C && celsius < BAD_READ_HIGH_C
}

/// Probe wrapper that caches the last good reading and retries glitches once.
pub struct Thermometer<P, D> {
    probe: P,
    delay: D,
    settle_ms: u32,
    last_celsius: Option<f32>,
}

impl<P: TemperatureProbe, D: DelayNs> Thermometer<P, D> {
    pub fn new(probe: P, delay: D) -> Self {
        Self::with_settle_ms(probe, delay, CONVERSION_SETTLE_MS)
    }

    pub fn with_settle_ms(probe: P, delay: D, settle_ms: u32) -> Self {
        Self {
            probe,
            delay,
            settle_ms,
            last_celsius: None,
        }
    }
}

impl<P: TemperatureProbe, D: DelayNs> TemperaturePort for Thermometer<P, D> {
    fn start_conversion(&mut self) {
        if let Err(e) = self.probe.start_conversion() {
            warn!("Temp: conversion start failed: {}", e);
        }
    }

    fn read_temperature(&mut self, last_only: bool) -> Result<f32, SensorError> {
        if last_only {
            return self.last_celsius.ok_or(SensorError::NoReading);
        }

        let first = self.probe.read_celsius()?;
        if plausible(first) {
            self.last_celsius = Some(first);
            return Ok(first);
        }

        warn!("Temp: implausible reading {:.2}C, re-converting", first);
        self.probe.start_conversion()?;
        self.delay.delay_ms(self.settle_ms);
        let second = self.probe.read_celsius()?;
        if plausible(second) {
            debug!("Temp: retry recovered {:.2}C", second);
            self.last_celsius = Some(second);
            Ok(second)
        } else {
            warn!("Temp: retry still implausible ({:.2}C)", second);
            Err(SensorError::OutOfRange)
        }
    }
}
