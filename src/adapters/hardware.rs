//! Hardware adapter: bridges the board's peripherals to the domain ports.
//!
//! [`NodeBoard`] owns one display, one thermometer, one pressure sensor and
//! the wake button, and forwards each port trait to the matching part.  The
//! control loop sees a single [`NodeHardware`](crate::app::ports::NodeHardware)
//! value.  [`Adc1Input`] feeds the pressure sensor from the oneshot ADC
//! configured in [`hw_init`](crate::drivers::hw_init).

use log::warn;

use crate::app::ports::{ButtonPort, DisplayPort, PressurePort, TemperaturePort};
use crate::drivers::hw_init;
use crate::error::SensorError;
use crate::sensors::pressure::AnalogInput;

/// Concrete adapter that combines all board hardware behind port traits.
pub struct NodeBoard<D, T, P, B> {
    display: D,
    thermometer: T,
    pressure: P,
    button: B,
}

impl<D, T, P, B> NodeBoard<D, T, P, B> {
    pub fn new(display: D, thermometer: T, pressure: P, button: B) -> Self {
        Self {
            display,
            thermometer,
            pressure,
            button,
        }
    }

    pub fn display(&self) -> &D {
        &self.display
    }
}

// ── DisplayPort ───────────────────────────────────────────────

impl<D: DisplayPort, T, P, B> DisplayPort for NodeBoard<D, T, P, B> {
    fn clear(&mut self) {
        self.display.clear();
    }

    fn write(&mut self, row: u8, col: u8, text: &str) {
        self.display.write(row, col, text);
    }

    fn set_power(&mut self, on: bool) {
        self.display.set_power(on);
    }

    fn is_powered(&self) -> bool {
        self.display.is_powered()
    }
}

// ── Sensor ports ──────────────────────────────────────────────

impl<D, T: TemperaturePort, P, B> TemperaturePort for NodeBoard<D, T, P, B> {
    fn start_conversion(&mut self) {
        self.thermometer.start_conversion();
    }

    fn read_temperature(&mut self, last_only: bool) -> Result<f32, SensorError> {
        self.thermometer.read_temperature(last_only)
    }
}

impl<D, T, P: PressurePort, B> PressurePort for NodeBoard<D, T, P, B> {
    fn read_pressure(&mut self, clip: bool) -> Result<f32, SensorError> {
        self.pressure.read_pressure(clip)
    }
}

impl<D, T, P, B: ButtonPort> ButtonPort for NodeBoard<D, T, P, B> {
    fn was_pressed(&mut self) -> bool {
        self.button.was_pressed()
    }
}

// ── ADC input ─────────────────────────────────────────────────

/// One ADC1 channel behind a resistive divider, scaled back to the
/// voltage at the transducer.
pub struct Adc1Input {
    channel: u32,
    divider_ratio: f32,
}

impl Adc1Input {
    pub fn new(channel: u32, divider_ratio: f32) -> Self {
        Self {
            channel,
            divider_ratio,
        }
    }

    pub fn scale(&self, raw: u16) -> u16 {
        let mv = f32::from(hw_init::raw_to_millivolts(raw)) * self.divider_ratio;
        mv.clamp(0.0, f32::from(u16::MAX)) as u16
    }
}

impl AnalogInput for Adc1Input {
    fn read_millivolts(&mut self) -> Result<u16, SensorError> {
        match hw_init::adc1_read(self.channel) {
            Ok(raw) => Ok(self.scale(raw)),
            Err(rc) => {
                warn!("ADC1 CH{} read failed (rc={})", self.channel, rc);
                Err(SensorError::AdcReadFailed)
            }
        }
    }
}
