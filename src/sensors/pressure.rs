//! 0–100 psi ratiometric pressure transducer on an ADC input.
//!
//! Transducer output is linear: 0.5 V at 0 psi, 4.5 V at 100 psi
//! (25 psi/V, -12.5 psi offset).  The ADC channel hands us millivolts
//! through [`AnalogInput`]; this module only applies `y = m·x + b`.

use crate::app::ports::PressurePort;
use crate::error::SensorError;
use crate::sensors::units::round_to;

const CAL_MIN_PSI: f32 = 0.0;
const CAL_MIN_V: f32 = 0.5;
const CAL_MAX_PSI: f32 = 100.0;
const CAL_MAX_V: f32 = 4.5;
const DECIMAL_PLACES: u32 = 1;

/// Anything that can sample a voltage in millivolts.
pub trait AnalogInput {
    fn read_millivolts(&mut self) -> Result<u16, SensorError>;
}

/// Linear voltage → psi converter.
pub struct PressureSensor<A> {
    adc: A,
    slope: f32,
    offset: f32,
}

impl<A: AnalogInput> PressureSensor<A> {
    pub fn new(adc: A) -> Self {
        let slope = (CAL_MAX_PSI - CAL_MIN_PSI) / (CAL_MAX_V - CAL_MIN_V);
        let offset = CAL_MAX_PSI - slope * CAL_MAX_V;
        Self { adc, slope, offset }
    }

    /// Convert a voltage to psi, optionally clamped to the calibrated range.
    pub fn volts_to_psi(&self, volts: f32, clip: bool) -> f32 {
        let mut psi = self.slope * volts + self.offset;
        if clip {
            psi = psi.clamp(CAL_MIN_PSI, CAL_MAX_PSI);
        }
        round_to(psi, DECIMAL_PLACES)
    }
}

impl<A: AnalogInput> PressurePort for PressureSensor<A> {
    fn read_pressure(&mut self, clip: bool) -> Result<f32, SensorError> {
        let mv = self.adc.read_millivolts()?;
        Ok(self.volts_to_psi(f32::from(mv) / 1000.0, clip))
    }
}
