//! DS18B20 digital thermometer on the one-wire bus.
//!
//! Parasite power is not used; the probe has its own 3V3 lead.  A 12-bit
//! conversion takes up to 750 ms, which the caller waits out.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use super::onewire::{crc8, OneWire};
use crate::error::SensorError;
use crate::sensors::temperature::TemperatureProbe;

pub const CMD_CONVERT_T: u8 = 0x44;
pub const CMD_READ_SCRATCHPAD: u8 = 0xBE;
/// Family code in the first ROM byte.
pub const FAMILY_CODE: u8 = 0x28;

const SCRATCHPAD_LEN: usize = 9;

/// Temperature register (LSB, MSB) to °C at 1/16 °C resolution.
/// Rejects a scratchpad whose CRC byte does not match.
pub fn decode_scratchpad(pad: &[u8; SCRATCHPAD_LEN]) -> Result<f32, SensorError> {
    if crc8(&pad[..8]) != pad[8] {
        return Err(SensorError::CrcMismatch);
    }
    // An all-zero pad passes the CRC; it means the line is stuck low.
    if pad.iter().all(|&b| b == 0) {
        return Err(SensorError::BusFault);
    }
    let raw = i16::from_le_bytes([pad[0], pad[1]]);
    Ok(f32::from(raw) / 16.0)
}

pub struct Ds18b20<P, D> {
    bus: OneWire<P, D>,
    rom: [u8; 8],
}

impl<P: InputPin + OutputPin, D: DelayNs> Ds18b20<P, D> {
    /// `rom` is the probe's 8-byte address; all zeros addresses the only
    /// device on the bus.
    pub fn new(bus: OneWire<P, D>, rom: [u8; 8]) -> Self {
        if rom[0] != 0 && rom[0] != FAMILY_CODE {
            log::warn!("DS18B20: ROM family 0x{:02X} is not a DS18B20", rom[0]);
        }
        Self { bus, rom }
    }

    pub fn rom(&self) -> &[u8; 8] {
        &self.rom
    }
}

impl<P: InputPin + OutputPin, D: DelayNs> TemperatureProbe for Ds18b20<P, D> {
    fn start_conversion(&mut self) -> Result<(), SensorError> {
        self.bus.select(&self.rom)?;
        self.bus.write_byte(CMD_CONVERT_T)
    }

    fn read_celsius(&mut self) -> Result<f32, SensorError> {
        self.bus.select(&self.rom)?;
        self.bus.write_byte(CMD_READ_SCRATCHPAD)?;
        let mut pad = [0u8; SCRATCHPAD_LEN];
        self.bus.read_bytes(&mut pad)?;
        decode_scratchpad(&pad)
    }
}
