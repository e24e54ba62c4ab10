//! Bit-banged Dallas one-wire bus master.
//!
//! The data line is an open-drain GPIO with an external pull-up: driving it
//! low pulls the bus down, "high" releases it.  Standard-speed slot timing:
//!
//! | Slot      | Low    | Then                         |
//! |-----------|--------|------------------------------|
//! | reset     | 480 µs | release, sample at 70 µs, 410 µs recovery |
//! | write 1   | 6 µs   | release 64 µs                |
//! | write 0   | 60 µs  | release 10 µs                |
//! | read      | 6 µs   | release, sample at 9 µs, 55 µs recovery |

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::error::SensorError;

pub const CMD_MATCH_ROM: u8 = 0x55;
pub const CMD_SKIP_ROM: u8 = 0xCC;

pub struct OneWire<P, D> {
    pin: P,
    delay: D,
}

impl<P: InputPin + OutputPin, D: DelayNs> OneWire<P, D> {
    pub fn new(mut pin: P, delay: D) -> Self {
        // Idle state is released.
        let _ = pin.set_high();
        Self { pin, delay }
    }

    fn low(&mut self) -> Result<(), SensorError> {
        self.pin.set_low().map_err(|_| SensorError::BusFault)
    }

    fn release(&mut self) -> Result<(), SensorError> {
        self.pin.set_high().map_err(|_| SensorError::BusFault)
    }

    fn sample(&mut self) -> Result<bool, SensorError> {
        self.pin.is_high().map_err(|_| SensorError::BusFault)
    }

    /// Reset pulse.  Returns `true` if at least one device answered.
    pub fn reset(&mut self) -> Result<bool, SensorError> {
        self.low()?;
        self.delay.delay_us(480);
        self.release()?;
        self.delay.delay_us(70);
        let present = !self.sample()?;
        self.delay.delay_us(410);
        Ok(present)
    }

    fn write_bit(&mut self, bit: bool) -> Result<(), SensorError> {
        self.low()?;
        if bit {
            self.delay.delay_us(6);
            self.release()?;
            self.delay.delay_us(64);
        } else {
            self.delay.delay_us(60);
            self.release()?;
            self.delay.delay_us(10);
        }
        Ok(())
    }

    fn read_bit(&mut self) -> Result<bool, SensorError> {
        self.low()?;
        self.delay.delay_us(6);
        self.release()?;
        self.delay.delay_us(9);
        let bit = self.sample()?;
        self.delay.delay_us(55);
        Ok(bit)
    }

    /// LSB first.
    pub fn write_byte(&mut self, byte: u8) -> Result<(), SensorError> {
        for i in 0..8 {
            self.write_bit(byte & (1 << i) != 0)?;
        }
        Ok(())
    }

    pub fn read_byte(&mut self) -> Result<u8, SensorError> {
        let mut byte = 0u8;
        for i in 0..8 {
            if self.read_bit()? {
                byte |= 1 << i;
            }
        }
        Ok(byte)
    }

    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), SensorError> {
        for b in buf.iter_mut() {
            *b = self.read_byte()?;
        }
        Ok(())
    }

    /// Reset, then address one device (MATCH ROM) or, for an all-zero
    /// address, every device (SKIP ROM).
    pub fn select(&mut self, rom: &[u8; 8]) -> Result<(), SensorError> {
        if !self.reset()? {
            return Err(SensorError::NoPresence);
        }
        if rom.iter().all(|&b| b == 0) {
            return self.write_byte(CMD_SKIP_ROM);
        }
        self.write_byte(CMD_MATCH_ROM)?;
        for &b in rom {
            self.write_byte(b)?;
        }
        Ok(())
    }
}

/// Dallas/Maxim CRC-8 (poly 0x31 reflected, init 0).  Over data plus its
/// trailing CRC byte the result is 0.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data {
        let mut b = byte;
        for _ in 0..8 {
            let mix = (crc ^ b) & 0x01;
            crc >>= 1;
            if mix != 0 {
                crc ^= 0x8C;
            }
            b >>= 1;
        }
    }
    crc
}
