//! HD44780 20×4 character LCD behind a PCF8574 I²C backpack.
//!
//! The expander's eight outputs carry one nibble plus control lines:
//!
//! ```text
//!   bit  7  6  5  4   3   2   1   0
//!        D7 D6 D5 D4  BL  EN  RW  RS
//! ```
//!
//! Every byte goes out as two nibbles, high first, each latched by an EN
//! pulse.  RW is always 0 (write-only).

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{Error as _, I2c};
use log::warn;

use crate::app::ports::DisplayPort;

pub const LCD_COLS: u8 = 20;
pub const LCD_ROWS: u8 = 4;

const BIT_RS: u8 = 0x01;
const BIT_EN: u8 = 0x04;
const BIT_BACKLIGHT: u8 = 0x08;

const CMD_CLEAR: u8 = 0x01;
const CMD_SET_DDRAM: u8 = 0x80;

/// 8-bit wake, switch to 4-bit, 2 lines 5×8, display on no cursor, clear.
const INIT_SEQUENCE: [u8; 5] = [0x33, 0x32, 0x28, 0x0C, CMD_CLEAR];

/// Settle time between expander writes.
const STROBE_US: u32 = 2000;

pub struct CharLcd<I, D> {
    i2c: I,
    delay: D,
    addr: u8,
    backlight: bool,
    faulted: bool,
}

impl<I: I2c, D: DelayNs> CharLcd<I, D> {
    pub fn new(i2c: I, delay: D, addr: u8) -> Self {
        let mut lcd = Self {
            i2c,
            delay,
            addr,
            backlight: true,
            faulted: false,
        };
        for cmd in INIT_SEQUENCE {
            lcd.command(cmd);
            lcd.delay.delay_us(STROBE_US * 2);
        }
        lcd.raw(BIT_BACKLIGHT);
        lcd
    }

    /// DDRAM address of (`row`, `col`); rows 2 and 3 continue rows 0 and 1.
    pub fn cursor_address(row: u8, col: u8) -> u8 {
        let col = col.min(LCD_COLS - 1);
        let row = row.min(LCD_ROWS - 1);
        CMD_SET_DDRAM + col + 0x40 * (row % 2) + 0x14 * u8::from(row > 1)
    }

    fn raw(&mut self, byte: u8) {
        if let Err(e) = self.i2c.write(self.addr, &[byte]) {
            // Log once per fault, not per byte.
            if !self.faulted {
                warn!("LCD: I2C write to 0x{:02X} failed: {:?}", self.addr, e.kind());
                self.faulted = true;
            }
        } else {
            self.faulted = false;
        }
    }

    fn with_backlight(&self, byte: u8) -> u8 {
        if self.backlight {
            byte | BIT_BACKLIGHT
        } else {
            byte & !BIT_BACKLIGHT
        }
    }

    fn nibble(&mut self, bits: u8) {
        let b = self.with_backlight(bits | BIT_EN);
        self.raw(b);
        self.delay.delay_us(STROBE_US);
        let b = self.with_backlight(bits & !BIT_EN);
        self.raw(b);
    }

    fn send(&mut self, byte: u8, rs: u8) {
        self.nibble((byte & 0xF0) | rs);
        self.nibble(((byte & 0x0F) << 4) | rs);
    }

    fn command(&mut self, cmd: u8) {
        self.send(cmd, 0);
    }

    fn data(&mut self, ch: u8) {
        self.send(ch, BIT_RS);
    }
}

impl<I: I2c, D: DelayNs> DisplayPort for CharLcd<I, D> {
    fn clear(&mut self) {
        self.command(CMD_CLEAR);
        self.delay.delay_us(STROBE_US);
    }

    fn write(&mut self, row: u8, col: u8, text: &str) {
        self.command(Self::cursor_address(row, col));
        let room = usize::from(LCD_COLS.saturating_sub(col));
        for ch in text.bytes().take(room) {
            // The HD44780 ROM is ASCII in the printable range.
            self.data(if ch.is_ascii() { ch } else { b'?' });
        }
    }

    fn set_power(&mut self, on: bool) {
        self.backlight = on;
        self.raw(if on { BIT_BACKLIGHT } else { 0 });
    }

    fn is_powered(&self) -> bool {
        self.backlight
    }
}
