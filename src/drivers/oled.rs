//! SSD1306 128×32 OLED over I²C with a local framebuffer.
//!
//! Text is rendered with `embedded-graphics` into a 512-byte page-ordered
//! buffer, then the whole buffer is pushed after every change.
//!
//! ```text
//!   byte index = x + (y / 8) * 128        bit = y % 8
//! ```
//!
//! With the 6×10 font the panel holds three 21-character rows.

use core::convert::Infallible;

use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::mono_font::MonoTextStyleBuilder;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::i2c::{Error as _, I2c};
use log::warn;

use crate::app::ports::DisplayPort;

pub const WIDTH: u32 = 128;
pub const HEIGHT: u32 = 32;
const PAGES: usize = (HEIGHT / 8) as usize;
const BUF_LEN: usize = WIDTH as usize * PAGES;

pub const CHAR_WIDTH: u32 = 6;
pub const LINE_HEIGHT: u32 = 10;
pub const OLED_COLS: u8 = (WIDTH / CHAR_WIDTH) as u8;
pub const OLED_ROWS: u8 = (HEIGHT / LINE_HEIGHT) as u8;

const CONTROL_CMD: u8 = 0x00;
const CONTROL_DATA: u8 = 0x40;
const CMD_DISPLAY_OFF: u8 = 0xAE;
const CMD_DISPLAY_ON: u8 = 0xAF;
/// Data bytes per I²C transaction.
const DATA_CHUNK: usize = 16;

#[rustfmt::skip]
const INIT_SEQUENCE: &[u8] = &[
    CMD_DISPLAY_OFF,
    0xD5, 0x80, // clock divide
    0xA8, 0x1F, // multiplex 32
    0xD3, 0x00, // no display offset
    0x40,       // start line 0
    0x8D, 0x14, // charge pump on
    0x20, 0x00, // horizontal addressing
    0xA1,       // segment remap
    0xC8,       // COM scan descending
    0xDA, 0x02, // COM pins for 128x32
    0x81, 0x8F, // contrast
    0xD9, 0xF1, // pre-charge
    0xDB, 0x40, // VCOMH deselect
    0xA4,       // resume from RAM
    0xA6,       // normal (not inverted)
    CMD_DISPLAY_ON,
];

// ── Framebuffer ───────────────────────────────────────────────

pub struct Framebuffer {
    buf: [u8; BUF_LEN],
}

impl Framebuffer {
    pub const fn new() -> Self {
        Self { buf: [0; BUF_LEN] }
    }

    pub fn clear(&mut self) {
        self.buf = [0; BUF_LEN];
    }

    pub fn pixel(&self, x: u32, y: u32) -> bool {
        if x >= WIDTH || y >= HEIGHT {
            return false;
        }
        let idx = x as usize + (y as usize / 8) * WIDTH as usize;
        self.buf[idx] & (1 << (y % 8)) != 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl OriginDimensions for Framebuffer {
    fn size(&self) -> Size {
        Size::new(WIDTH, HEIGHT)
    }
}

impl DrawTarget for Framebuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            let (Ok(x), Ok(y)) = (u32::try_from(point.x), u32::try_from(point.y)) else {
                continue;
            };
            if x >= WIDTH || y >= HEIGHT {
                continue;
            }
            let idx = x as usize + (y as usize / 8) * WIDTH as usize;
            let mask = 1u8 << (y % 8);
            if color.is_on() {
                self.buf[idx] |= mask;
            } else {
                self.buf[idx] &= !mask;
            }
        }
        Ok(())
    }
}

// ── Panel ─────────────────────────────────────────────────────

/// Hold the panel's reset line low for 50 ms, then release it.
pub fn pulse_reset<P: OutputPin, D: DelayNs>(pin: &mut P, delay: &mut D) {
    let _ = pin.set_low();
    delay.delay_ms(50);
    let _ = pin.set_high();
}

pub struct OledDisplay<I> {
    i2c: I,
    addr: u8,
    fb: Framebuffer,
    powered: bool,
}

impl<I: I2c> OledDisplay<I> {
    /// Initialise the controller and blank the panel.
    pub fn new(i2c: I, addr: u8) -> Self {
        let mut oled = Self {
            i2c,
            addr,
            fb: Framebuffer::new(),
            powered: true,
        };
        oled.commands(INIT_SEQUENCE);
        oled.flush();
        oled
    }

    fn send(&mut self, bytes: &[u8]) {
        if let Err(e) = self.i2c.write(self.addr, bytes) {
            warn!("OLED: I2C write to 0x{:02X} failed: {:?}", self.addr, e.kind());
        }
    }

    fn commands(&mut self, cmds: &[u8]) {
        let mut frame: heapless::Vec<u8, 32> = heapless::Vec::new();
        let _ = frame.push(CONTROL_CMD);
        let _ = frame.extend_from_slice(cmds);
        self.send(&frame);
    }

    /// Push the whole framebuffer.
    pub fn flush(&mut self) {
        self.commands(&[0x21, 0, (WIDTH - 1) as u8, 0x22, 0, (PAGES - 1) as u8]);
        let mut frame = [0u8; DATA_CHUNK + 1];
        frame[0] = CONTROL_DATA;
        for i in 0..BUF_LEN / DATA_CHUNK {
            let start = i * DATA_CHUNK;
            frame[1..].copy_from_slice(&self.fb.buf[start..start + DATA_CHUNK]);
            self.send(&frame);
        }
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.fb
    }
}

impl<I: I2c> DisplayPort for OledDisplay<I> {
    fn clear(&mut self) {
        self.fb.clear();
        self.flush();
    }

    fn write(&mut self, row: u8, col: u8, text: &str) {
        if row >= OLED_ROWS || col >= OLED_COLS {
            return;
        }
        let room = usize::from(OLED_COLS - col);
        let end = text
            .char_indices()
            .nth(room)
            .map_or(text.len(), |(i, _)| i);

        // Background fill erases whatever the previous value left behind.
        let style = MonoTextStyleBuilder::new()
            .font(&FONT_6X10)
            .text_color(BinaryColor::On)
            .background_color(BinaryColor::Off)
            .build();
        let origin = Point::new(
            (u32::from(col) * CHAR_WIDTH) as i32,
            (u32::from(row) * LINE_HEIGHT) as i32,
        );
        let _ = Text::with_baseline(&text[..end], origin, style, Baseline::Top).draw(&mut self.fb);
        self.flush();
    }

    fn set_power(&mut self, on: bool) {
        self.powered = on;
        self.commands(&[if on { CMD_DISPLAY_ON } else { CMD_DISPLAY_OFF }]);
    }

    fn is_powered(&self) -> bool {
        self.powered
    }
}
