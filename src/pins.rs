//! GPIO / peripheral pin assignments for the tank node board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.  The numbering follows the field units already
//! deployed (ESP32 devkit, onboard BOOT button as the wake button).

// ---------------------------------------------------------------------------
// I²C bus (character LCD backpack or SSD1306 OLED)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 4;
pub const I2C_SCL_GPIO: i32 = 5;
pub const I2C_FREQ_HZ: u32 = 100_000;

/// PCF8574 backpack address (A0..A2 pulled high).
pub const LCD_I2C_ADDR: u8 = 0x27;
/// SSD1306 address with SA0 low.
pub const OLED_I2C_ADDR: u8 = 0x3C;
/// SSD1306 reset line (active low).
pub const OLED_RESET_GPIO: i32 = 16;

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

/// Hall-effect flow meter, open collector, falling edge per pulse.
pub const FLOW_PULSE_GPIO: i32 = 14;

/// DS18B20 data line (4.7 kΩ pull-up to 3V3).
pub const ONEWIRE_GPIO: i32 = 13;

/// Pressure transducer through a 3:2 divider.  ADC1 channel 0 (GPIO 36).
pub const PRESSURE_ADC_GPIO: i32 = 36;
pub const PRESSURE_ADC_CHANNEL: u32 = 0;
/// Divider ratio: transducer volts = ADC volts × this.
pub const PRESSURE_DIVIDER_RATIO: f32 = 1.5;

// ---------------------------------------------------------------------------
// User button (active-low, internal pull-up)
// ---------------------------------------------------------------------------

/// Onboard BOOT button, wakes the display.
pub const BUTTON_GPIO: i32 = 0;
