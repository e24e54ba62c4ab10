//! Peripheral drivers and one-shot hardware initialisation.

pub mod button;
pub mod ds18b20;
pub mod hw_init;
pub mod lcd;
pub mod oled;
pub mod onewire;
