//! Polled push-button edge detector.
//!
//! The display-wake button is sampled every 100 ms sub-tick, which is slow
//! enough that contact bounce never spans two samples.  A press is reported
//! once, on the released → pressed transition; holding the button does not
//! repeat it.  A button already held at construction is not a press.

use embedded_hal::digital::InputPin;
use log::warn;

use crate::app::ports::ButtonPort;

pub struct Button<P> {
    pin: P,
    active_low: bool,
    was_down: bool,
}

impl<P: InputPin> Button<P> {
    /// Switch to ground with a pull-up (the usual wiring).
    pub fn active_low(pin: P) -> Self {
        Self::new(pin, true)
    }

    pub fn active_high(pin: P) -> Self {
        Self::new(pin, false)
    }

    fn new(pin: P, active_low: bool) -> Self {
        let mut b = Self {
            pin,
            active_low,
            was_down: false,
        };
        b.was_down = b.is_down();
        b
    }

    fn is_down(&mut self) -> bool {
        match self.pin.is_high() {
            Ok(high) => high != self.active_low,
            Err(_) => {
                warn!("Button: pin read failed");
                false
            }
        }
    }
}

impl<P: InputPin> ButtonPort for Button<P> {
    fn was_pressed(&mut self) -> bool {
        let down = self.is_down();
        let edge = down && !self.was_down;
        self.was_down = down;
        edge
    }
}
