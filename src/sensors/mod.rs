//! Sensor subsystem: flow accumulator, thermometer, pressure transducer.
//!
//! Each sensor implements the matching port trait from
//! [`app::ports`](crate::app::ports); the control loop never sees the
//! underlying bus or ADC.

pub mod flow;
pub mod pressure;
pub mod temperature;
pub mod units;

/// Reported in place of a reading whose sensor failed.
pub const READING_SENTINEL: f32 = -99.99;
