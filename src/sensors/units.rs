//! Stateless unit conversions and report rounding.

/// Liter to US gallon ratio.
pub const LITERS_PER_GALLON: f32 = 3.7854;

pub fn liters_to_gallons(liters: f32) -> f32 {
    liters / LITERS_PER_GALLON
}

pub fn celsius_to_fahrenheit(celsius: f32) -> f32 {
    celsius * 9.0 / 5.0 + 32.0
}

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f32, places: u32) -> f32 {
    let scale = 10f32.powi(places as i32);
    (value * scale).round() / scale
}
