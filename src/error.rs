//! Unified error types for the TankNode firmware.
//!
//! Boot failures (storage, config, peripheral init, Wi-Fi bring-up) convert
//! into the top-level [`Error`] on their way out of `main`.  Inside the
//! control core nothing is propagated upward: sensor errors become sentinel
//! readings and transport errors become
//! [`ReportStatus`](crate::net::reporter::ReportStatus) codes.
//! All variants are `Copy` so they can be passed around without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible boot step funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A communication subsystem failed.
    Comms(CommsError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// ADC read returned an error or timed out.
    AdcReadFailed,
    /// No device answered the one-wire reset pulse.
    NoPresence,
    /// The one-wire pin could not be driven or sampled.
    BusFault,
    /// Scratchpad CRC did not match.
    CrcMismatch,
    /// Reading is outside the physically plausible range.
    OutOfRange,
    /// No reading has been taken yet.
    NoReading,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdcReadFailed => write!(f, "ADC read failed"),
            Self::NoPresence => write!(f, "no one-wire presence pulse"),
            Self::BusFault => write!(f, "one-wire bus fault"),
            Self::CrcMismatch => write!(f, "scratchpad CRC mismatch"),
            Self::OutOfRange => write!(f, "reading out of range"),
            Self::NoReading => write!(f, "no reading yet"),
        }
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    WifiInitFailed,
    WifiScanFailed,
    WifiConnectFailed,
    InvalidCredentials,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WifiInitFailed => write!(f, "WiFi init failed"),
            Self::WifiScanFailed => write!(f, "WiFi scan failed"),
            Self::WifiConnectFailed => write!(f, "WiFi connect failed"),
            Self::InvalidCredentials => write!(f, "WiFi credentials invalid"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// `Result` alias for the boot path.
pub type Result<T> = core::result::Result<T, Error>;
