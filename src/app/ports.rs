//! Port traits: the hexagonal boundary between the control core and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControlLoop / ConnectivityMonitor / Reporter
//! ```
//!
//! Drivers (display, probe, ADC, button), the radio, the socket layer and
//! the event sink implement these traits.  The core consumes them through
//! generics, so every state machine in this crate runs on the host against
//! mocks.

use std::net::Ipv4Addr;

use crate::config::{ConfigError, NodeConfig};
use crate::error::SensorError;

// ───────────────────────────────────────────────────────────────
// Display port (domain → character LCD or framebuffer OLED)
// ───────────────────────────────────────────────────────────────

/// Text display addressed by row and column.
///
/// Both the nibble-pushed character LCD and the SSD1306 framebuffer
/// implement this, so the control loop is protocol-agnostic.  Bus errors
/// are logged by the driver and swallowed; a dead display must never stop
/// the loop.
pub trait DisplayPort {
    fn clear(&mut self);

    /// Write `text` starting at (`row`, `col`).  Text past the right edge is
    /// truncated.
    fn write(&mut self, row: u8, col: u8, text: &str);

    /// Backlight (LCD) or panel power (OLED).
    fn set_power(&mut self, on: bool);

    fn is_powered(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Sensor ports (hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Slow temperature probe with a separate conversion step.
pub trait TemperaturePort {
    /// Kick off a conversion.  Fire-and-forget; the result is ready after the
    /// probe's settle time.
    fn start_conversion(&mut self);

    /// Degrees Celsius.  `last_only` returns the cached last good reading
    /// without touching the bus.  An implausible raw value is retried once
    /// internally; [`SensorError::OutOfRange`] means the retry failed too.
    fn read_temperature(&mut self, last_only: bool) -> Result<f32, SensorError>;
}

/// Line pressure in psi.
pub trait PressurePort {
    /// `clip` clamps the result to the transducer's calibrated range.
    fn read_pressure(&mut self, clip: bool) -> Result<f32, SensorError>;
}

/// Display-wake push button.
pub trait ButtonPort {
    /// True exactly once per press (edge, not level).
    fn was_pressed(&mut self) -> bool;
}

/// Everything the control loop needs from the board, as one bound.
pub trait NodeHardware: DisplayPort + TemperaturePort + PressurePort + ButtonPort {}

impl<T: DisplayPort + TemperaturePort + PressurePort + ButtonPort> NodeHardware for T {}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic seconds plus a blocking sleep.
///
/// Sleeping suspends the whole main context.  The flow ISR keeps counting.
pub trait Clock {
    fn now_secs(&self) -> u64;
    fn sleep_ms(&mut self, ms: u32);
}

// ───────────────────────────────────────────────────────────────
// Network ports
// ───────────────────────────────────────────────────────────────

/// Station-mode Wi-Fi radio.
pub trait WifiRadio {
    /// Scan and report whether `ssid` is among the access points in range.
    /// Every scan record is checked, however crowded the band is.
    fn scan_for(&mut self, ssid: &str) -> Result<bool, RadioError>;

    /// Start associating.  Must not block until an address is acquired.
    fn connect(&mut self, ssid: &str, password: &str) -> Result<(), RadioError>;

    fn disconnect(&mut self) -> Result<(), RadioError>;

    /// Associated *and* holding an IPv4 address.
    fn is_connected(&self) -> bool;

    fn ip_address(&self) -> Option<Ipv4Addr>;
}

/// Opens one TCP stream to the collector.
pub trait HttpTransport {
    type Socket: HttpSocket;

    /// Resolve `host` and allocate a socket.  Failure here maps to `er1`.
    fn open(&mut self, host: &str, port: u16) -> Result<Self::Socket, TransportError>;
}

/// One request/response exchange on an opened socket.
pub trait HttpSocket {
    /// Connect and write the whole request.  Failure maps to `er2`.
    fn connect_and_send(&mut self, request: &[u8]) -> Result<(), TransportError>;

    /// Read at most `buf.len()` bytes.  Failure maps to `er3`.
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Release the socket.  Called exactly once, whatever happened before.
    fn close(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port
// ───────────────────────────────────────────────────────────────

/// Loads the node configuration once at boot.
///
/// Implementations MUST return only validated configs; see
/// [`NodeConfig::validate`].
pub trait ConfigPort {
    fn load(&self) -> Result<NodeConfig, ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`WifiRadio`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioError {
    /// The driver could not be configured or started.
    InitFailed,
    /// The driver rejected the scan (busy, not started).
    ScanFailed,
    /// SSID or passphrase would not fit the driver's configuration.
    InvalidCredentials,
    /// The driver refused to start associating.
    ConnectFailed,
    /// The driver refused to drop the association.
    DisconnectFailed,
}

/// Errors from [`HttpTransport`] and [`HttpSocket`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// Host name did not resolve.
    Resolve,
    /// TCP connect refused or timed out.
    Connect,
    /// Write failed or timed out.
    Send,
    /// Read failed or timed out.
    Receive,
}

impl core::fmt::Display for RadioError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InitFailed => write!(f, "init failed"),
            Self::ScanFailed => write!(f, "scan failed"),
            Self::InvalidCredentials => write!(f, "invalid credentials"),
            Self::ConnectFailed => write!(f, "connect failed"),
            Self::DisconnectFailed => write!(f, "disconnect failed"),
        }
    }
}

impl core::fmt::Display for TransportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Resolve => write!(f, "host did not resolve"),
            Self::Connect => write!(f, "connect failed"),
            Self::Send => write!(f, "send failed"),
            Self::Receive => write!(f, "receive failed"),
        }
    }
}

impl From<RadioError> for crate::error::CommsError {
    fn from(e: RadioError) -> Self {
        match e {
            RadioError::InitFailed => Self::WifiInitFailed,
            RadioError::ScanFailed => Self::WifiScanFailed,
            RadioError::InvalidCredentials => Self::InvalidCredentials,
            RadioError::ConnectFailed | RadioError::DisconnectFailed => Self::WifiConnectFailed,
        }
    }
}

impl From<RadioError> for crate::error::Error {
    fn from(e: RadioError) -> Self {
        Self::Comms(e.into())
    }
}
