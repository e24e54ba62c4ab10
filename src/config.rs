//! Node configuration.
//!
//! Loaded once at boot from `config.json` on the VFS and immutable after
//! that.  The JSON keys for the site-specific values match the deployed
//! configuration files (`hostname`, `ssid`, `pwd`, `api_key`, `1wire_addr1`);
//! everything else is optional and falls back to [`NodeConfig::default`].

use core::fmt;

use heapless::String;
use serde::{Deserialize, Serialize};

/// Default collector endpoint (ThingSpeak channel update API).
pub const DEFAULT_REPORT_URL: &str = "http://api.thingspeak.com/update";

/// Core node configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    // --- Identity / network ---
    /// DHCP hostname, also shown on the intro screen.
    pub hostname: String<32>,
    /// Target access point SSID.
    pub ssid: String<32>,
    /// WPA2 passphrase (empty for open networks).
    #[serde(rename = "pwd")]
    pub password: String<64>,
    /// Collector write API key.
    pub api_key: String<32>,
    /// Collector base URL; the query string is appended by the reporter.
    pub report_url: String<128>,

    // --- Sensors ---
    /// DS18B20 ROM code (family byte first, CRC byte last).
    #[serde(rename = "1wire_addr1")]
    pub sensor_address: [u8; 8],

    // --- Report cycle ---
    /// Seconds between reports.
    pub report_interval_secs: u32,
    /// Delay before the first report after boot.
    pub first_report_delay_secs: u32,
    /// Delay before the first report after a reconnect.
    pub reconnect_report_delay_secs: u32,
    /// Delay before the next attempt when a report found no connection.
    pub retry_delay_secs: u32,
    /// Start the temperature conversion this many seconds before a report.
    pub pre_conversion_lead_secs: u32,
    /// Time the DS18B20 needs after CONVERT T (milliseconds).
    pub conversion_settle_ms: u32,

    // --- Connectivity ---
    /// Minimum seconds between access-point scans.
    pub scan_interval_secs: u32,
    /// Give up on an association that has not produced an address.
    pub connect_timeout_secs: u32,
    /// How long boot waits for the first connection.
    pub startup_connect_timeout_secs: u32,
    /// Socket connect/send/receive timeout.
    pub socket_timeout_secs: u32,

    // --- Display ---
    /// Display stays on this long after a button press.
    pub display_timeout_secs: u32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let mut report_url = String::new();
        // DEFAULT_REPORT_URL is well under the 128-byte capacity.
        let _ = report_url.push_str(DEFAULT_REPORT_URL);

        Self {
            hostname: String::new(),
            ssid: String::new(),
            password: String::new(),
            api_key: String::new(),
            report_url,

            sensor_address: [0; 8],

            report_interval_secs: 360, // 6 min
            first_report_delay_secs: 10,
            reconnect_report_delay_secs: 10,
            retry_delay_secs: 30,
            pre_conversion_lead_secs: 30,
            conversion_settle_ms: 750,

            scan_interval_secs: 15,
            connect_timeout_secs: 60,
            startup_connect_timeout_secs: 60,
            socket_timeout_secs: 20,

            display_timeout_secs: 60,
        }
    }
}

impl NodeConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(json).map_err(|_| ConfigError::Corrupted)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ssid.is_empty() {
            return Err(ConfigError::ValidationFailed("ssid must not be empty"));
        }
        if !self.password.is_empty() && self.password.len() < 8 {
            return Err(ConfigError::ValidationFailed(
                "pwd must be empty (open) or 8-64 bytes",
            ));
        }
        if self.api_key.is_empty() {
            return Err(ConfigError::ValidationFailed("api_key must not be empty"));
        }
        if !self.report_url.starts_with("http://") {
            return Err(ConfigError::ValidationFailed(
                "report_url must be a plain http:// URL",
            ));
        }
        if self.report_interval_secs == 0 {
            return Err(ConfigError::ValidationFailed("report_interval_secs must be > 0"));
        }
        if self.pre_conversion_lead_secs >= self.report_interval_secs {
            return Err(ConfigError::ValidationFailed(
                "pre_conversion_lead_secs must be below report_interval_secs",
            ));
        }
        if self.retry_delay_secs == 0 || self.retry_delay_secs > self.report_interval_secs {
            return Err(ConfigError::ValidationFailed(
                "retry_delay_secs must be 1..=report_interval_secs",
            ));
        }
        if self.scan_interval_secs == 0 {
            return Err(ConfigError::ValidationFailed("scan_interval_secs must be > 0"));
        }
        if self.socket_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed("socket_timeout_secs must be > 0"));
        }
        Ok(())
    }
}

/// Errors from [`ConfigPort`](crate::app::ports::ConfigPort) operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config file on the filesystem.
    NotFound,
    /// The document is not valid JSON or a field has the wrong type/length.
    Corrupted,
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// Generic I/O error from the filesystem.
    IoError,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl From<ConfigError> for crate::error::Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::ValidationFailed(msg) => Self::Config(msg),
            ConfigError::NotFound => Self::Config("config not found"),
            ConfigError::Corrupted => Self::Config("config corrupted"),
            ConfigError::IoError => Self::Config("config I/O error"),
        }
    }
}
