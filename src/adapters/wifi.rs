//! Wi-Fi station-mode adapter.
//!
//! Implements [`WifiRadio`] over the ESP-IDF Wi-Fi driver.  The
//! [`ConnectivityMonitor`](crate::net::ConnectivityMonitor) owns the
//! scan/associate/timeout policy; this adapter only translates calls.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `EspWifiRadio` over `esp_idf_svc::wifi::EspWifi`.
//! - **all targets**: SSID/passphrase validation applied before the driver sees them.
//!
//! `connect` starts association and returns immediately; the DHCP lease
//! arrives later and shows up through `is_connected`.

use core::fmt;

use crate::app::ports::RadioError;

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialError {
    InvalidSsid,
    InvalidPassword,
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)"),
        }
    }
}

impl From<CredentialError> for RadioError {
    fn from(_: CredentialError) -> Self {
        Self::InvalidCredentials
    }
}

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

pub fn validate_ssid(ssid: &str) -> Result<(), CredentialError> {
    if ssid.is_empty() || ssid.len() > 32 {
        return Err(CredentialError::InvalidSsid);
    }
    if !is_printable_ascii(ssid) {
        return Err(CredentialError::InvalidSsid);
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), CredentialError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(CredentialError::InvalidPassword);
    }
    Ok(())
}

/// True if `target` is one of the scanned SSIDs.
pub fn ssid_in_scan<'a>(ssids: impl IntoIterator<Item = &'a str>, target: &str) -> bool {
    ssids.into_iter().any(|s| s == target)
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF radio
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub use esp_impl::EspWifiRadio;

#[cfg(target_os = "espidf")]
mod esp_impl {
    use std::net::Ipv4Addr;

    use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi};
    use log::{debug, info, warn};

    use super::{ssid_in_scan, validate_password, validate_ssid};
    use crate::app::ports::{RadioError, WifiRadio};

    pub struct EspWifiRadio {
        wifi: EspWifi<'static>,
    }

    impl EspWifiRadio {
        /// Put the driver in station mode with an empty client config and
        /// start it, so the first scan can run immediately.
        pub fn new(mut wifi: EspWifi<'static>, hostname: &str) -> Result<Self, RadioError> {
            if !hostname.is_empty() {
                if let Err(e) = wifi.sta_netif_mut().set_hostname(hostname) {
                    warn!("WiFi: set_hostname('{}') failed: {}", hostname, e);
                }
            }
            wifi.set_configuration(&Configuration::Client(ClientConfiguration::default()))
                .map_err(|_| RadioError::InitFailed)?;
            wifi.start().map_err(|_| RadioError::InitFailed)?;
            info!("WiFi: STA started");
            Ok(Self { wifi })
        }
    }

    impl WifiRadio for EspWifiRadio {
        fn scan_for(&mut self, ssid: &str) -> Result<bool, RadioError> {
            let aps = self.wifi.scan().map_err(|e| {
                warn!("WiFi: scan failed: {}", e);
                RadioError::ScanFailed
            })?;
            debug!("WiFi: scan saw {} access points", aps.len());
            Ok(ssid_in_scan(aps.iter().map(|ap| ap.ssid.as_str()), ssid))
        }

        fn connect(&mut self, ssid: &str, password: &str) -> Result<(), RadioError> {
            validate_ssid(ssid)?;
            validate_password(password)?;
            let auth_method = if password.is_empty() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            };
            let client = ClientConfiguration {
                ssid: ssid.try_into().map_err(|_| RadioError::InvalidCredentials)?,
                password: password.try_into().map_err(|_| RadioError::InvalidCredentials)?,
                auth_method,
                ..Default::default()
            };
            self.wifi
                .set_configuration(&Configuration::Client(client))
                .map_err(|_| RadioError::ConnectFailed)?;
            self.wifi.connect().map_err(|e| {
                warn!("WiFi: connect to '{}' refused: {}", ssid, e);
                RadioError::ConnectFailed
            })
        }

        fn disconnect(&mut self) -> Result<(), RadioError> {
            self.wifi.disconnect().map_err(|_| RadioError::DisconnectFailed)
        }

        fn is_connected(&self) -> bool {
            self.wifi.is_connected().unwrap_or(false) && self.ip_address().is_some()
        }

        fn ip_address(&self) -> Option<Ipv4Addr> {
            let info = self.wifi.sta_netif().get_ip_info().ok()?;
            (!info.ip.is_unspecified()).then_some(info.ip)
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
