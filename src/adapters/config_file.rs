//! JSON config file adapter.
//!
//! Implements [`ConfigPort`] by reading `config.json` from the VFS.
//!
//! - **`target_os = "espidf"`**: the SPIFFS data partition is mounted at
//!   [`MOUNT_POINT`] first; the file lives at `/spiffs/config.json`.
//! - **all other targets**: any path on the host filesystem.
//!
//! Only validated configurations leave this adapter.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::app::ports::ConfigPort;
use crate::config::{ConfigError, NodeConfig};

pub const MOUNT_POINT: &str = "/spiffs";
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Largest config document accepted.
const MAX_CONFIG_BYTES: u64 = 4096;

pub struct JsonFileConfig {
    path: PathBuf,
}

impl JsonFileConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `config.json` on the mounted data partition.
    pub fn on_flash() -> Self {
        Self::new(Path::new(MOUNT_POINT).join(CONFIG_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigPort for JsonFileConfig {
    fn load(&self) -> Result<NodeConfig, ConfigError> {
        let meta = std::fs::metadata(&self.path).map_err(|e| map_io(&e))?;
        if meta.len() > MAX_CONFIG_BYTES {
            warn!("Config: {} is {} bytes, refusing", self.path.display(), meta.len());
            return Err(ConfigError::Corrupted);
        }
        let text = std::fs::read_to_string(&self.path).map_err(|e| map_io(&e))?;
        let cfg = NodeConfig::from_json(&text)?;
        info!("Config: loaded {} (ssid='{}')", self.path.display(), cfg.ssid);
        Ok(cfg)
    }
}

fn map_io(e: &std::io::Error) -> ConfigError {
    match e.kind() {
        ErrorKind::NotFound => ConfigError::NotFound,
        ErrorKind::InvalidData => ConfigError::Corrupted,
        _ => ConfigError::IoError,
    }
}

/// Register the SPIFFS partition with the VFS at [`MOUNT_POINT`].
#[cfg(target_os = "espidf")]
pub fn mount_storage() -> Result<(), ConfigError> {
    use esp_idf_svc::sys::*;

    let conf = esp_vfs_spiffs_conf_t {
        base_path: c"/spiffs".as_ptr(),
        partition_label: core::ptr::null(),
        max_files: 4,
        format_if_mount_failed: false,
    };
    // SAFETY: called once from main() before any file access; `conf` and
    // the path literal outlive the call.
    let ret = unsafe { esp_vfs_spiffs_register(&conf) };
    if ret != ESP_OK as i32 {
        warn!("Config: SPIFFS mount failed (rc={})", ret);
        return Err(ConfigError::IoError);
    }
    info!("Config: SPIFFS mounted at {}", MOUNT_POINT);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn mount_storage() -> Result<(), ConfigError> {
    Ok(())
}

/// Mount the data partition, then load and validate the configuration.
pub fn load_boot_config(source: &impl ConfigPort) -> crate::error::Result<NodeConfig> {
    mount_storage()?;
    Ok(source.load()?)
}
