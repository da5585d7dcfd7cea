//! Optional `motorctl.yaml` session file.
//!
//! Every key is optional. Command-line flags win over file values, and file
//! values win over built-in defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use motorlink_protocol::{ProfileCatalog, load_builtin_profiles};
use motorlink_transport::UsbOptions;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CliError;

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "motorctl.yaml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub profile: Option<String>,
    /// Extra profile catalog merged over the built-in one.
    pub profiles_file: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub batch_size: Option<usize>,
    pub rate_hz: Option<f64>,
    pub max_dead_ticks: Option<u32>,
    pub timeout_ms: Option<u64>,
    /// Parameter file watched for changes during `run`.
    pub params_file: Option<PathBuf>,
    /// Fixed parameter values.
    pub parameters: BTreeMap<String, i64>,
    pub usb: UsbConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UsbConfig {
    pub vendor_id: Option<u16>,
    pub product_id: Option<u16>,
    pub configuration: Option<u8>,
    pub interface: Option<u8>,
}

impl SessionConfig {
    /// Parse a session file.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::IoError`] if the file cannot be read and
    /// [`CliError::InvalidConfiguration`] if it does not parse.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&text)
            .map_err(|e| CliError::InvalidConfiguration(format!("{}: {e}", path.display())))?;
        debug!("Loaded session config from {}", path.display());
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns the parser error for malformed or unknown keys.
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    /// Load `explicit` if given, otherwise `motorctl.yaml` from the working
    /// directory when present, otherwise defaults.
    ///
    /// # Errors
    ///
    /// Same as [`SessionConfig::load`].
    pub fn discover(explicit: Option<&Path>) -> Result<Self, CliError> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::load(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Built-in profiles plus any from `profiles_file`.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Profile`] if a catalog is invalid.
    pub fn catalog(&self) -> Result<ProfileCatalog, CliError> {
        let mut catalog = load_builtin_profiles()?;
        if let Some(path) = &self.profiles_file {
            let text = std::fs::read_to_string(path)?;
            catalog.merge(ProfileCatalog::from_yaml(&text)?);
        }
        Ok(catalog)
    }

    /// USB options with `timeout_override` taking precedence over the file.
    pub fn usb_options(&self, timeout_override: Option<u64>) -> UsbOptions {
        let defaults = UsbOptions::default();
        UsbOptions {
            vendor_id: self.usb.vendor_id.unwrap_or(defaults.vendor_id),
            product_id: self.usb.product_id.unwrap_or(defaults.product_id),
            configuration: self.usb.configuration.unwrap_or(defaults.configuration),
            interface: self.usb.interface.unwrap_or(defaults.interface),
            timeout: timeout_override
                .or(self.timeout_ms)
                .map_or(defaults.timeout, std::time::Duration::from_millis),
        }
    }
}
