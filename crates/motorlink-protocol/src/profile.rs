//! Device profiles: the channel and parameter tables of one firmware build.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::channel::{Channel, RequestCode};
use crate::error::{ProtocolError, ProtocolResult};

pub const BUILTIN_PROFILES_YAML: &str = include_str!("profiles.yaml");

/// Profile used when none is selected.
pub const DEFAULT_PROFILE: &str = "joystick";

/// A field computed from other channels of the same tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DerivedField {
    /// `speed * direction_sign(direction)`, with the sign flipped when
    /// `zero_is_positive` is false.
    SignedSpeed {
        name: String,
        speed: String,
        direction: String,
        /// Firmware polarity of the direction flag.
        #[serde(default = "default_zero_is_positive")]
        zero_is_positive: bool,
    },
}

fn default_zero_is_positive() -> bool {
    true
}

impl DerivedField {
    pub fn name(&self) -> &str {
        match self {
            DerivedField::SignedSpeed { name, .. } => name,
        }
    }

    /// Channels this field reads from.
    pub fn inputs(&self) -> Vec<&str> {
        match self {
            DerivedField::SignedSpeed {
                speed, direction, ..
            } => vec![speed.as_str(), direction.as_str()],
        }
    }
}

/// A tunable parameter slot on the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    /// Fixed slot id carried in the high byte of the write.
    pub index: u8,
    #[serde(default)]
    pub initial: u8,
    /// Largest value the control surface may select.
    #[serde(default = "default_parameter_max")]
    pub max: u8,
}

fn default_parameter_max() -> u8 {
    u8::MAX
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Request code for parameter writes; required when parameters exist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_parameter: Option<RequestCode>,
    /// Request code for encoder register reads, if the firmware has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub register_read: Option<RequestCode>,
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub derived: Vec<DerivedField>,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
}

impl DeviceProfile {
    /// Check the whole table before any transfer is issued.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidChannel`] for a bad channel entry and
    /// [`ProtocolError::InvalidProfile`] for duplicate names, dangling derived
    /// inputs, or inconsistent parameter slots.
    pub fn validate(&self) -> ProtocolResult<()> {
        let invalid = |reason: String| ProtocolError::InvalidProfile {
            profile: self.name.clone(),
            reason,
        };

        if self.channels.is_empty() {
            return Err(invalid("profile has no channels".to_string()));
        }

        let mut names = HashSet::new();
        for channel in &self.channels {
            channel.validate()?;
            if !names.insert(channel.name.as_str()) {
                return Err(invalid(format!("duplicate field '{}'", channel.name)));
            }
        }

        for field in &self.derived {
            for input in field.inputs() {
                if self.channel(input).is_none() {
                    return Err(invalid(format!(
                        "derived field '{}' reads unknown channel '{input}'",
                        field.name()
                    )));
                }
            }
            if !names.insert(field.name()) {
                return Err(invalid(format!("duplicate field '{}'", field.name())));
            }
        }

        if !self.parameters.is_empty() && self.set_parameter.is_none() {
            return Err(invalid(
                "parameters declared without a set_parameter request".to_string(),
            ));
        }
        let mut slots = HashSet::new();
        let mut param_names = HashSet::new();
        for param in &self.parameters {
            if !slots.insert(param.index) {
                return Err(invalid(format!("duplicate parameter index {}", param.index)));
            }
            if !param_names.insert(param.name.as_str()) {
                return Err(invalid(format!("duplicate parameter '{}'", param.name)));
            }
            if param.initial > param.max {
                return Err(invalid(format!(
                    "parameter '{}' initial {} exceeds max {}",
                    param.name, param.initial, param.max
                )));
            }
        }

        Ok(())
    }

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.name == name)
    }

    /// Names of the recorded fields, in declared order: visible channels
    /// first, then derived fields.
    pub fn field_names(&self) -> Vec<String> {
        self.channels
            .iter()
            .filter(|c| !c.hidden)
            .map(|c| c.name.clone())
            .chain(self.derived.iter().map(|d| d.name().to_string()))
            .collect()
    }
}

/// The set of profiles available to the driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileCatalog {
    pub profiles: Vec<DeviceProfile>,
}

impl ProfileCatalog {
    /// Parse and validate a catalog document.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::ProfileParse`] for malformed YAML and the
    /// validation errors of [`DeviceProfile::validate`].
    pub fn from_yaml(source: &str) -> ProtocolResult<Self> {
        let catalog: ProfileCatalog = serde_yaml::from_str(source)?;
        let mut seen = HashSet::new();
        for profile in &catalog.profiles {
            profile.validate()?;
            if !seen.insert(profile.name.as_str()) {
                return Err(ProtocolError::InvalidProfile {
                    profile: profile.name.clone(),
                    reason: "defined twice".to_string(),
                });
            }
        }
        debug!("Loaded {} device profile(s)", catalog.profiles.len());
        Ok(catalog)
    }

    /// # Errors
    ///
    /// Returns [`ProtocolError::UnknownProfile`] when no profile has `name`.
    pub fn get(&self, name: &str) -> ProtocolResult<&DeviceProfile> {
        self.profiles
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ProtocolError::UnknownProfile(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.iter().map(|p| p.name.as_str())
    }

    /// Add or replace profiles from another catalog, keyed by name.
    pub fn merge(&mut self, other: ProfileCatalog) {
        for profile in other.profiles {
            match self.profiles.iter_mut().find(|p| p.name == profile.name) {
                Some(existing) => *existing = profile,
                None => self.profiles.push(profile),
            }
        }
    }
}

/// Load the profiles compiled into the crate.
///
/// # Errors
///
/// Only fails if the embedded table is broken.
pub fn load_builtin_profiles() -> ProtocolResult<ProfileCatalog> {
    ProfileCatalog::from_yaml(BUILTIN_PROFILES_YAML)
}
