//! Command implementations for motorctl

pub mod list;
pub mod profiles;
pub mod read;
pub mod register;
pub mod run;
pub mod set;

use std::path::PathBuf;

use clap::{Args, Subcommand};
use motorlink_protocol::{DEFAULT_PROFILE, DeviceProfile, ProfileCatalog};

use crate::config::SessionConfig;
use crate::error::CliError;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List USB devices, marking the supported board
    List,

    /// Show the channel and parameter tables of the known profiles
    Profiles,

    /// Run the sample loop until Ctrl-C
    Run(RunArgs),

    /// Poll every channel once and print the reading
    Read,

    /// Write one parameter
    Set {
        /// Parameter name as listed by `motorctl profiles`
        name: String,
        /// New value, within the parameter's range
        value: i64,
    },

    /// Read an encoder register by address (decimal or 0x hex) or name
    Register {
        /// e.g. `angle`, `magnitude` or `0x3FFF`
        register: String,
    },
}

#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// CSV file to record to; without it nothing is written
    #[arg(short, long, conflicts_with = "auto_output")]
    pub output: Option<PathBuf>,

    /// Record to session_<date>_<time>.csv in the working directory
    #[arg(long)]
    pub auto_output: bool,

    /// Replace the output file if it exists
    #[arg(long)]
    pub force: bool,

    /// Readings per write
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Maximum ticks per second; 0 removes the cap
    #[arg(long)]
    pub rate: Option<f64>,

    /// Consecutive failed ticks before giving up; 0 never gives up
    #[arg(long)]
    pub max_dead_ticks: Option<u32>,

    /// Stop after this many ticks
    #[arg(long)]
    pub ticks: Option<u64>,

    /// YAML or JSON parameter file, re-read whenever it changes
    #[arg(long)]
    pub params: Option<PathBuf>,

    /// Fixed parameter value, repeatable
    #[arg(long = "param", value_name = "NAME=VALUE", value_parser = parse_param)]
    pub param: Vec<(String, i64)>,
}

/// Parse `name=value` for `--param`.
pub fn parse_param(s: &str) -> Result<(String, i64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing parameter name in '{s}'"));
    }
    let value = value
        .trim()
        .parse::<i64>()
        .map_err(|e| format!("invalid value in '{s}': {e}"))?;
    Ok((name.to_string(), value))
}

/// Options shared by every command.
pub struct Context {
    pub json: bool,
    pub simulate: bool,
    pub profile: Option<String>,
    pub timeout_ms: Option<u64>,
    pub config: SessionConfig,
}

impl Context {
    /// Profile from the command line, then the session file, then `fallback`.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Profile`] for an unknown name or invalid catalog.
    pub fn profile_or(&self, fallback: &str) -> Result<DeviceProfile, CliError> {
        let catalog = self.catalog()?;
        let name = self
            .profile
            .as_deref()
            .or(self.config.profile.as_deref())
            .unwrap_or(fallback);
        Ok(catalog.get(name)?.clone())
    }

    /// # Errors
    ///
    /// Same as [`Context::profile_or`].
    pub fn profile(&self) -> Result<DeviceProfile, CliError> {
        self.profile_or(DEFAULT_PROFILE)
    }

    /// # Errors
    ///
    /// Returns [`CliError::Profile`] if a catalog is invalid.
    pub fn catalog(&self) -> Result<ProfileCatalog, CliError> {
        self.config.catalog()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_param_accepts_name_value() {
        assert_eq!(parse_param("K_spring=3"), Ok(("K_spring".to_string(), 3)));
        assert_eq!(parse_param(" Mode = -1 "), Ok(("Mode".to_string(), -1)));
    }

    #[test]
    fn parse_param_rejects_malformed() {
        assert!(parse_param("K_spring").is_err());
        assert!(parse_param("=3").is_err());
        assert!(parse_param("K_spring=high").is_err());
    }

    fn context(profile: Option<&str>, config_profile: Option<&str>) -> Context {
        Context {
            json: false,
            simulate: true,
            profile: profile.map(str::to_string),
            timeout_ms: None,
            config: SessionConfig {
                profile: config_profile.map(str::to_string),
                ..SessionConfig::default()
            },
        }
    }

    #[test]
    fn profile_precedence() -> Result<(), CliError> {
        assert_eq!(context(None, None).profile()?.name, "joystick");
        assert_eq!(
            context(None, Some("current-test")).profile()?.name,
            "current-test"
        );
        assert_eq!(
            context(Some("control-test"), Some("current-test"))
                .profile()?
                .name,
            "control-test"
        );
        assert!(matches!(
            context(Some("nope"), None).profile(),
            Err(CliError::Profile(_))
        ));
        Ok(())
    }
}
