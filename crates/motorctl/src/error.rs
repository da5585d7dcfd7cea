//! Error types for motorctl

use std::path::PathBuf;

use motorlink_engine::LoopError;
use motorlink_protocol::ProtocolError;
use motorlink_transport::{DiscoveryError, TransportError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error(transparent)]
    Profile(#[from] ProtocolError),

    #[error("Output file {} already exists; pass --force to replace it", .0.display())]
    OutputExists(PathBuf),

    #[error("Transfer failed: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Session(#[from] LoopError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

impl CliError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Discovery(DiscoveryError::DeviceNotFound { .. }) => 2,
            CliError::InvalidConfiguration(_)
            | CliError::Profile(_)
            | CliError::OutputExists(_)
            | CliError::YamlError(_)
            | CliError::Session(LoopError::Profile(_)) => 3,
            CliError::Session(LoopError::DeviceUnresponsive { .. }) => 4,
            _ => 1,
        }
    }
}
