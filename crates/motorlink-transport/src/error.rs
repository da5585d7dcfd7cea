//! Transport and discovery error types.

use thiserror::Error;

/// A single control transaction failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Control transfer timed out")]
    Timeout,

    #[error("Control transfer stalled")]
    Stall,

    #[error("Device disconnected")]
    Disconnected,

    #[error("Short transfer: expected {expected} bytes, got {actual}")]
    ShortTransfer { expected: usize, actual: usize },

    #[error("Transfer error: {0}")]
    Io(String),
}

pub type TransportResult<T> = Result<T, TransportError>;

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::TimedOut => TransportError::Timeout,
            std::io::ErrorKind::NotConnected | std::io::ErrorKind::BrokenPipe => {
                TransportError::Disconnected
            }
            _ => TransportError::Io(e.to_string()),
        }
    }
}

/// The device could not be found or prepared at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    #[error("No USB device matching VID=0x{vendor_id:04X} PID=0x{product_id:04X}")]
    DeviceNotFound { vendor_id: u16, product_id: u16 },

    #[error("Failed to enumerate USB devices: {0}")]
    Enumerate(String),

    #[error("Failed to open device: {0}")]
    Open(String),

    #[error("Failed to select configuration {configuration}: {reason}")]
    Configure { configuration: u8, reason: String },

    #[error("Failed to claim interface {interface}: {reason}")]
    Claim { interface: u8, reason: String },
}
