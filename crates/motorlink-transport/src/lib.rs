//! Control-transfer transport for motorlink peripherals.
//!
//! The device exposes no bulk or interrupt endpoints, so every exchange is a
//! vendor control request. [`ControlChannel`] performs exactly one request per
//! call and never retries; what a failed transaction means is decided by the
//! caller.

#![deny(static_mut_refs)]

pub mod channel;
pub mod error;
pub mod mock;
pub mod transport;
#[cfg(feature = "usb")]
pub mod usb;

pub use channel::{ChannelStats, ControlChannel, RawPayload};
pub use error::{DiscoveryError, TransportError, TransportResult};
pub use transport::{ControlSetup, ControlTransport};
#[cfg(feature = "usb")]
pub use usb::{UsbDeviceInfo, UsbOptions, UsbTransport, list_devices};
