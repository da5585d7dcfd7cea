//! USB backend over `nusb`'s blocking control transfers.

use std::time::Duration;

use motorlink_protocol::{DEFAULT_CONFIGURATION, DEFAULT_INTERFACE, PRODUCT_ID, VENDOR_ID};
use nusb::transfer::{Control, ControlType, Recipient, TransferError};
use tracing::{debug, info};

use crate::error::{DiscoveryError, TransportError, TransportResult};
use crate::transport::{ControlSetup, ControlTransport};

/// How to find and prepare the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsbOptions {
    pub vendor_id: u16,
    pub product_id: u16,
    pub configuration: u8,
    pub interface: u8,
    /// Upper bound on one control transfer.
    pub timeout: Duration,
}

impl Default for UsbOptions {
    fn default() -> Self {
        Self {
            vendor_id: VENDOR_ID,
            product_id: PRODUCT_ID,
            configuration: DEFAULT_CONFIGURATION,
            interface: DEFAULT_INTERFACE,
            timeout: Duration::from_secs(1),
        }
    }
}

/// Summary of an enumerated USB device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbDeviceInfo {
    pub vendor_id: u16,
    pub product_id: u16,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial: Option<String>,
}

impl UsbDeviceInfo {
    pub fn matches(&self, options: &UsbOptions) -> bool {
        self.vendor_id == options.vendor_id && self.product_id == options.product_id
    }
}

/// List every USB device visible to the host.
///
/// # Errors
///
/// Returns [`DiscoveryError::Enumerate`] if the platform refuses enumeration.
pub fn list_devices() -> Result<Vec<UsbDeviceInfo>, DiscoveryError> {
    let devices = nusb::list_devices().map_err(|e| DiscoveryError::Enumerate(e.to_string()))?;
    Ok(devices
        .map(|d| UsbDeviceInfo {
            vendor_id: d.vendor_id(),
            product_id: d.product_id(),
            manufacturer: d.manufacturer_string().map(str::to_string),
            product: d.product_string().map(str::to_string),
            serial: d.serial_number().map(str::to_string),
        })
        .collect())
}

/// A claimed interface on the peripheral.
pub struct UsbTransport {
    interface: nusb::Interface,
    timeout: Duration,
}

impl UsbTransport {
    /// Find the first device matching `options`, select its configuration
    /// and claim the interface.
    ///
    /// # Errors
    ///
    /// Returns a [`DiscoveryError`] naming the step that failed.
    pub fn open(options: &UsbOptions) -> Result<Self, DiscoveryError> {
        let info = nusb::list_devices()
            .map_err(|e| DiscoveryError::Enumerate(e.to_string()))?
            .find(|d| d.vendor_id() == options.vendor_id && d.product_id() == options.product_id)
            .ok_or(DiscoveryError::DeviceNotFound {
                vendor_id: options.vendor_id,
                product_id: options.product_id,
            })?;

        let device = info.open().map_err(|e| DiscoveryError::Open(e.to_string()))?;

        let already_active = device
            .active_configuration()
            .map(|c| c.configuration_value() == options.configuration)
            .unwrap_or(false);
        if already_active {
            debug!("Configuration {} already active", options.configuration);
        } else {
            device
                .set_configuration(options.configuration)
                .map_err(|e| DiscoveryError::Configure {
                    configuration: options.configuration,
                    reason: e.to_string(),
                })?;
        }

        let interface =
            device
                .claim_interface(options.interface)
                .map_err(|e| DiscoveryError::Claim {
                    interface: options.interface,
                    reason: e.to_string(),
                })?;

        info!(
            "Opened device {:04X}:{:04X} ({}), interface {}",
            options.vendor_id,
            options.product_id,
            info.product_string().unwrap_or("unnamed"),
            options.interface
        );

        Ok(Self {
            interface,
            timeout: options.timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

fn vendor_control(setup: ControlSetup) -> Control {
    Control {
        control_type: ControlType::Vendor,
        recipient: Recipient::Device,
        request: setup.request.0,
        value: setup.value,
        index: setup.index,
    }
}

fn map_transfer_error(error: TransferError) -> TransportError {
    match error {
        TransferError::Cancelled => TransportError::Timeout,
        TransferError::Stall => TransportError::Stall,
        TransferError::Disconnected => TransportError::Disconnected,
        other => TransportError::Io(other.to_string()),
    }
}

impl ControlTransport for UsbTransport {
    fn control_in(&mut self, setup: ControlSetup, length: usize) -> TransportResult<Vec<u8>> {
        let mut buf = vec![0u8; length];
        let n = self
            .interface
            .control_in_blocking(vendor_control(setup), &mut buf, self.timeout)
            .map_err(map_transfer_error)?;
        buf.truncate(n);
        Ok(buf)
    }

    fn control_out(&mut self, setup: ControlSetup, data: &[u8]) -> TransportResult<()> {
        self.interface
            .control_out_blocking(vendor_control(setup), data, self.timeout)
            .map_err(map_transfer_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motorlink_protocol::RequestCode;

    #[test]
    fn test_default_options_target_board() {
        let options = UsbOptions::default();
        assert_eq!(options.vendor_id, 0x6666);
        assert_eq!(options.product_id, 0x0003);
        assert_eq!(options.configuration, 1);
        assert_eq!(options.interface, 0);
        assert_eq!(options.timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_vendor_control_fields() {
        let control = vendor_control(ControlSetup::new(RequestCode(6), 0x0302, 7));
        assert_eq!(control.request, 6);
        assert_eq!(control.value, 0x0302);
        assert_eq!(control.index, 7);
    }

    #[test]
    fn test_transfer_error_mapping() {
        assert_eq!(
            map_transfer_error(TransferError::Cancelled),
            TransportError::Timeout
        );
        assert_eq!(map_transfer_error(TransferError::Stall), TransportError::Stall);
        assert_eq!(
            map_transfer_error(TransferError::Disconnected),
            TransportError::Disconnected
        );
        assert!(matches!(
            map_transfer_error(TransferError::Fault),
            TransportError::Io(_)
        ));
    }

    #[test]
    fn test_device_info_matches() {
        let info = UsbDeviceInfo {
            vendor_id: 0x6666,
            product_id: 0x0003,
            manufacturer: None,
            product: None,
            serial: None,
        };
        assert!(info.matches(&UsbOptions::default()));
        let other = UsbDeviceInfo {
            product_id: 0x0004,
            ..info
        };
        assert!(!other.matches(&UsbOptions::default()));
    }
}
