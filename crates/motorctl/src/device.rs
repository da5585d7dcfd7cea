//! Opening the device channel, real or simulated.

use motorlink_protocol::{DeviceProfile, as5048a};
use motorlink_transport::mock::MockTransport;
use motorlink_transport::{ControlChannel, ControlTransport, UsbOptions, UsbTransport};
use tracing::info;

use crate::error::CliError;

pub type DeviceChannel = ControlChannel<Box<dyn ControlTransport>>;

/// Open the USB device, or a simulated one that answers every channel and
/// encoder register of `profile` with zeros.
///
/// # Errors
///
/// Returns [`CliError::Discovery`] if the device cannot be opened.
pub fn open_channel(
    options: &UsbOptions,
    simulate: bool,
    profile: &DeviceProfile,
) -> Result<DeviceChannel, CliError> {
    let transport: Box<dyn ControlTransport> = if simulate {
        info!("Using simulated device for profile '{}'", profile.name);
        Box::new(simulated(profile))
    } else {
        Box::new(UsbTransport::open(options)?)
    };
    Ok(ControlChannel::new(transport))
}

fn simulated(profile: &DeviceProfile) -> MockTransport {
    let mock = MockTransport::new();
    for ch in &profile.channels {
        mock.set_register_response(ch.request.0, ch.value, vec![0; ch.length]);
    }
    if let Some(request) = profile.register_read {
        for (_, address) in as5048a::registers() {
            mock.set_register_response(request.0, address, vec![0; 2]);
        }
    }
    mock
}
