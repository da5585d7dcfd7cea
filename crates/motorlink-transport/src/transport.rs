//! The boundary the core needs from the bus: typed vendor control requests.

use motorlink_protocol::RequestCode;

use crate::error::TransportResult;

/// Setup fields of a vendor request addressed to the device.
///
/// The direction and request type are implied by the call
/// ([`ControlTransport::control_in`] or [`ControlTransport::control_out`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlSetup {
    pub request: RequestCode,
    pub value: u16,
    pub index: u16,
}

impl ControlSetup {
    pub fn new(request: RequestCode, value: u16, index: u16) -> Self {
        Self {
            request,
            value,
            index,
        }
    }
}

/// A claimed device handle able to issue vendor control transfers.
///
/// Implementations perform one bus transaction per call and must not retry.
pub trait ControlTransport: Send {
    /// Device-to-host transfer of up to `length` bytes.
    fn control_in(&mut self, setup: ControlSetup, length: usize) -> TransportResult<Vec<u8>>;

    /// Host-to-device transfer with an optional data stage.
    fn control_out(&mut self, setup: ControlSetup, data: &[u8]) -> TransportResult<()>;
}

impl<T: ControlTransport + ?Sized> ControlTransport for Box<T> {
    fn control_in(&mut self, setup: ControlSetup, length: usize) -> TransportResult<Vec<u8>> {
        (**self).control_in(setup, length)
    }

    fn control_out(&mut self, setup: ControlSetup, data: &[u8]) -> TransportResult<()> {
        (**self).control_out(setup, data)
    }
}
