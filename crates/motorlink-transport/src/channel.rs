//! Request/response channel over a claimed control-transfer handle.

use motorlink_protocol::RequestCode;
use tracing::{debug, trace};

use crate::error::{TransportError, TransportResult};
use crate::transport::{ControlSetup, ControlTransport};

/// Bytes returned by one device-to-host transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPayload(Vec<u8>);

impl RawPayload {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for RawPayload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for RawPayload {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Transaction counters since the channel was opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    pub reads: u64,
    pub writes: u64,
    pub failures: u64,
}

/// Owns the transport handle and issues one transaction per call.
pub struct ControlChannel<T: ControlTransport> {
    transport: T,
    stats: ChannelStats,
}

impl<T: ControlTransport> ControlChannel<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            stats: ChannelStats::default(),
        }
    }

    /// Read `expected_len` bytes with the given request code and index.
    ///
    /// # Errors
    ///
    /// Returns the transport's [`TransportError`] if the transfer does not
    /// complete, and [`TransportError::ShortTransfer`] if it completes with
    /// no data.
    pub fn read(
        &mut self,
        request: RequestCode,
        index: u16,
        expected_len: usize,
    ) -> TransportResult<RawPayload> {
        self.read_setup(ControlSetup::new(request, 0, index), expected_len)
    }

    /// Read a device register whose address travels in the value field.
    ///
    /// # Errors
    ///
    /// Same as [`ControlChannel::read`].
    pub fn read_register(
        &mut self,
        request: RequestCode,
        address: u16,
        expected_len: usize,
    ) -> TransportResult<RawPayload> {
        self.read_setup(ControlSetup::new(request, address, 0), expected_len)
    }

    /// Issue a read with explicit setup fields.
    ///
    /// # Errors
    ///
    /// Same as [`ControlChannel::read`].
    pub fn read_setup(
        &mut self,
        setup: ControlSetup,
        expected_len: usize,
    ) -> TransportResult<RawPayload> {
        self.stats.reads = self.stats.reads.saturating_add(1);
        let result = self
            .transport
            .control_in(setup, expected_len)
            .and_then(|bytes| {
                if bytes.is_empty() && expected_len > 0 {
                    Err(TransportError::ShortTransfer {
                        expected: expected_len,
                        actual: 0,
                    })
                } else {
                    Ok(RawPayload::from(bytes))
                }
            });

        match &result {
            Ok(payload) => trace!(
                "IN  req={} value=0x{:04X} index=0x{:04X} -> {:02X?}",
                setup.request,
                setup.value,
                setup.index,
                payload.as_bytes()
            ),
            Err(e) => {
                self.stats.failures = self.stats.failures.saturating_add(1);
                debug!("IN  req={} failed: {}", setup.request, e);
            }
        }
        result
    }

    /// Write `value` and `index` in the setup fields, with no data stage.
    ///
    /// # Errors
    ///
    /// Returns the transport's [`TransportError`] if the transfer does not
    /// complete.
    pub fn write(&mut self, request: RequestCode, value: u16, index: u16) -> TransportResult<()> {
        let setup = ControlSetup::new(request, value, index);
        self.stats.writes = self.stats.writes.saturating_add(1);
        let result = self.transport.control_out(setup, &[]);
        match &result {
            Ok(()) => trace!(
                "OUT req={} value=0x{:04X} index=0x{:04X}",
                request, value, index
            ),
            Err(e) => {
                self.stats.failures = self.stats.failures.saturating_add(1);
                debug!("OUT req={} value=0x{:04X} failed: {}", request, value, e);
            }
        }
        result
    }

    pub fn stats(&self) -> ChannelStats {
        self.stats
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }
}
