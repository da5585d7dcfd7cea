//! Engine error types.

use motorlink_protocol::ProtocolError;
use motorlink_recorder::PersistenceError;
use thiserror::Error;

/// A poll could not produce a reading at all.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PollError {
    /// The channel table does not describe what the device sent.
    #[error("Channel '{channel}' returned a payload it cannot decode: {source}")]
    Malformed {
        channel: String,
        #[source]
        source: ProtocolError,
    },
}

/// Outcomes that end a sampling session.
#[derive(Debug, Error)]
pub enum LoopError {
    #[error("Invalid device profile: {0}")]
    Profile(#[from] ProtocolError),

    #[error(transparent)]
    Poll(#[from] PollError),

    #[error("Device unresponsive: {dead_ticks} consecutive ticks without a successful transfer")]
    DeviceUnresponsive { dead_ticks: u32 },

    #[error("Final flush failed with {pending} reading(s) still buffered: {source}")]
    FinalFlush {
        pending: usize,
        #[source]
        source: PersistenceError,
    },
}

pub type LoopResult<T> = Result<T, LoopError>;
