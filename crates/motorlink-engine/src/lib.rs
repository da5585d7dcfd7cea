//! # motorlink-engine
//!
//! The runtime half of the motorlink driver. Each tick of a [`SampleLoop`]:
//!
//! 1. observes the [`ControlSurface`] for desired parameter values,
//! 2. lets [`ParameterSync`] write the ones that changed,
//! 3. has [`TelemetryPoller`] read every channel into a [`Reading`],
//! 4. appends the reading to a [`BufferedRecorder`] and flushes full batches.
//!
//! Transport failures are local: a failed write is retried next tick and a
//! failed read leaves its field absent. Only an undecodable payload or a run
//! of ticks with no successful transfer ends the session.
//!
//! [`Reading`]: motorlink_recorder::Reading
//! [`BufferedRecorder`]: motorlink_recorder::BufferedRecorder

#![deny(static_mut_refs)]

pub mod error;
pub mod poller;
pub mod prelude;
pub mod sample_loop;
pub mod surface;
pub mod sync;

pub use error::{LoopError, LoopResult, PollError};
pub use poller::{Poll, TelemetryPoller};
pub use sample_loop::{
    DEFAULT_MAX_DEAD_TICKS, DEFAULT_MAX_RATE_HZ, LoopConfig, LoopSummary, RatePacer, SampleLoop,
    StopToken, TickReport,
};
pub use surface::{ControlSurface, Observed, StaticSurface};
pub use sync::{Parameter, ParameterSync, SyncReport, SyncState};
