//! Common imports for driving a session.

pub use crate::error::{LoopError, LoopResult, PollError};
pub use crate::poller::{Poll, TelemetryPoller};
pub use crate::sample_loop::{LoopConfig, LoopSummary, SampleLoop, StopToken};
pub use crate::surface::{ControlSurface, Observed, StaticSurface};
pub use crate::sync::{ParameterSync, SyncState};
pub use motorlink_recorder::{BufferedRecorder, CsvSink, MemorySink, Reading};
pub use motorlink_transport::{ControlChannel, ControlTransport};
