//! Batched persistence for motorlink telemetry.
//!
//! Readings are appended to an in-memory batch and handed to a
//! [`RecordSink`] once the batch is full. A flush either persists the whole
//! batch or leaves it buffered for the next attempt.

#![deny(static_mut_refs)]

pub mod error;
pub mod reading;
pub mod recorder;
pub mod sink;

pub use error::{PersistenceError, PersistenceResult};
pub use reading::Reading;
pub use recorder::{BufferedRecorder, DEFAULT_BATCH_SIZE, DISABLED_WARN_THRESHOLD};
pub use sink::{CsvSink, MemorySink, RecordSink, SinkFile, TIME_COLUMN, check_schema};
