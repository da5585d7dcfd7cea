//! In-memory batch with all-or-nothing flushes.

use tracing::{debug, warn};

use crate::error::PersistenceResult;
use crate::reading::Reading;
use crate::sink::{RecordSink, check_schema};

/// Default number of readings per flush.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Buffer size past which a disabled recorder warns about growth.
pub const DISABLED_WARN_THRESHOLD: usize = 10_000;

/// Accumulates readings and hands them to a sink in whole batches.
///
/// The batch is cleared only after the sink accepted all of it, so a failed
/// flush is retried with the same rows plus anything appended since.
pub struct BufferedRecorder {
    sink: Option<Box<dyn RecordSink>>,
    batch: Vec<Reading>,
    flushes: u64,
    growth_warned: bool,
}

impl BufferedRecorder {
    pub fn new(sink: impl RecordSink + 'static) -> Self {
        Self {
            sink: Some(Box::new(sink)),
            batch: Vec::new(),
            flushes: 0,
            growth_warned: false,
        }
    }

    /// A recorder with no destination. Readings are buffered and never
    /// flushed.
    pub fn disabled() -> Self {
        Self {
            sink: None,
            batch: Vec::new(),
            flushes: 0,
            growth_warned: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Buffer one reading.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::SchemaMismatch`](crate::PersistenceError)
    /// if the sink has a fixed layout that `reading` does not match. The
    /// reading is not buffered.
    pub fn append(&mut self, reading: Reading) -> PersistenceResult<()> {
        if let Some(fields) = self.sink.as_ref().and_then(|sink| sink.schema()) {
            check_schema(fields, &reading)?;
        }
        self.batch.push(reading);
        if self.sink.is_none() && !self.growth_warned && self.batch.len() > DISABLED_WARN_THRESHOLD
        {
            warn!(
                "Recording is disabled and {} readings are buffered in memory",
                self.batch.len()
            );
            self.growth_warned = true;
        }
        Ok(())
    }

    /// Persist the batch once it holds at least `batch_size` readings.
    ///
    /// Returns the number of readings written, or `None` when nothing was
    /// due. A disabled recorder never flushes.
    ///
    /// # Errors
    ///
    /// Returns the sink's [`PersistenceError`](crate::PersistenceError); the
    /// batch is left untouched.
    pub fn flush_if_full(&mut self, batch_size: usize) -> PersistenceResult<Option<usize>> {
        if self.batch.len() < batch_size.max(1) {
            return Ok(None);
        }
        self.flush()
    }

    /// Persist whatever is buffered, regardless of size.
    ///
    /// # Errors
    ///
    /// Same as [`BufferedRecorder::flush_if_full`].
    pub fn flush_all(&mut self) -> PersistenceResult<Option<usize>> {
        self.flush()
    }

    fn flush(&mut self) -> PersistenceResult<Option<usize>> {
        let Some(sink) = self.sink.as_mut() else {
            return Ok(None);
        };
        if self.batch.is_empty() {
            return Ok(None);
        }

        sink.write_batch(&self.batch)?;
        let written = self.batch.len();
        self.batch.clear();
        self.flushes = self.flushes.saturating_add(1);
        debug!("Flushed {written} reading(s)");
        Ok(Some(written))
    }

    pub fn len(&self) -> usize {
        self.batch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }

    /// Readings buffered since the last successful flush.
    pub fn pending(&self) -> &[Reading] {
        &self.batch
    }

    /// Successful flushes so far.
    pub fn flushes(&self) -> u64 {
        self.flushes
    }
}
