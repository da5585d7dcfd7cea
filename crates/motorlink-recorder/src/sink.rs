//! Destinations for batches of readings.

use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, error};

use crate::error::{PersistenceError, PersistenceResult};
use crate::reading::Reading;

/// Name of the leading timestamp column.
pub const TIME_COLUMN: &str = "Time";

/// Persists whole batches. A failed call must leave no partial batch behind.
pub trait RecordSink: Send {
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if any part of the batch could not be
    /// persisted.
    fn write_batch(&mut self, batch: &[Reading]) -> PersistenceResult<()>;

    /// Field names every reading must carry, in order, if the sink has a
    /// fixed layout.
    fn schema(&self) -> Option<&[String]> {
        None
    }
}

impl<S: RecordSink + ?Sized> RecordSink for Box<S> {
    fn write_batch(&mut self, batch: &[Reading]) -> PersistenceResult<()> {
        (**self).write_batch(batch)
    }

    fn schema(&self) -> Option<&[String]> {
        (**self).schema()
    }
}

/// # Errors
///
/// Returns [`PersistenceError::SchemaMismatch`] unless `reading` carries
/// exactly `fields`, in order.
pub fn check_schema(fields: &[String], reading: &Reading) -> PersistenceResult<()> {
    if reading.field_names().eq(fields.iter().map(String::as_str)) {
        return Ok(());
    }
    Err(PersistenceError::SchemaMismatch {
        expected: fields.join(","),
        found: reading.field_names().collect::<Vec<_>>().join(","),
    })
}

/// Backing storage for [`CsvSink`]: appendable and truncatable.
pub trait SinkFile: Write + Seek + Send {
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn truncate_to(&mut self, len: u64) -> io::Result<()>;

    /// Push written bytes to durable storage.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn sync(&mut self) -> io::Result<()>;
}

impl SinkFile for File {
    fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

impl SinkFile for Cursor<Vec<u8>> {
    fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        let len = usize::try_from(len).map_err(io::Error::other)?;
        self.get_mut().truncate(len);
        Ok(())
    }

    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// CSV log with a `Time` column followed by the recorded fields.
///
/// The header is written when the sink is created. Each batch is rendered in
/// memory, appended with one write and synced; on failure the file is cut
/// back to its last good length.
pub struct CsvSink<F: SinkFile = File> {
    file: F,
    fields: Vec<String>,
    committed: u64,
    path: Option<PathBuf>,
}

impl CsvSink<File> {
    /// Create or truncate `path` and write the header.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Io`] if the file cannot be created.
    pub fn create(path: impl AsRef<Path>, fields: Vec<String>) -> PersistenceResult<Self> {
        let path = path.as_ref();
        let file = File::create(path)?;
        let mut sink = Self::with_file(file, fields)?;
        sink.path = Some(path.to_path_buf());
        Ok(sink)
    }

    /// Like [`CsvSink::create`] but fails if `path` already exists.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Io`] with kind `AlreadyExists` when the
    /// file is present.
    pub fn create_new(path: impl AsRef<Path>, fields: Vec<String>) -> PersistenceResult<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().write(true).create_new(true).open(path)?;
        let mut sink = Self::with_file(file, fields)?;
        sink.path = Some(path.to_path_buf());
        Ok(sink)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl<F: SinkFile> CsvSink<F> {
    /// Wrap an empty file and write the header row.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if the header cannot be written.
    pub fn with_file(file: F, fields: Vec<String>) -> PersistenceResult<Self> {
        let mut sink = Self {
            file,
            fields,
            committed: 0,
            path: None,
        };
        let header = render_header(&sink.fields)?;
        sink.append(&header)?;
        debug!("CSV header written: {} field(s)", sink.fields.len());
        Ok(sink)
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Bytes known to be persisted, header included.
    pub fn committed_len(&self) -> u64 {
        self.committed
    }

    pub fn into_inner(self) -> F {
        self.file
    }

    fn append(&mut self, bytes: &[u8]) -> PersistenceResult<()> {
        let committed = self.committed;
        let result = self
            .file
            .seek(SeekFrom::Start(committed))
            .and_then(|_| self.file.write_all(bytes))
            .and_then(|()| self.file.flush())
            .and_then(|()| self.file.sync());

        match result {
            Ok(()) => {
                let written = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
                self.committed = committed.saturating_add(written);
                Ok(())
            }
            Err(e) => {
                if let Err(rollback) = self.file.truncate_to(committed) {
                    error!("Failed to roll back partial CSV batch: {rollback}");
                }
                Err(e.into())
            }
        }
    }
}

impl<F: SinkFile> RecordSink for CsvSink<F> {
    fn write_batch(&mut self, batch: &[Reading]) -> PersistenceResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let rows = render_rows(&self.fields, batch)?;
        self.append(&rows)
    }

    fn schema(&self) -> Option<&[String]> {
        Some(&self.fields)
    }
}

fn render_header(fields: &[String]) -> PersistenceResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(std::iter::once(TIME_COLUMN).chain(fields.iter().map(String::as_str)))?;
    writer
        .into_inner()
        .map_err(|e| PersistenceError::Io(e.into_error()))
}

fn render_rows(fields: &[String], batch: &[Reading]) -> PersistenceResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    for reading in batch {
        check_schema(fields, reading)?;
        let mut record = Vec::with_capacity(reading.fields.len().saturating_add(1));
        record.push(format!("{:.6}", reading.time));
        record.extend(
            reading
                .fields
                .iter()
                .map(|(_, value)| value.map(|v| v.to_string()).unwrap_or_default()),
        );
        writer.write_record(&record)?;
    }

    writer
        .into_inner()
        .map_err(|e| PersistenceError::Io(e.into_error()))
}

#[derive(Default)]
struct MemoryState {
    rows: Vec<Reading>,
    batches: usize,
    failing: bool,
}

/// Keeps persisted rows in memory. Clones share the same storage.
#[derive(Clone, Default)]
pub struct MemorySink {
    state: Arc<Mutex<MemoryState>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MemoryState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }

    pub fn rows(&self) -> Vec<Reading> {
        self.with_state(|s| s.rows.clone())
    }

    /// Number of batches accepted so far.
    pub fn batches(&self) -> usize {
        self.with_state(|s| s.batches)
    }

    /// Reject every batch while `failing` is set.
    pub fn set_failing(&self, failing: bool) {
        self.with_state(|s| s.failing = failing);
    }
}

impl RecordSink for MemorySink {
    fn write_batch(&mut self, batch: &[Reading]) -> PersistenceResult<()> {
        self.with_state(|s| {
            if s.failing {
                return Err(PersistenceError::Rejected("memory sink set to fail".to_string()));
            }
            s.rows.extend_from_slice(batch);
            s.batches = s.batches.saturating_add(1);
            Ok(())
        })
    }
}
