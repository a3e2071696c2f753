//! Persistence sinks
//!
//! Sinks mirror committed state transitions; they never override the
//! in-memory authority and are never consulted for reads. Two
//! implementations are provided: an in-memory sink for tests and
//! inspection, and a JSON-lines file sink for a durable journal.

use crate::core::traits::CommitSink;
use crate::types::{CommitRecord, LedgerError};
use parking_lot::Mutex;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::warn;

/// In-memory sink collecting every commit record in arrival order
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<CommitRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records received so far
    pub fn records(&self) -> Vec<CommitRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl CommitSink for MemorySink {
    fn record(&self, record: &CommitRecord) {
        self.records.lock().push(record.clone());
    }
}

/// JSON-lines journal sink
///
/// Appends one JSON object per commit record. Write failures are logged
/// and otherwise ignored: the mirror must never fail an operation that
/// the in-memory authority already committed.
pub struct JsonlSink {
    writer: Mutex<BufWriter<File>>,
}

impl JsonlSink {
    /// Create or truncate the journal file at `path`
    pub fn create(path: &Path) -> Result<Self, LedgerError> {
        let file = File::create(path)?;
        Ok(JsonlSink {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Flush buffered records to disk
    pub fn flush(&self) {
        if let Err(error) = self.writer.lock().flush() {
            warn!(%error, "failed to flush journal");
        }
    }
}

impl CommitSink for JsonlSink {
    fn record(&self, record: &CommitRecord) {
        let mut writer = self.writer.lock();
        match serde_json::to_string(record) {
            Ok(line) => {
                if let Err(error) = writeln!(writer, "{}", line) {
                    warn!(%error, "failed to append journal record");
                }
            }
            Err(error) => warn!(%error, "failed to serialize journal record"),
        }
    }
}

impl Drop for JsonlSink {
    fn drop(&mut self) {
        let _ = self.writer.lock().flush();
    }
}
