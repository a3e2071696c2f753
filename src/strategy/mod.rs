//! Processing strategy module
//!
//! Defines the Strategy pattern for complete replay pipelines: reading
//! operation records from a CSV file, driving them through the ledger,
//! and writing the final account snapshot. Two implementations are
//! selectable at runtime: single-threaded serial replay and the
//! worker-pool concurrent path.

use crate::cli::ModeType;
use crate::concurrent::PoolConfig;
use crate::types::LedgerError;
use std::io::Write;
use std::path::{Path, PathBuf};

pub mod concurrent;
pub mod serial;

pub use concurrent::ConcurrentStrategy;
pub use serial::SerialStrategy;

/// A complete replay pipeline
///
/// Implementations read operation records from `input_path`, apply them
/// through the ledger, and write the final active-account snapshot to
/// `output`. Per-record failures (parse errors, business errors) are
/// logged and do not abort the run; only fatal I/O problems surface as
/// errors.
pub trait ProcessingStrategy: Send + Sync {
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), LedgerError>;
}

/// Select a processing strategy at runtime
///
/// `pool` only applies to the concurrent mode; `journal` attaches a
/// JSON-lines persistence sink in either mode.
pub fn create_strategy(
    mode: ModeType,
    pool: Option<PoolConfig>,
    journal: Option<PathBuf>,
) -> Box<dyn ProcessingStrategy> {
    match mode {
        ModeType::Serial => Box::new(SerialStrategy::new(journal)),
        ModeType::Concurrent => {
            Box::new(ConcurrentStrategy::new(pool.unwrap_or_default(), journal))
        }
    }
}
