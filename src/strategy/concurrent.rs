//! Concurrent processing strategy
//!
//! Drives parsed operation records through the worker pool and the
//! thread-safe shell. Submissions the intake queues cannot absorb are
//! dropped and counted, matching the backpressure contract; everything
//! accepted is applied before the snapshot is taken.

use crate::concurrent::{PoolConfig, WorkerPool};
use crate::core::engine::LedgerEngine;
use crate::core::shell::ConcurrentLedger;
use crate::io::csv_format::write_snapshot_csv;
use crate::io::reader::OpReader;
use crate::persist::JsonlSink;
use crate::strategy::ProcessingStrategy;
use crate::types::LedgerError;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Worker-pool replay strategy
#[derive(Debug)]
pub struct ConcurrentStrategy {
    pool_config: PoolConfig,
    journal: Option<PathBuf>,
}

impl ConcurrentStrategy {
    pub fn new(pool_config: PoolConfig, journal: Option<PathBuf>) -> Self {
        ConcurrentStrategy {
            pool_config,
            journal,
        }
    }

    fn build_ledger(&self) -> Result<Arc<ConcurrentLedger>, LedgerError> {
        let mut engine = LedgerEngine::new();
        if let Some(path) = &self.journal {
            engine = engine.with_sink(Arc::new(JsonlSink::create(path)?));
        }
        Ok(Arc::new(ConcurrentLedger::with_engine(engine)))
    }
}

impl ProcessingStrategy for ConcurrentStrategy {
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), LedgerError> {
        let ledger = self.build_ledger()?;
        let pool = WorkerPool::new(
            Arc::clone(&ledger) as Arc<dyn crate::core::traits::Ledger>,
            self.pool_config.clone(),
        );
        let reader = OpReader::new(input_path)?;

        for result in reader {
            match result {
                Ok(record) => {
                    // A full queue drops the submission; the pool counts it.
                    pool.submit(record);
                }
                Err(error) => {
                    warn!(%error, "skipping malformed record");
                }
            }
        }

        let stats = pool.shutdown();
        info!(
            processed = stats.processed,
            dropped = stats.dropped,
            failed = stats.failed,
            "replay finished"
        );

        write_snapshot_csv(&ledger.snapshot(), output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    const HEADER: &str = "op,ts,account,target,amount,delay,payment_id,time_at,n\n";

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("failed to write temp file");
        file.flush().expect("failed to flush temp file");
        file
    }

    #[test]
    fn test_concurrent_strategy_matches_serial_output() {
        let content = format!(
            "{}create,1,alice,,,,,,\ndeposit,2,alice,,500,,,,\ncreate,3,bob,,,,,,\ntransfer,4,alice,bob,200,,,,\nschedule,5,alice,,100,3,,,\ndeposit,9,alice,,0,,,,\n",
            HEADER
        );
        let file = create_temp_csv(&content);

        let serial = crate::strategy::SerialStrategy::new(None);
        let mut serial_output = Vec::new();
        serial.process(file.path(), &mut serial_output).unwrap();

        // One worker keeps total submission order, so cross-account
        // dependencies (bob must exist before the transfer) hold.
        let concurrent = ConcurrentStrategy::new(PoolConfig::new(1, 256), None);
        let mut concurrent_output = Vec::new();
        concurrent.process(file.path(), &mut concurrent_output).unwrap();

        assert_eq!(serial_output, concurrent_output);
    }

    #[test]
    fn test_concurrent_strategy_missing_input_is_fatal() {
        let strategy = ConcurrentStrategy::new(PoolConfig::default(), None);
        let mut output = Vec::new();
        let result = strategy.process(Path::new("no_such_file.csv"), &mut output);
        assert!(matches!(result, Err(LedgerError::Io { .. })));
    }
}
