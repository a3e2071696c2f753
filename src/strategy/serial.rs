//! Serial processing strategy
//!
//! Single-threaded replay straight through the deterministic engine.
//! This path is the determinism reference: replaying the same record
//! sequence always produces the same final state, which the concurrent
//! strategy is checked against.

use crate::core::engine::LedgerEngine;
use crate::io::csv_format::write_snapshot_csv;
use crate::io::reader::OpReader;
use crate::persist::JsonlSink;
use crate::strategy::ProcessingStrategy;
use crate::types::LedgerError;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// Single-threaded replay strategy
#[derive(Debug, Default)]
pub struct SerialStrategy {
    journal: Option<PathBuf>,
}

impl SerialStrategy {
    pub fn new(journal: Option<PathBuf>) -> Self {
        SerialStrategy { journal }
    }

    fn build_engine(&self) -> Result<LedgerEngine, LedgerError> {
        let mut engine = LedgerEngine::new();
        if let Some(path) = &self.journal {
            engine = engine.with_sink(Arc::new(JsonlSink::create(path)?));
        }
        Ok(engine)
    }
}

impl ProcessingStrategy for SerialStrategy {
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), LedgerError> {
        let engine = self.build_engine()?;
        let reader = OpReader::new(input_path)?;

        for result in reader {
            match result {
                Ok(record) => {
                    if let Err(error) = engine.apply(&record) {
                        warn!(ts = record.timestamp, %error, "operation rejected");
                    }
                }
                Err(error) => {
                    warn!(%error, "skipping malformed record");
                }
            }
        }

        write_snapshot_csv(&engine.snapshot(), output)
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
    fn test_serial_strategy_replays_and_snapshots() {
        let content = format!(
            "{}create,1,alice,,,,,,\ndeposit,2,alice,,500,,,,\ncreate,3,bob,,,,,,\ntransfer,4,alice,bob,200,,,,\n",
            HEADER
        );
        let file = create_temp_csv(&content);

        let strategy = SerialStrategy::new(None);
        let mut output = Vec::new();
        strategy.process(file.path(), &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert_eq!(text, "account,balance,outgoing\nalice,300,200\nbob,200,0\n");
    }

    #[test]
    fn test_serial_strategy_continues_past_bad_rows_and_rejections() {
        let content = format!(
            "{}create,1,alice,,,,,,\nexplode,2,,,,,,,\ndeposit,3,ghost,,100,,,,\ndeposit,4,alice,,50,,,,\n",
            HEADER
        );
        let file = create_temp_csv(&content);

        let strategy = SerialStrategy::new(None);
        let mut output = Vec::new();
        strategy.process(file.path(), &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert_eq!(text, "account,balance,outgoing\nalice,50,0\n");
    }

    #[test]
    fn test_serial_strategy_missing_input_is_fatal() {
        let strategy = SerialStrategy::new(None);
        let mut output = Vec::new();
        let result = strategy.process(Path::new("no_such_file.csv"), &mut output);
        assert!(matches!(result, Err(LedgerError::Io { .. })));
    }

    #[test]
    fn test_serial_strategy_writes_journal() {
        let content = format!("{}create,1,alice,,,,,,\ndeposit,2,alice,,500,,,,\n", HEADER);
        let input = create_temp_csv(&content);
        let journal = NamedTempFile::new().unwrap();

        let strategy = SerialStrategy::new(Some(journal.path().to_path_buf()));
        let mut output = Vec::new();
        strategy.process(input.path(), &mut output).unwrap();

        let journal_text = std::fs::read_to_string(journal.path()).unwrap();
        assert!(journal_text.contains("\"ACCOUNT_CREATED\""));
        assert!(journal_text.contains("\"DEPOSIT\""));
    }
}
