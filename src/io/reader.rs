//! Streaming CSV reader for operation records
//!
//! Provides an iterator over operation records from a CSV file. Reads one
//! row at a time, so memory use does not grow with file size. Fatal
//! errors (file not found) surface from `new()`; per-row parse failures
//! are yielded as `Err` items with line context so callers can log and
//! continue.

use crate::io::csv_format::{convert_op_record, CsvOpRecord};
use crate::types::{LedgerError, OperationRecord};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

/// Streaming operation-record reader
#[derive(Debug)]
pub struct OpReader {
    reader: csv::Reader<File>,
    line_num: u64,
}

impl OpReader {
    /// Open a CSV file of operation records
    ///
    /// The reader trims whitespace and tolerates rows that omit trailing
    /// unused columns.
    pub fn new(path: &Path) -> Result<Self, LedgerError> {
        let file = File::open(path).map_err(|e| LedgerError::Io {
            message: format!("failed to open '{}': {}", path.display(), e),
        })?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(file);

        Ok(OpReader {
            reader,
            line_num: 1, // header occupies line 1
        })
    }
}

impl Iterator for OpReader {
    type Item = Result<OperationRecord, LedgerError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut rows = self.reader.deserialize::<CsvOpRecord>();
        let row = rows.next()?;
        self.line_num += 1;
        let line = self.line_num;

        Some(match row {
            Ok(row) => convert_op_record(row).map_err(|message| LedgerError::Parse {
                line: Some(line),
                message,
            }),
            Err(e) => Err(LedgerError::Parse {
                line: Some(line),
                message: e.to_string(),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Operation;
    use std::io::Write;
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
    fn test_reader_fails_on_missing_file() {
        let result = OpReader::new(Path::new("no_such_file.csv"));
        assert!(matches!(result, Err(LedgerError::Io { .. })));
    }

    #[test]
    fn test_reader_yields_typed_records() {
        let content = format!(
            "{}create,1,alice,,,,,,\ndeposit,2,alice,,500,,,,\ntransfer,4,alice,bob,200,,,,\n",
            HEADER
        );
        let file = create_temp_csv(&content);

        let records: Vec<_> = OpReader::new(file.path())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].timestamp, 1);
        assert_eq!(
            records[1].op,
            Operation::Deposit { account: "alice".into(), amount: 500 }
        );
        assert_eq!(
            records[2].op,
            Operation::Transfer {
                source: "alice".into(),
                target: "bob".into(),
                amount: 200
            }
        );
    }

    #[test]
    fn test_reader_includes_line_numbers_in_errors() {
        let content = format!("{}create,1,alice,,,,,,\ndeposit,2,alice,,lots,,,,\n", HEADER);
        let file = create_temp_csv(&content);

        let records: Vec<_> = OpReader::new(file.path()).unwrap().collect();
        assert!(records[0].is_ok());
        match &records[1] {
            Err(LedgerError::Parse { line, message }) => {
                assert_eq!(*line, Some(3));
                assert!(message.contains("invalid amount"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_reader_continues_after_a_bad_row() {
        let content = format!(
            "{}create,1,alice,,,,,,\nexplode,2,alice,,,,,,\ncreate,3,bob,,,,,,\n",
            HEADER
        );
        let file = create_temp_csv(&content);

        let records: Vec<_> = OpReader::new(file.path()).unwrap().collect();
        assert_eq!(records.len(), 3);
        assert!(records[0].is_ok());
        assert!(records[1].is_err());
        assert!(records[2].is_ok());
    }

    #[test]
    fn test_reader_handles_empty_optional_fields() {
        let content = format!("{}top_spenders,6,,,,,,,5\ncreate,1,alice,,,,,,\n", HEADER);
        let file = create_temp_csv(&content);

        let records: Vec<_> = OpReader::new(file.path())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(records[0].op, Operation::TopSpenders { n: 5 });
        assert_eq!(
            records[1].op,
            Operation::CreateAccount { account: "alice".into() }
        );
    }

    #[test]
    fn test_reader_empty_after_header() {
        let file = create_temp_csv(HEADER);
        let records: Vec<_> = OpReader::new(file.path()).unwrap().collect();
        assert!(records.is_empty());
    }
}
