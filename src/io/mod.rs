//! I/O module
//!
//! Handles CSV parsing and output.
//!
//! # Components
//!
//! - `csv_format` - CSV format handling (row conversion, snapshot output)
//! - `reader` - Streaming operation-record reader with iterator interface

pub mod csv_format;
pub mod reader;

pub use csv_format::{convert_op_record, write_snapshot_csv, CsvOpRecord};
pub use reader::OpReader;
