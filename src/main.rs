//! Banking Ledger CLI
//!
//! Replays banking operation records from a CSV file through the
//! in-memory ledger and writes the final account snapshot to stdout.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- operations.csv > accounts.csv
//! cargo run -- --mode serial operations.csv > accounts.csv
//! cargo run -- --mode concurrent --workers 8 --queue-capacity 2048 operations.csv
//! cargo run -- --journal journal.jsonl operations.csv
//! ```
//!
//! # Processing Modes
//!
//! - **serial**: Single-threaded replay, the determinism reference
//! - **concurrent**: Worker pool over the thread-safe shell (default)
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Fatal error (missing input file, I/O failure)

use banking_ledger::cli;
use banking_ledger::strategy;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::parse_args();

    let strategy = {
        let pool = match args.mode {
            cli::ModeType::Concurrent => Some(args.to_pool_config()),
            cli::ModeType::Serial => None,
        };
        strategy::create_strategy(args.mode, pool, args.journal.clone())
    };

    let mut output = std::io::stdout();
    if let Err(e) = strategy.process(&args.input_file, &mut output) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
