use crate::concurrent::PoolConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Replay banking operations through the in-memory ledger
#[derive(Parser, Debug)]
#[command(name = "banking-ledger")]
#[command(about = "Replay banking operation records through the in-memory ledger", long_about = None)]
pub struct CliArgs {
    /// Input CSV file of operation records
    #[arg(value_name = "INPUT", help = "Path to the input CSV file")]
    pub input_file: PathBuf,

    /// Processing mode
    #[arg(
        long = "mode",
        value_name = "MODE",
        default_value = "concurrent",
        help = "Processing mode: 'serial' for single-threaded or 'concurrent' for the worker pool"
    )]
    pub mode: ModeType,

    /// Worker-thread count (concurrent mode only)
    #[arg(
        long = "workers",
        value_name = "COUNT",
        help = "Number of worker threads (default: CPU cores)"
    )]
    pub workers: Option<usize>,

    /// Per-worker intake queue capacity (concurrent mode only)
    #[arg(
        long = "queue-capacity",
        value_name = "SIZE",
        help = "Capacity of each worker's intake queue (default: 1024)"
    )]
    pub queue_capacity: Option<usize>,

    /// Optional JSON-lines journal of committed transitions
    #[arg(
        long = "journal",
        value_name = "PATH",
        help = "Write a JSON-lines journal of committed state transitions"
    )]
    pub journal: Option<PathBuf>,
}

/// Available processing modes
#[derive(Clone, Debug, ValueEnum)]
pub enum ModeType {
    Serial,
    Concurrent,
}

impl CliArgs {
    /// Build a PoolConfig from the CLI arguments
    ///
    /// Unspecified or zero values fall back to the pool defaults.
    pub fn to_pool_config(&self) -> PoolConfig {
        PoolConfig::new(
            self.workers.unwrap_or(0),
            self.queue_capacity.unwrap_or(0),
        )
    }
}
