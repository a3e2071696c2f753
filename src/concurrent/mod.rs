//! Concurrency plumbing
//!
//! - `pool` - Fixed-size worker pool draining bounded intake queues

pub mod pool;

pub use pool::{PoolConfig, PoolStats, WorkerPool};
