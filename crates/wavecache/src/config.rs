//! Fixed timing constants and deployment configuration.

use core::time::Duration;
use std::path::PathBuf;

/// Delay between the first queued result table lookup and the bulk read that
/// serves every lookup queued in the meantime.
pub const BATCH_WINDOW: Duration = Duration::from_millis(10);

/// Unit of the worker store retrieval backoff. Attempt `n` waits `n² × unit`.
pub const RETRIEVE_BACKOFF_UNIT: Duration = Duration::from_millis(50);

/// Number of backoff attempts before a retrieval resolves to no value.
pub const MAX_RETRIEVE_ATTEMPTS: u32 = 5;

/// Remaining capacity below which the in-memory layer is flushed.
pub const DEFAULT_CAPACITY_THRESHOLD_BYTES: u64 = 64 * 1024 * 1024;

/// File name of the durable result database inside the cache directory.
pub const RESULT_DB_FILE: &str = "results.sqlite3";

/// Runtime configuration for the background worker.
#[derive(Clone, Debug)]
pub struct WorkerConfig {
    /// Directory holding the durable result database.
    pub cache_dir: PathBuf,
    /// When false the worker never asks for durable storage and keeps results
    /// for the session only.
    pub use_persistence: bool,
    pub capacity_threshold_bytes: u64,
    /// Byte budget for the in-memory layer. `None` means no capacity signal
    /// is available and the memory layer is never flushed for pressure.
    pub memory_budget_bytes: Option<u64>,
    pub request_timeout: Duration,
    pub channel_capacity: usize,
    pub shutdown_timeout: Duration,
}

impl WorkerConfig {
    pub fn result_db_path(&self) -> PathBuf {
        self.cache_dir.join(RESULT_DB_FILE)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(".wavecache"),
            use_persistence: true,
            capacity_threshold_bytes: DEFAULT_CAPACITY_THRESHOLD_BYTES,
            memory_budget_bytes: None,
            request_timeout: Duration::from_secs(30),
            channel_capacity: 64,
            shutdown_timeout: Duration::from_secs(3),
        }
    }
}
