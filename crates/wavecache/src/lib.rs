#![doc = include_str!("../README.md")]

pub mod boundary;
pub mod cancellation;
pub mod claim_check;
pub mod config;
pub mod dispatcher;
pub mod fetch;
pub mod metrics;
pub mod persist;
pub mod persistence;
pub mod probe;
pub mod result_table;
pub mod scale;
pub mod service;
pub mod sleep;
#[cfg(test)]
mod testing;
pub mod windowed;
pub mod worker;
pub mod worker_store;

pub use cancellation::{CancellationRegistry, Registration};
pub use config::WorkerConfig;
pub use dispatcher::Dispatcher;
pub use persist::Persist;
pub use persistence::{
    DirectoryStorageManager, PersistenceOutcome, StorageManager, negotiate_persistence,
    open_result_backend,
};
pub use probe::{ByteBudget, CapacityProbe, Unbounded};
pub use result_table::{MemoryBackend, ResultBackend, ResultTable, SqliteBackend};
pub use service::{HttpWaveformService, WaveformService};
pub use sleep::{SleepProvider, TokioSleep, TokioYield};
pub use wavecache_core::*;
pub use worker::{WaveformWorker, WorkerHandle};
pub use worker_store::{Storable, WaveformStore, WorkerStore};
