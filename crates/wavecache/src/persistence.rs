//! Durable storage negotiation at startup.
//!
//! The worker asks the platform whether its cache location is already
//! durable and, if not, asks for durability. Any outcome other than durable
//! storage leaves the worker with a session-scoped cache; nothing here is
//! fatal.

use crate::{
    Error, Result, WorkerConfig,
    result_table::{MemoryBackend, ResultBackend, SqliteBackend},
};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

const PROBE_FILE: &str = ".wavecache-probe";

/// Platform storage durability controls.
pub trait StorageManager: Send + Sync {
    /// Whether storage is already durable.
    fn persisted(&self) -> Result<bool>;

    /// Requests durable storage, returning whether it was granted.
    fn persist(&self) -> Result<bool>;
}

/// Storage manager for a cache directory on the local filesystem. The
/// directory counts as durable once it exists and is writable.
#[derive(Clone, Debug)]
pub struct DirectoryStorageManager {
    dir: PathBuf,
}

impl DirectoryStorageManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn io_err(err: std::io::Error) -> Error {
    Error::Storage {
        context: err.to_string(),
    }
}

impl StorageManager for DirectoryStorageManager {
    fn persisted(&self) -> Result<bool> {
        if !self.dir.is_dir() {
            return Ok(false);
        }
        let probe = self.dir.join(PROBE_FILE);
        match fs::write(&probe, b"ok") {
            Ok(()) => {
                fs::remove_file(&probe).map_err(io_err)?;
                Ok(true)
            }
            Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => Ok(false),
            Err(err) => Err(io_err(err)),
        }
    }

    fn persist(&self) -> Result<bool> {
        match fs::create_dir_all(&self.dir) {
            Ok(()) => self.persisted(),
            Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => Ok(false),
            Err(err) => Err(io_err(err)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PersistenceOutcome {
    AlreadyPersisted,
    Granted,
    Denied,
    /// Persistence was turned off by configuration; nothing was asked.
    Disabled,
    Failed(String),
}

impl PersistenceOutcome {
    pub const fn is_durable(&self) -> bool {
        matches!(self, Self::AlreadyPersisted | Self::Granted)
    }
}

/// Checks the current durability state, asks for durability if needed and
/// logs the outcome.
pub fn negotiate_persistence(manager: &dyn StorageManager) -> PersistenceOutcome {
    let outcome = match manager.persisted() {
        Ok(true) => PersistenceOutcome::AlreadyPersisted,
        Ok(false) => match manager.persist() {
            Ok(true) => PersistenceOutcome::Granted,
            Ok(false) => PersistenceOutcome::Denied,
            Err(err) => PersistenceOutcome::Failed(err.to_string()),
        },
        Err(err) => PersistenceOutcome::Failed(err.to_string()),
    };

    #[cfg(feature = "tracing")]
    match &outcome {
        PersistenceOutcome::AlreadyPersisted => tracing::info!("Storage is already persisted"),
        PersistenceOutcome::Granted => tracing::info!("Persistent storage granted"),
        PersistenceOutcome::Denied => {
            tracing::warn!("Persistent storage denied, caching for this session only")
        }
        PersistenceOutcome::Disabled => {}
        PersistenceOutcome::Failed(_reason) => {
            tracing::warn!("Persistent storage request failed: {_reason}")
        }
    }

    outcome
}

/// Opens the result backend for `config`: SQLite in the cache directory when
/// durable storage is available, otherwise an in-memory backend.
pub fn open_result_backend(
    config: &WorkerConfig,
    manager: &dyn StorageManager,
) -> (Arc<dyn ResultBackend>, PersistenceOutcome) {
    if !config.use_persistence {
        #[cfg(feature = "tracing")]
        tracing::info!("Persistence disabled, caching for this session only");
        return (Arc::new(MemoryBackend::default()), PersistenceOutcome::Disabled);
    }

    let outcome = negotiate_persistence(manager);
    if !outcome.is_durable() {
        return (Arc::new(MemoryBackend::default()), outcome);
    }

    match SqliteBackend::open(config.result_db_path()) {
        Ok(backend) => (Arc::new(backend), outcome),
        Err(err) => {
            #[cfg(feature = "tracing")]
            tracing::warn!("Falling back to session cache: {err}");
            (
                Arc::new(MemoryBackend::default()),
                PersistenceOutcome::Failed(err.to_string()),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scripted {
        persisted: Result<bool>,
        persist: Result<bool>,
    }

    impl StorageManager for Scripted {
        fn persisted(&self) -> Result<bool> {
            self.persisted.clone()
        }

        fn persist(&self) -> Result<bool> {
            self.persist.clone()
        }
    }

    #[test]
    fn negotiation_covers_every_answer() {
        let cases = [
            (Ok(true), Ok(false), PersistenceOutcome::AlreadyPersisted),
            (Ok(false), Ok(true), PersistenceOutcome::Granted),
            (Ok(false), Ok(false), PersistenceOutcome::Denied),
        ];
        for (persisted, persist, expected) in cases {
            assert_eq!(negotiate_persistence(&Scripted { persisted, persist }), expected);
        }

        let failed = negotiate_persistence(&Scripted {
            persisted: Err(Error::Storage {
                context: "quota".into(),
            }),
            persist: Ok(true),
        });
        assert!(matches!(failed, PersistenceOutcome::Failed(reason) if reason.contains("quota")));
    }

    #[test]
    fn directory_manager_creates_the_cache_dir() {
        let root = tempfile::tempdir().unwrap();
        let manager = DirectoryStorageManager::new(root.path().join("cache"));

        assert!(!manager.persisted().unwrap());
        assert!(manager.persist().unwrap());
        assert!(manager.persisted().unwrap());
        assert!(!manager.dir().join(PROBE_FILE).exists());
    }

    #[test]
    fn durable_outcome_opens_sqlite_in_the_cache_dir() {
        let root = tempfile::tempdir().unwrap();
        let config = WorkerConfig {
            cache_dir: root.path().join("cache"),
            ..Default::default()
        };
        let manager = DirectoryStorageManager::new(&config.cache_dir);

        let (_backend, outcome) = open_result_backend(&config, &manager);

        assert_eq!(outcome, PersistenceOutcome::Granted);
        assert!(config.result_db_path().exists());
    }

    #[test]
    fn disabled_persistence_skips_negotiation() {
        let config = WorkerConfig {
            use_persistence: false,
            ..Default::default()
        };
        let manager = Scripted {
            persisted: Err(Error::Storage {
                context: "must not be asked".into(),
            }),
            persist: Ok(true),
        };
        let (_backend, outcome) = open_result_backend(&config, &manager);
        assert_eq!(outcome, PersistenceOutcome::Disabled);
    }
}
