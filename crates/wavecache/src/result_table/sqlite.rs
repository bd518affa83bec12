//! SQLite-backed durable result storage.

use super::ResultBackend;
use crate::{Error, Result};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use std::collections::HashMap;
use std::path::Path;

/// Upper bound on bound parameters per `IN (...)` statement.
const MAX_PARAMS_PER_STATEMENT: usize = 500;

const SCHEMA_SQL: &str = "CREATE TABLE IF NOT EXISTS results (
    id TEXT PRIMARY KEY NOT NULL,
    value BLOB NOT NULL
);";

pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

fn storage_err(err: rusqlite::Error) -> Error {
    Error::Storage {
        context: err.to_string(),
    }
}

impl SqliteBackend {
    /// Opens (or creates) the database at `path` in WAL mode.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(storage_err)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(storage_err)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(storage_err)?;
        conn.execute_batch("PRAGMA synchronous = NORMAL;")
            .map_err(storage_err)?;
        conn.execute_batch(SCHEMA_SQL).map_err(storage_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl ResultBackend for SqliteBackend {
    fn contains(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let found = conn
            .query_row("SELECT 1 FROM results WHERE id = ?1", params![id], |_| Ok(()))
            .optional()
            .map_err(storage_err)?;
        Ok(found.is_some())
    }

    fn bulk_get(&self, ids: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        let conn = self.conn.lock();
        let mut found: HashMap<String, Vec<u8>> = HashMap::with_capacity(ids.len());

        for chunk in ids.chunks(MAX_PARAMS_PER_STATEMENT) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!("SELECT id, value FROM results WHERE id IN ({placeholders})");
            let mut stmt = conn.prepare_cached(&sql).map_err(storage_err)?;
            let rows = stmt
                .query_map(params_from_iter(chunk.iter()), |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
                })
                .map_err(storage_err)?;
            for row in rows {
                let (id, value) = row.map_err(storage_err)?;
                found.insert(id, value);
            }
        }

        // Duplicate ids in one batch each get their own copy.
        Ok(ids.iter().map(|id| found.get(id).cloned()).collect())
    }

    fn bulk_put(&self, entries: Vec<(String, Vec<u8>)>) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(storage_err)?;
        {
            let mut stmt = tx
                .prepare_cached("INSERT OR REPLACE INTO results (id, value) VALUES (?1, ?2)")
                .map_err(storage_err)?;
            for (id, value) in &entries {
                stmt.execute(params![id, value]).map_err(storage_err)?;
            }
        }
        tx.commit().map_err(storage_err)
    }

    fn bulk_delete(&self, ids: &[String]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(storage_err)?;
        for chunk in ids.chunks(MAX_PARAMS_PER_STATEMENT) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!("DELETE FROM results WHERE id IN ({placeholders})");
            tx.execute(&sql, params_from_iter(chunk.iter()))
                .map_err(storage_err)?;
        }
        tx.commit().map_err(storage_err)
    }

    fn clear(&self) -> Result<()> {
        self.conn
            .lock()
            .execute("DELETE FROM results", [])
            .map(|_| ())
            .map_err(storage_err)
    }
}
