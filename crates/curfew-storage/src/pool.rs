//! Shared SQLite connection.
//!
//! Settings and catalog reads are a handful of indexed lookups per request,
//! so every caller shares one connection behind a mutex.

use std::ops::Deref;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::Connection;
use tracing::debug;

use crate::error::{Result, StorageError};
use crate::schema::run_migrations;

/// How long a write waits for another process holding the database lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Cloneable handle to the migrated connection.
#[derive(Clone)]
pub struct ConnectionPool {
    conn: Arc<Mutex<Connection>>,
}

impl ConnectionPool {
    /// Opens (creating if needed) the database file at `path`.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::prepare(Connection::open(path)?)
    }

    /// Opens a private in-memory database.
    pub fn in_memory() -> Result<Self> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA synchronous = NORMAL;")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        // In-memory databases stay in "memory" mode.
        let journal_mode: String =
            conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        debug!(%journal_mode, "Connection opened");

        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Locks the connection for the duration of one repository call.
    pub fn get(&self) -> Result<PooledConnection<'_>> {
        self.conn
            .lock()
            .map(PooledConnection)
            .map_err(|_| StorageError::Poisoned)
    }
}

/// The locked connection.
pub struct PooledConnection<'a>(MutexGuard<'a, Connection>);

impl Deref for PooledConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.0
    }
}
