//! Database connection management.
//!
//! [`Store`] is the cloneable handle the ledger keeps around: it knows where
//! the database lives and guarantees that migrations ran before the first
//! connection is handed out.  [`Database`] owns one [`rusqlite::Connection`]
//! and is used by a single thread for the duration of one operation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use coinshop_shared::constants::DATABASE_FILE_NAME;
use directories::ProjectDirs;
use rusqlite::{Connection, TransactionBehavior};

use crate::error::{Result, StoreError};
use crate::migrations;
use crate::unit_of_work::UnitOfWork;

/// Handle to an on-disk ledger database.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
    busy_timeout: Duration,
}

impl Store {
    /// Default database location in the platform data directory:
    /// - Linux:   `~/.local/share/coinshop/coinshop.db`
    /// - macOS:   `~/Library/Application Support/com.coinshop.coinshop/coinshop.db`
    /// - Windows: `{FOLDERID_RoamingAppData}\coinshop\coinshop\data\coinshop.db`
    pub fn default_path() -> Result<PathBuf> {
        let project_dirs =
            ProjectDirs::from("com", "coinshop", "coinshop").ok_or(StoreError::NoDataDir)?;
        Ok(project_dirs.data_dir().join(DATABASE_FILE_NAME))
    }

    /// Open (or create) the database at `path` and bring its schema up to
    /// date.
    ///
    /// `busy_timeout` bounds how long a connection waits for another
    /// writer's lock before the operation fails.
    pub fn open(path: impl Into<PathBuf>, busy_timeout: Duration) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        tracing::info!(path = %path.display(), "opening ledger database");

        let db = Database::open_at(&path, busy_timeout)?;
        migrations::run_migrations(db.conn())?;

        Ok(Self { path, busy_timeout })
    }

    /// Open a fresh connection to the store.
    pub fn connect(&self) -> Result<Database> {
        Database::open_at(&self.path, self.busy_timeout)
    }

    /// Filesystem path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Wrapper around a [`rusqlite::Connection`].
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open a connection to an existing (or new) database file.
    ///
    /// Migrations are not run here; go through [`Store::open`] once per
    /// process before connecting.
    pub fn open_at(path: &Path, busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;

        // Readers keep working while a writer holds the lock.
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::trace!(journal_mode = %mode, "connection opened");
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Ok(Self { conn })
    }

    /// Return a reference to the underlying `rusqlite::Connection`.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Return a mutable reference to the underlying connection.
    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Return the filesystem path of the open database (if any).
    pub fn path(&self) -> Option<PathBuf> {
        self.conn.path().map(PathBuf::from)
    }

    /// Run `f` as one all-or-nothing unit of work.
    ///
    /// The transaction is opened with `BEGIN IMMEDIATE`, so the write lock
    /// is held from the first read: two units of work never interleave
    /// their read-check-write sequences.  The transaction commits only when
    /// `f` returns `Ok`; an `Err`, a failed commit, or a panic inside `f`
    /// rolls every write back.
    pub fn unit_of_work<T, E, F>(&mut self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&UnitOfWork<'_>) -> std::result::Result<T, E>,
        E: From<StoreError>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;
        let uow = UnitOfWork::new(tx);

        match f(&uow) {
            Ok(value) => {
                uow.commit()?;
                Ok(value)
            }
            Err(err) => {
                uow.abort();
                Err(err)
            }
        }
    }
}
