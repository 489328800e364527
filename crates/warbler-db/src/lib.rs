pub mod migrations;
pub mod models;
pub mod queries;
pub mod repository;

pub use repository::Repository;

use rusqlite::{Connection, ErrorCode, ffi};
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A UNIQUE or PRIMARY KEY constraint rejected the write.
    /// Carries the constrained columns, e.g. `users.username`.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("row not found")]
    NotFound,

    #[error("database lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Sqlite(rusqlite::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ref code, ref msg) = err {
            let unique = code.code == ErrorCode::ConstraintViolation
                && (code.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                    || code.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY);
            if unique {
                let target = msg
                    .as_deref()
                    .and_then(|m| m.split_once("failed: "))
                    .map(|(_, cols)| cols.trim().to_string())
                    .unwrap_or_default();
                return StoreError::UniqueViolation(target);
            }
        }
        StoreError::Sqlite(err)
    }
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent readers (e.g. the sqlite3 shell)
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let db = Self::init(conn)?;
        info!("Database opened at {}", path.display());
        Ok(db)
    }

    /// Fresh private database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        f(&conn)
    }
}
