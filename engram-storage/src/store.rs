use rusqlite::Connection;
use tokio::sync::Mutex;

use engram_core::errors::EngramError;

/// Convert a rusqlite or ad-hoc message into an [`EngramError::StorageError`].
pub fn to_storage_err(msg: impl std::fmt::Display) -> EngramError {
    EngramError::StorageError {
        message: msg.to_string(),
    }
}

/// Single-writer SQLite store. Every store trait in this crate is
/// implemented on `Store` and serializes through the same guarded
/// connection — WAL mode lets concurrent readers proceed without
/// blocking on the writer, matching the single-connection-plus-WAL
/// pattern the stores in this workspace are built around.
pub struct Store {
    pub(crate) conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) a database file and run pending migrations.
    pub fn open(path: &str) -> Result<Self, EngramError> {
        let conn = Connection::open(path).map_err(to_storage_err)?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory database. Used by tests and by agents
    /// that opt out of durable storage.
    pub fn open_in_memory() -> Result<Self, EngramError> {
        let conn = Connection::open_in_memory().map_err(to_storage_err)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, EngramError> {
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(to_storage_err)?;
        conn.pragma_update(None, "foreign_keys", true)
            .map_err(to_storage_err)?;
        crate::migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}
