//! SQLite persistence for service requests and reference data.
//!
//! One database file holds every collection. Scalar request fields live in
//! the `requests` table and are written back whole on update; notes,
//! activities and document references are separate rows appended with plain
//! INSERTs, so two writers cannot overwrite each other's history entries.
//!
//! Timestamps are stored as INTEGER unix milliseconds: listing needs SQL
//! `ORDER BY` and range filters on `created_at`, which text timestamps of
//! varying precision cannot provide.

mod activity;
mod document;
mod note;
mod refdata;
mod request;

use std::fs;
use std::path::{Path, PathBuf};

use jiff::Timestamp;
use rusqlite::Connection;
use uuid::Uuid;

pub use refdata::{ConsularService, Organization, Profile, RefDataFile};
pub use request::RequestFilter;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Lookup matched no request. Distinct from any database failure.
    #[error("request not found: {0}")]
    RequestNotFound(String),

    #[error("request already exists: {0}")]
    RequestAlreadyExists(Uuid),

    /// An id prefix matched more than one request.
    #[error("ambiguous request id: {0}")]
    AmbiguousId(String),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

pub type Result<T> = core::result::Result<T, StorageError>;

/// SQLite-backed storage, injected into the lifecycle engine by the caller.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Opens (creating if needed) the database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        init(&conn)?;
        Ok(Self { conn })
    }

    /// An in-memory database, for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        init(&conn)?;
        Ok(Self { conn })
    }

    /// Returns the default database path: `~/.guichet/guichet.sqlite`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".guichet").join("guichet.sqlite"))
    }
}

fn init(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r"
        CREATE TABLE IF NOT EXISTS requests (
          id                TEXT PRIMARY KEY,
          number            TEXT NOT NULL UNIQUE,
          status            TEXT NOT NULL,
          priority          TEXT NOT NULL,
          service_id        TEXT NOT NULL,
          organization_id   TEXT NOT NULL,
          profile_id        TEXT NOT NULL,
          requester_id      TEXT NOT NULL,
          assigned_agent_id TEXT,
          data_json         TEXT NOT NULL,
          created_at        INTEGER NOT NULL,
          submitted_at      INTEGER,
          assigned_at       INTEGER,
          completed_at      INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_requests_created_at ON requests(created_at);
        CREATE INDEX IF NOT EXISTS idx_requests_status ON requests(status);

        CREATE TABLE IF NOT EXISTS notes (
          id         INTEGER PRIMARY KEY AUTOINCREMENT,
          request_id TEXT NOT NULL REFERENCES requests(id),
          kind       TEXT NOT NULL,
          content    TEXT NOT NULL,
          author_id  TEXT,
          created_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_notes_request ON notes(request_id);

        CREATE TABLE IF NOT EXISTS activities (
          id         INTEGER PRIMARY KEY AUTOINCREMENT,
          request_id TEXT NOT NULL REFERENCES requests(id),
          kind       TEXT NOT NULL,
          actor_id   TEXT,
          data_json  TEXT NOT NULL,
          at         INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_activities_request ON activities(request_id);

        CREATE TABLE IF NOT EXISTS documents (
          request_id  TEXT NOT NULL REFERENCES requests(id),
          document_id TEXT NOT NULL,
          PRIMARY KEY (request_id, document_id)
        );

        CREATE TABLE IF NOT EXISTS services (
          id       TEXT PRIMARY KEY,
          name     TEXT NOT NULL,
          category TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS organizations (
          id           TEXT PRIMARY KEY,
          name         TEXT NOT NULL,
          country_code TEXT NOT NULL,
          city         TEXT
        );

        CREATE TABLE IF NOT EXISTS profiles (
          id        TEXT PRIMARY KEY,
          full_name TEXT NOT NULL,
          email     TEXT
        );
        ",
    )?;
    Ok(())
}

/// Converts a stored millisecond column back into a timestamp.
fn timestamp_from_ms(ms: i64) -> Result<Timestamp> {
    Timestamp::from_millisecond(ms)
        .map_err(|e| StorageError::Corrupt(format!("invalid timestamp {ms}: {e}")))
}
