//! facelog-store — SQLite-backed identity store and attendance log.
//!
//! Two tables: `identities` (one row per registered embedding, names may
//! repeat) and `attendance` (append-only event log, foreign-keyed to
//! identities). Embeddings are stored as versioned little-endian f32
//! blobs; see [`encoding`].

pub mod encoding;

use chrono::NaiveDateTime;
use encoding::{decode_embedding, encode_embedding, DecodeError};
use facelog_core::{Embedding, KnownFace};
use rusqlite::{params, Connection};
use std::path::Path;
use thiserror::Error;

/// Timestamp format used in both tables.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("embedding decode failed for identity {id}: {source}")]
    Decode {
        id: i64,
        #[source]
        source: DecodeError,
    },
    #[error("no such identity: {0}")]
    UnknownIdentity(i64),
    #[error("registration requires at least one embedding")]
    NoEmbeddings,
    #[error("failed to create database directory: {0}")]
    CreateDir(#[from] std::io::Error),
}

/// Attendance event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    CheckIn,
    CheckOut,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::CheckIn => "checkin",
            EventKind::CheckOut => "checkout",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the attendance log, joined with the identity name.
#[derive(Debug, Clone)]
pub struct AttendanceRecord {
    pub id: i64,
    pub identity_id: i64,
    pub name: String,
    pub event: String,
    pub timestamp: String,
}

/// Handle to the SQLite database. Passed explicitly to every operation
/// that needs it; there is no global connection.
pub struct IdentityStore {
    conn: Connection,
}

impl IdentityStore {
    /// Open (or create) the database at `path` and apply the schema.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(path)?;
        tracing::info!(path = %path.display(), "opened identity store");
        Self::init(conn)
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS identities (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                embedding BLOB NOT NULL,
                registered_at TEXT NOT NULL DEFAULT (datetime('now', 'localtime'))
            );
            CREATE TABLE IF NOT EXISTS attendance (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                identity_id INTEGER NOT NULL REFERENCES identities(id),
                event TEXT NOT NULL CHECK (event IN ('checkin', 'checkout')),
                timestamp TEXT NOT NULL
            );",
        )?;
        Ok(Self { conn })
    }

    /// Store one identity row per embedding, all under `name`. Returns
    /// the id of the last inserted row. Names are not unique; repeated
    /// registrations simply accumulate candidate embeddings.
    pub fn register(&self, name: &str, embeddings: &[Embedding]) -> Result<i64, StoreError> {
        if embeddings.is_empty() {
            return Err(StoreError::NoEmbeddings);
        }

        let tx = self.conn.unchecked_transaction()?;
        let mut last_id = 0i64;
        for embedding in embeddings {
            tx.execute(
                "INSERT INTO identities (name, embedding) VALUES (?1, ?2)",
                params![name, encode_embedding(embedding)],
            )?;
            last_id = tx.last_insert_rowid();
        }
        tx.commit()?;

        tracing::info!(name, count = embeddings.len(), id = last_id, "registered identity");
        Ok(last_id)
    }

    /// Load every stored identity in rowid order, for in-memory matching.
    pub fn load_all(&self) -> Result<Vec<KnownFace>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, embedding FROM identities ORDER BY id")?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Vec<u8>>(2)?,
            ))
        })?;

        let mut known = Vec::new();
        for row in rows {
            let (id, name, blob) = row?;
            let embedding =
                decode_embedding(&blob).map_err(|source| StoreError::Decode { id, source })?;
            known.push(KnownFace { id, name, embedding });
        }
        Ok(known)
    }

    /// Append one attendance event. Fails with [`StoreError::UnknownIdentity`]
    /// when `identity_id` does not reference a stored identity; no row is
    /// written in that case.
    pub fn append_attendance(
        &self,
        identity_id: i64,
        event: EventKind,
        timestamp: NaiveDateTime,
    ) -> Result<i64, StoreError> {
        let result = self.conn.execute(
            "INSERT INTO attendance (identity_id, event, timestamp) VALUES (?1, ?2, ?3)",
            params![
                identity_id,
                event.as_str(),
                timestamp.format(TIMESTAMP_FORMAT).to_string()
            ],
        );

        match result {
            Ok(_) => {
                let id = self.conn.last_insert_rowid();
                tracing::info!(identity_id, event = %event, record = id, "attendance recorded");
                Ok(id)
            }
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::UnknownIdentity(identity_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Most recent attendance records (newest first), joined with names.
    pub fn attendance_log(&self, limit: usize) -> Result<Vec<AttendanceRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT a.id, a.identity_id, i.name, a.event, a.timestamp
             FROM attendance a JOIN identities i ON i.id = a.identity_id
             ORDER BY a.id DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(AttendanceRecord {
                id: row.get(0)?,
                identity_id: row.get(1)?,
                name: row.get(2)?,
                event: row.get(3)?,
                timestamp: row.get(4)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
