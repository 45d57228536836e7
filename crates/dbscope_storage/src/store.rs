use chrono::{DateTime, Utc};
use dbscope_core::{BackendKind, ConnectionProfile, DbError, StorageOp};
use log::{info, warn};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS connections (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    kind TEXT NOT NULL,
    dsn TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
";

/// Persistent store for connection profiles, backed by a local SQLite file.
///
/// The schema is ensured idempotently on every open. Failures carry the
/// storage operation that broke (open/migrate/create/find/delete).
pub struct ProfileStore {
    conn: Mutex<Connection>,
}

impl ProfileStore {
    /// Open (or create) the store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DbError::storage(StorageOp::Open, e))?;
        }

        let conn =
            Connection::open(path).map_err(|e| DbError::storage(StorageOp::Open, e))?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.ensure_schema()?;

        info!("profile store ready at {}", path.display());
        Ok(store)
    }

    /// Open the store at its default location under the user config
    /// directory.
    pub fn open_default() -> Result<Self, DbError> {
        Self::open(default_store_path()?)
    }

    /// In-memory store, handy for tests and throwaway sessions.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::storage(StorageOp::Open, e))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&self) -> Result<(), DbError> {
        self.lock()
            .execute_batch(SCHEMA)
            .map_err(|e| DbError::storage(StorageOp::Migrate, e))
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Insert a new profile and return it with its assigned id.
    ///
    /// The DSN is stored verbatim; it is not validated here.
    pub fn save(
        &self,
        name: &str,
        kind: BackendKind,
        dsn: &str,
    ) -> Result<ConnectionProfile, DbError> {
        let now = Utc::now();
        let conn = self.lock();

        conn.execute(
            "INSERT INTO connections (name, kind, dsn, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                name,
                kind.as_str(),
                dsn,
                now.to_rfc3339(),
                now.to_rfc3339()
            ],
        )
        .map_err(|e| DbError::storage(StorageOp::Create, e))?;

        let id = conn.last_insert_rowid();
        info!("saved connection profile {name} ({kind}) as id {id}");

        Ok(ConnectionProfile {
            id,
            name: name.to_string(),
            kind,
            dsn: dsn.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    /// All stored profiles, in storage order.
    ///
    /// Rows that no longer decode (unknown kind, mangled timestamp) are
    /// skipped with a warning instead of failing the listing.
    pub fn list(&self) -> Result<Vec<ConnectionProfile>, DbError> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare("SELECT id, name, kind, dsn, created_at, updated_at FROM connections")
            .map_err(|e| DbError::storage(StorageOp::Find, e))?;

        let rows = stmt
            .query_map([], raw_profile_row)
            .map_err(|e| DbError::storage(StorageOp::Find, e))?
            .filter_map(|r| r.ok())
            .filter_map(|raw| match decode_profile(raw) {
                Ok(profile) => Some(profile),
                Err(e) => {
                    warn!("skipping undecodable profile row: {e}");
                    None
                }
            })
            .collect();

        Ok(rows)
    }

    /// Look up one profile by id.
    pub fn find(&self, id: i64) -> Result<Option<ConnectionProfile>, DbError> {
        let conn = self.lock();
        let raw = conn
            .query_row(
                "SELECT id, name, kind, dsn, created_at, updated_at
                 FROM connections WHERE id = ?1",
                [id],
                raw_profile_row,
            )
            .optional()
            .map_err(|e| DbError::storage(StorageOp::Find, e))?;

        match raw {
            Some(raw) => decode_profile(raw).map(Some),
            None => Ok(None),
        }
    }

    /// Delete a profile by id. Deleting an absent id is not an error.
    pub fn delete(&self, id: i64) -> Result<(), DbError> {
        self.lock()
            .execute("DELETE FROM connections WHERE id = ?1", [id])
            .map_err(|e| DbError::storage(StorageOp::Delete, e))?;

        info!("deleted connection profile {id}");
        Ok(())
    }
}

type RawProfileRow = (i64, String, String, String, String, String);

fn raw_profile_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawProfileRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn decode_profile(raw: RawProfileRow) -> Result<ConnectionProfile, DbError> {
    let (id, name, kind, dsn, created_at, updated_at) = raw;

    let kind = BackendKind::parse(&kind)
        .map_err(|_| DbError::storage(StorageOp::Find, format!("unknown backend kind {kind:?}")))?;

    Ok(ConnectionProfile {
        id,
        name,
        kind,
        dsn,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::storage(StorageOp::Find, format!("bad timestamp {raw:?}: {e}")))
}

fn default_store_path() -> Result<PathBuf, DbError> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| DbError::storage(StorageOp::Open, "could not find config directory"))?;

    Ok(config_dir.join("dbscope").join("profiles.db"))
}
