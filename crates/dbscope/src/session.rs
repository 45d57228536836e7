use dbscope_core::{
    BackendKind, ColumnInfo, ConnectionManager, ConnectionProfile, DataPage, DbDriver, DbError,
    Pagination, TableInfo,
};
use dbscope_driver_postgres::PostgresDriver;
use dbscope_driver_sqlite::SqliteDriver;
use dbscope_storage::ProfileStore;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Driver registry with every built-in backend.
pub fn default_drivers() -> HashMap<BackendKind, Arc<dyn DbDriver>> {
    let mut drivers: HashMap<BackendKind, Arc<dyn DbDriver>> = HashMap::new();
    drivers.insert(BackendKind::Postgres, Arc::new(PostgresDriver::new()));
    drivers.insert(BackendKind::SQLite, Arc::new(SqliteDriver::new()));
    drivers
}

/// Composes the profile store and the connection manager into the single
/// surface a UI or CLI talks to.
///
/// Cross-cutting operations that span both live here; single-concern calls
/// delegate straight to the owning component.
pub struct Session {
    store: ProfileStore,
    manager: ConnectionManager,
}

impl Session {
    pub fn new(store: ProfileStore, drivers: HashMap<BackendKind, Arc<dyn DbDriver>>) -> Self {
        Self {
            store,
            manager: ConnectionManager::new(drivers),
        }
    }

    /// Session over the default store location and built-in drivers.
    ///
    /// A failure here means profiles cannot be persisted at all; hosts
    /// should treat it as fatal at startup.
    pub fn open_default() -> Result<Self, DbError> {
        Ok(Self::new(ProfileStore::open_default()?, default_drivers()))
    }

    // --- Profile management ---

    pub fn save_connection(
        &self,
        name: &str,
        kind: BackendKind,
        dsn: &str,
    ) -> Result<ConnectionProfile, DbError> {
        self.store.save(name, kind, dsn)
    }

    pub fn list_connections(&self) -> Result<Vec<ConnectionProfile>, DbError> {
        self.store.list()
    }

    /// Delete a profile; when it backs the active connection, that
    /// connection is closed and cleared as a side effect.
    pub fn delete_connection(&self, id: i64) -> Result<(), DbError> {
        self.store.delete(id)?;
        self.manager.profile_deleted(id);
        Ok(())
    }

    // --- Connection lifecycle ---

    pub fn connect(&self, id: i64) -> Result<(), DbError> {
        let profile = self
            .store
            .find(id)?
            .ok_or(DbError::ProfileNotFound(id))?;
        self.manager.connect(&profile)
    }

    pub fn test_connection(&self, kind: BackendKind, dsn: &str) -> Result<(), DbError> {
        self.manager.test_connection(kind, dsn)
    }

    pub fn disconnect(&self) {
        self.manager.disconnect();
    }

    pub fn active_profile_id(&self) -> Option<i64> {
        self.manager.active_profile_id()
    }

    // --- Introspection and data ---

    pub fn list_tables(&self) -> Result<Vec<TableInfo>, DbError> {
        self.manager.list_tables()
    }

    pub fn list_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, DbError> {
        self.manager.list_columns(table)
    }

    pub fn get_page(&self, table: &str, offset: u64, limit: u32) -> Result<DataPage, DbError> {
        self.manager
            .fetch_page(table, &Pagination::new(offset, limit), None)
    }

    /// `get_page` with a deadline for counts and scans over huge tables.
    pub fn get_page_with_timeout(
        &self,
        table: &str,
        offset: u64,
        limit: u32,
        timeout: Duration,
    ) -> Result<DataPage, DbError> {
        self.manager
            .fetch_page(table, &Pagination::new(offset, limit), Some(timeout))
    }
}
