use crate::{
    BackendKind, ColumnInfo, Connection, ConnectionProfile, DataPage, DbDriver, DbError,
    Pagination, TableInfo, TableRef, introspect, reader,
};
use log::{error, info};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

struct ActiveConnection {
    profile_id: i64,
    connection: Box<dyn Connection>,
}

/// Owns the single active connection and the driver registry.
///
/// `connect`, `disconnect`, `profile_deleted`, and every introspection or
/// data call serialize on the internal lock, so the active handle can never
/// be closed while a query against it is in flight. `test_connection` only
/// uses ephemeral handles and never takes that lock.
pub struct ConnectionManager {
    drivers: HashMap<BackendKind, Arc<dyn DbDriver>>,
    active: Mutex<Option<ActiveConnection>>,
}

impl ConnectionManager {
    pub fn new(drivers: HashMap<BackendKind, Arc<dyn DbDriver>>) -> Self {
        Self {
            drivers,
            active: Mutex::new(None),
        }
    }

    fn driver_for(&self, kind: BackendKind) -> Result<Arc<dyn DbDriver>, DbError> {
        self.drivers
            .get(&kind)
            .cloned()
            .ok_or_else(|| DbError::UnsupportedBackend(kind.as_str().to_string()))
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<ActiveConnection>> {
        match self.active.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn close_connection(mut active: ActiveConnection) {
        if let Err(e) = active.connection.close() {
            error!("failed to close connection for profile {}: {e}", active.profile_id);
        }
    }

    /// Open, ping, and activate a connection for the given profile.
    ///
    /// The fresh handle is released before returning if the ping fails, and
    /// the previously active connection (if any) is left untouched in that
    /// case. On success the previous connection is closed and replaced in
    /// one step under the lock.
    pub fn connect(&self, profile: &ConnectionProfile) -> Result<(), DbError> {
        let driver = self.driver_for(profile.kind)?;
        info!("connecting to {} via {}", profile.name, driver.display_name());

        let mut connection = driver.connect(&profile.dsn)?;

        if let Err(e) = connection.ping() {
            if let Err(close_err) = connection.close() {
                error!("failed to close unreachable connection: {close_err}");
            }
            return Err(match e {
                DbError::ConnectionUnreachable(_) => e,
                other => DbError::ConnectionUnreachable(other.to_string()),
            });
        }

        let mut active = self.lock_active();
        let previous = active.replace(ActiveConnection {
            profile_id: profile.id,
            connection,
        });
        drop(active);

        if let Some(previous) = previous {
            info!("replacing active connection for profile {}", previous.profile_id);
            Self::close_connection(previous);
        }

        Ok(())
    }

    /// Probe a backend/DSN pair without mutating the active connection.
    pub fn test_connection(&self, kind: BackendKind, dsn: &str) -> Result<(), DbError> {
        let driver = self.driver_for(kind)?;
        driver.test_connection(dsn)
    }

    /// Close and clear the active connection, if any.
    pub fn disconnect(&self) {
        let taken = self.lock_active().take();
        if let Some(active) = taken {
            info!("disconnecting profile {}", active.profile_id);
            Self::close_connection(active);
        }
    }

    /// Cross-component hook: a profile was deleted from the store. Clears
    /// the active connection iff it was opened from that profile.
    pub fn profile_deleted(&self, profile_id: i64) {
        let mut guard = self.lock_active();
        if guard.as_ref().is_some_and(|a| a.profile_id == profile_id) {
            let active = guard.take();
            drop(guard);
            if let Some(active) = active {
                info!("active profile {} deleted, closing connection", profile_id);
                Self::close_connection(active);
            }
        }
    }

    pub fn active_profile_id(&self) -> Option<i64> {
        self.lock_active().as_ref().map(|a| a.profile_id)
    }

    pub fn is_connected(&self) -> bool {
        self.active_profile_id().is_some()
    }

    /// Run an operation against the active connection, holding the lock for
    /// its whole duration. Fails `NoActiveConnection` when nothing is
    /// connected.
    pub fn with_active<R>(
        &self,
        f: impl FnOnce(&dyn Connection) -> Result<R, DbError>,
    ) -> Result<R, DbError> {
        let guard = self.lock_active();
        let active = guard.as_ref().ok_or(DbError::NoActiveConnection)?;
        f(active.connection.as_ref())
    }

    pub fn list_tables(&self) -> Result<Vec<TableInfo>, DbError> {
        self.with_active(introspect::list_tables)
    }

    pub fn list_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, DbError> {
        let table = TableRef::parse(table)?;
        self.with_active(|conn| introspect::list_columns(conn, &table))
    }

    pub fn fetch_page(
        &self,
        table: &str,
        page: &Pagination,
        timeout: Option<Duration>,
    ) -> Result<DataPage, DbError> {
        let table = TableRef::parse(table)?;
        self.with_active(|conn| reader::fetch_page(conn, &table, page, timeout))
    }
}
