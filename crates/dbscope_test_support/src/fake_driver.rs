use dbscope_core::{
    BackendKind, ColumnInfo, Connection, DbDriver, DbError, Pagination, Row, RowSet, TableRef,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

/// In-memory table served by the fake driver.
#[derive(Debug, Clone)]
pub struct FakeTable {
    pub table: TableRef,
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Row>,
}

impl FakeTable {
    pub fn new(table: TableRef, columns: Vec<ColumnInfo>, rows: Vec<Row>) -> Self {
        Self {
            table,
            columns,
            rows,
        }
    }
}

/// Observable call counts, for asserting resource discipline in tests.
#[derive(Debug, Clone, Default)]
pub struct FakeDriverStats {
    pub connections_opened: usize,
    pub close_calls: usize,
    pub count_queries: usize,
    pub page_queries: usize,
}

#[derive(Default)]
struct FakeDriverState {
    tables: RwLock<Vec<FakeTable>>,
    connect_error: RwLock<Option<String>>,
    ping_error: RwLock<Option<String>>,
    count_errors: RwLock<HashSet<String>>,
    column_errors: RwLock<HashSet<String>>,
    page_errors: RwLock<HashSet<String>>,
    connections_opened: AtomicUsize,
    close_calls: AtomicUsize,
    count_queries: AtomicUsize,
    page_queries: AtomicUsize,
}

/// Deterministic in-memory driver for contract tests.
///
/// Serves a scripted set of tables and lets tests inject failures at each
/// seam: connect, ping, per-table count, per-table column listing, and
/// per-table page query. Call counts are observable through `stats()`.
#[derive(Clone)]
pub struct FakeDriver {
    kind: BackendKind,
    state: Arc<FakeDriverState>,
}

impl FakeDriver {
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            state: Arc::new(FakeDriverState::default()),
        }
    }

    pub fn with_table(self, table: FakeTable) -> Self {
        rwlock_write(&self.state.tables).push(table);
        self
    }

    pub fn with_connect_error(self, message: impl Into<String>) -> Self {
        *rwlock_write(&self.state.connect_error) = Some(message.into());
        self
    }

    pub fn with_ping_error(self, message: impl Into<String>) -> Self {
        *rwlock_write(&self.state.ping_error) = Some(message.into());
        self
    }

    pub fn with_count_error(self, table: impl Into<String>) -> Self {
        rwlock_write(&self.state.count_errors).insert(table.into());
        self
    }

    pub fn with_column_error(self, table: impl Into<String>) -> Self {
        rwlock_write(&self.state.column_errors).insert(table.into());
        self
    }

    pub fn with_page_error(self, table: impl Into<String>) -> Self {
        rwlock_write(&self.state.page_errors).insert(table.into());
        self
    }

    /// Change the ping outcome after connections were already handed out.
    pub fn set_ping_error(&self, message: Option<String>) {
        *rwlock_write(&self.state.ping_error) = message;
    }

    pub fn stats(&self) -> FakeDriverStats {
        FakeDriverStats {
            connections_opened: self.state.connections_opened.load(Ordering::Relaxed),
            close_calls: self.state.close_calls.load(Ordering::Relaxed),
            count_queries: self.state.count_queries.load(Ordering::Relaxed),
            page_queries: self.state.page_queries.load(Ordering::Relaxed),
        }
    }

    pub fn as_driver_arc(self) -> Arc<dyn DbDriver> {
        Arc::new(self)
    }
}

impl DbDriver for FakeDriver {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn connect(&self, _dsn: &str) -> Result<Box<dyn Connection>, DbError> {
        if let Some(message) = rwlock_read(&self.state.connect_error).clone() {
            return Err(DbError::ConnectionUnreachable(message));
        }

        self.state.connections_opened.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(FakeConnection {
            kind: self.kind,
            state: self.state.clone(),
        }))
    }
}

struct FakeConnection {
    kind: BackendKind,
    state: Arc<FakeDriverState>,
}

impl FakeConnection {
    fn find_table(&self, table: &TableRef) -> Result<FakeTable, DbError> {
        rwlock_read(&self.state.tables)
            .iter()
            .find(|t| t.table.name == table.name)
            .cloned()
            .ok_or_else(|| DbError::QueryFailed(format!("no such table: {}", table)))
    }

    fn fail_if_scripted(&self, set: &RwLock<HashSet<String>>, table: &TableRef) -> Result<(), DbError> {
        if rwlock_read(set).contains(&table.name) {
            return Err(DbError::QueryFailed(format!("scripted failure for {}", table)));
        }
        Ok(())
    }
}

impl Connection for FakeConnection {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn ping(&self) -> Result<(), DbError> {
        match rwlock_read(&self.state.ping_error).clone() {
            Some(message) => Err(DbError::ConnectionUnreachable(message)),
            None => Ok(()),
        }
    }

    fn close(&mut self) -> Result<(), DbError> {
        self.state.close_calls.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn table_names(&self) -> Result<Vec<TableRef>, DbError> {
        Ok(rwlock_read(&self.state.tables)
            .iter()
            .map(|t| t.table.clone())
            .collect())
    }

    fn table_columns(&self, table: &TableRef) -> Result<Vec<ColumnInfo>, DbError> {
        self.fail_if_scripted(&self.state.column_errors, table)?;
        Ok(self.find_table(table)?.columns)
    }

    fn count_rows(&self, table: &TableRef, _timeout: Option<Duration>) -> Result<u64, DbError> {
        self.state.count_queries.fetch_add(1, Ordering::Relaxed);
        self.fail_if_scripted(&self.state.count_errors, table)?;
        Ok(self.find_table(table)?.rows.len() as u64)
    }

    fn select_page(
        &self,
        table: &TableRef,
        page: &Pagination,
        _timeout: Option<Duration>,
    ) -> Result<RowSet, DbError> {
        self.state.page_queries.fetch_add(1, Ordering::Relaxed);
        self.fail_if_scripted(&self.state.page_errors, table)?;

        let fake = self.find_table(table)?;
        let offset = page.offset().min(fake.rows.len() as u64) as usize;
        let end = offset.saturating_add(page.limit() as usize).min(fake.rows.len());

        Ok(RowSet::new(
            fake.columns.iter().map(|c| c.name.clone()).collect(),
            fake.rows[offset..end].to_vec(),
        ))
    }
}

fn rwlock_read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn rwlock_write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
