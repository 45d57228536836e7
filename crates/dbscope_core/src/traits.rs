use crate::{BackendKind, ColumnInfo, DbError, Pagination, RowSet, TableRef};
use std::time::Duration;

/// Factory for creating database connections.
///
/// Implementations are registered in the `ConnectionManager` by
/// `BackendKind`. Each backend (PostgreSQL, SQLite, ...) provides its own
/// driver; adding a backend means adding one implementation and one registry
/// entry, with no caller changes.
pub trait DbDriver: Send + Sync {
    /// Returns the backend kind this driver handles.
    fn kind(&self) -> BackendKind;

    /// Human-readable name for display (e.g., "PostgreSQL", "SQLite").
    fn display_name(&self) -> &'static str {
        self.kind().display_name()
    }

    /// Open a live connection from an opaque DSN.
    ///
    /// Open failures are reported as `ConnectionUnreachable`.
    fn connect(&self, dsn: &str) -> Result<Box<dyn Connection>, DbError>;

    /// Probe whether a connection can be established, without retaining it.
    ///
    /// Opens an ephemeral handle, pings it, and closes it on every path.
    /// Must never touch any shared state, so it is safe to run while another
    /// connection is active.
    fn test_connection(&self, dsn: &str) -> Result<(), DbError> {
        let mut conn = self.connect(dsn)?;
        let probe = conn.ping();
        if let Err(e) = conn.close() {
            log::debug!("failed to close probe connection: {e}");
        }
        probe
    }
}

/// Active database connection.
///
/// Callers interact exclusively through this trait, never with driver
/// internals. The manager serializes all access behind its own lock, so
/// implementations only need `Send`.
pub trait Connection: Send {
    /// Returns the backend kind of this connection.
    fn kind(&self) -> BackendKind;

    /// Check that the connection is still alive.
    ///
    /// Typically sends a lightweight query like `SELECT 1`.
    fn ping(&self) -> Result<(), DbError>;

    /// Close the connection and release resources.
    fn close(&mut self) -> Result<(), DbError>;

    /// List base tables in the order the backend returns them.
    ///
    /// Each backend runs its own catalog query: `information_schema.tables`
    /// restricted to base tables in `public` for PostgreSQL, `sqlite_master`
    /// minus internal `sqlite_%` tables for SQLite.
    fn table_names(&self) -> Result<Vec<TableRef>, DbError>;

    /// Column metadata for one table, in ordinal position order.
    ///
    /// Individual catalog rows that fail to decode are skipped; only the
    /// catalog query itself failing is an error.
    fn table_columns(&self, table: &TableRef) -> Result<Vec<ColumnInfo>, DbError>;

    /// `SELECT COUNT(*)` against the table, with an optional deadline for
    /// counts over huge tables.
    fn count_rows(&self, table: &TableRef, timeout: Option<Duration>) -> Result<u64, DbError>;

    /// Fetch one page of raw rows, with an optional deadline for large
    /// scans. Rows that fail to decode are skipped; byte values are coerced
    /// to text; SQL NULL is preserved as `Value::Null`.
    fn select_page(
        &self,
        table: &TableRef,
        page: &Pagination,
        timeout: Option<Duration>,
    ) -> Result<RowSet, DbError>;
}
