use dbscope_core::{
    BackendKind, ColumnInfo, Connection, DbDriver, DbError, Pagination, Row, RowSet, TableRef,
    Value,
};
use rusqlite::{Connection as RusqliteConnection, OpenFlags};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

pub struct SqliteDriver;

impl SqliteDriver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SqliteDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl DbDriver for SqliteDriver {
    fn kind(&self) -> BackendKind {
        BackendKind::SQLite
    }

    fn connect(&self, dsn: &str) -> Result<Box<dyn Connection>, DbError> {
        let conn = open_sqlite(dsn)?;
        Ok(Box::new(SqliteConnection {
            conn: Mutex::new(conn),
        }))
    }
}

/// The DSN is either a plain file path or a `file:` URI (which enables
/// query parameters like `?mode=ro`).
fn open_sqlite(dsn: &str) -> Result<RusqliteConnection, DbError> {
    let result = if dsn.starts_with("file:") {
        RusqliteConnection::open_with_flags(
            dsn,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI,
        )
    } else {
        RusqliteConnection::open(dsn)
    };

    result.map_err(|e| DbError::ConnectionUnreachable(e.to_string()))
}

pub struct SqliteConnection {
    conn: Mutex<RusqliteConnection>,
}

impl SqliteConnection {
    fn lock(&self) -> MutexGuard<'_, RusqliteConnection> {
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Interrupts the connection when the deadline passes before the guard is
/// dropped. Backs the optional per-query timeout; SQLite has no
/// statement-level timeout of its own.
struct TimeoutGuard {
    finished: Arc<AtomicBool>,
}

impl Drop for TimeoutGuard {
    fn drop(&mut self) {
        self.finished.store(true, Ordering::SeqCst);
    }
}

fn arm_timeout(conn: &RusqliteConnection, timeout: Option<Duration>) -> Option<TimeoutGuard> {
    let timeout = timeout?;
    let handle = conn.get_interrupt_handle();
    let finished = Arc::new(AtomicBool::new(false));
    let flag = finished.clone();

    std::thread::spawn(move || {
        std::thread::sleep(timeout);
        if !flag.load(Ordering::SeqCst) {
            handle.interrupt();
        }
    });

    Some(TimeoutGuard { finished })
}

impl Connection for SqliteConnection {
    fn kind(&self) -> BackendKind {
        BackendKind::SQLite
    }

    fn ping(&self) -> Result<(), DbError> {
        self.lock()
            .execute_batch("SELECT 1")
            .map_err(|e| DbError::ConnectionUnreachable(e.to_string()))
    }

    fn close(&mut self) -> Result<(), DbError> {
        Ok(())
    }

    fn table_names(&self) -> Result<Vec<TableRef>, DbError> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare(
                "SELECT name FROM sqlite_master
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
            )
            .map_err(query_error)?;

        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(query_error)?
            .filter_map(|r| r.ok())
            .map(TableRef::new)
            .collect();

        Ok(names)
    }

    fn table_columns(&self, table: &TableRef) -> Result<Vec<ColumnInfo>, DbError> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare(
                "SELECT name, type, \"notnull\", dflt_value, pk
                 FROM pragma_table_info(?1)",
            )
            .map_err(query_error)?;

        // pragma_table_info reports `pk` as the 1-based position of the
        // column inside the primary key, and `notnull` as 0/1.
        let columns = stmt
            .query_map([table.name.as_str()], |row| {
                Ok(ColumnInfo {
                    name: row.get(0)?,
                    type_name: row.get::<_, String>(1).unwrap_or_default(),
                    nullable: row.get::<_, i64>(2).unwrap_or(0) == 0,
                    default_value: row.get::<_, Option<String>>(3).unwrap_or(None),
                    is_primary_key: row.get::<_, i64>(4).unwrap_or(0) == 1,
                })
            })
            .map_err(query_error)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(columns)
    }

    fn count_rows(&self, table: &TableRef, timeout: Option<Duration>) -> Result<u64, DbError> {
        let conn = self.lock();
        let _deadline = arm_timeout(&conn, timeout);

        let count: i64 = conn
            .query_row(&table.count_sql(), [], |row| row.get(0))
            .map_err(query_error)?;

        Ok(count.max(0) as u64)
    }

    fn select_page(
        &self,
        table: &TableRef,
        page: &Pagination,
        timeout: Option<Duration>,
    ) -> Result<RowSet, DbError> {
        let conn = self.lock();
        let _deadline = arm_timeout(&conn, timeout);

        let mut stmt = conn.prepare(&page.select_sql(table)).map_err(query_error)?;

        let column_count = stmt.column_count();
        let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();

        let mut rows: Vec<Row> = Vec::new();
        let mut result_rows = stmt.query([]).map_err(query_error)?;

        loop {
            match result_rows.next() {
                Ok(Some(row)) => {
                    let values = (0..column_count)
                        .map(|i| decode_value(row, i))
                        .collect::<Row>();
                    rows.push(values);
                }
                Ok(None) => break,
                Err(e) => return Err(query_error(e)),
            }
        }

        Ok(RowSet::new(columns, rows))
    }
}

fn decode_value(row: &rusqlite::Row<'_>, idx: usize) -> Value {
    use rusqlite::types::ValueRef;

    match row.get_ref(idx) {
        Ok(ValueRef::Null) => Value::Null,
        Ok(ValueRef::Integer(i)) => Value::Int(i),
        Ok(ValueRef::Real(f)) => Value::Float(f),
        Ok(ValueRef::Text(t)) => Value::Text(String::from_utf8_lossy(t).to_string()),
        // Raw bytes are coerced to text rather than carried as a blob.
        Ok(ValueRef::Blob(b)) => Value::Text(String::from_utf8_lossy(b).to_string()),
        Err(_) => Value::Null,
    }
}

fn query_error(e: rusqlite::Error) -> DbError {
    log::error!("sqlite query failed: {e}");
    DbError::QueryFailed(e.to_string())
}
