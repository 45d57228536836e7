use dbscope_core::{
    BackendKind, ColumnInfo, Connection, DbDriver, DbError, Pagination, Row, RowSet, TableRef,
    Value,
};
use native_tls::TlsConnector;
use postgres::{Client, NoTls};
use postgres_native_tls::MakeTlsConnector;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

pub struct PostgresDriver;

impl PostgresDriver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PostgresDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl DbDriver for PostgresDriver {
    fn kind(&self) -> BackendKind {
        BackendKind::Postgres
    }

    fn connect(&self, dsn: &str) -> Result<Box<dyn Connection>, DbError> {
        let client = open_client(dsn)?;
        Ok(Box::new(PostgresConnection {
            client: Mutex::new(client),
        }))
    }
}

/// The DSN is handed verbatim to the client (keyword/value or URI form).
/// TLS is attempted first so that `sslmode=require` DSNs work; servers
/// without TLS fall back to a plain connection.
fn open_client(dsn: &str) -> Result<Client, DbError> {
    let connector = TlsConnector::builder()
        .build()
        .map_err(|e| DbError::ConnectionUnreachable(format!("TLS setup failed: {e}")))?;
    let tls = MakeTlsConnector::new(connector);

    match Client::connect(dsn, tls) {
        Ok(client) => Ok(client),
        Err(tls_err) => match Client::connect(dsn, NoTls) {
            Ok(client) => Ok(client),
            Err(_) => Err(DbError::ConnectionUnreachable(tls_err.to_string())),
        },
    }
}

pub struct PostgresConnection {
    client: Mutex<Client>,
}

impl PostgresConnection {
    fn lock(&self) -> MutexGuard<'_, Client> {
        match self.client.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Run `f` under a server-side `statement_timeout`, resetting it
    /// afterwards even when the query fails.
    fn with_statement_timeout<R>(
        client: &mut Client,
        timeout: Option<Duration>,
        f: impl FnOnce(&mut Client) -> Result<R, DbError>,
    ) -> Result<R, DbError> {
        let Some(timeout) = timeout else {
            return f(client);
        };

        let millis = timeout.as_millis().max(1);
        client
            .batch_execute(&format!("SET statement_timeout = {millis}"))
            .map_err(query_error)?;

        let result = f(client);

        if let Err(e) = client.batch_execute("SET statement_timeout = 0") {
            log::warn!("failed to reset statement_timeout: {e}");
        }

        result
    }
}

impl Connection for PostgresConnection {
    fn kind(&self) -> BackendKind {
        BackendKind::Postgres
    }

    fn ping(&self) -> Result<(), DbError> {
        self.lock()
            .simple_query("SELECT 1")
            .map(|_| ())
            .map_err(|e| DbError::ConnectionUnreachable(e.to_string()))
    }

    fn close(&mut self) -> Result<(), DbError> {
        Ok(())
    }

    fn table_names(&self) -> Result<Vec<TableRef>, DbError> {
        let mut client = self.lock();
        let rows = client
            .query(
                "SELECT table_name
                 FROM information_schema.tables
                 WHERE table_schema = 'public' AND table_type = 'BASE TABLE'",
                &[],
            )
            .map_err(query_error)?;

        Ok(rows
            .iter()
            .map(|row| TableRef::with_schema("public", row.get::<_, String>(0)))
            .collect())
    }

    fn table_columns(&self, table: &TableRef) -> Result<Vec<ColumnInfo>, DbError> {
        let schema = table.schema.as_deref().unwrap_or("public");
        let mut client = self.lock();

        let rows = client
            .query(
                r#"
                SELECT
                    c.column_name,
                    c.data_type,
                    c.is_nullable,
                    c.column_default,
                    COALESCE(
                        (SELECT true FROM information_schema.table_constraints tc
                         JOIN information_schema.key_column_usage kcu
                           ON tc.constraint_name = kcu.constraint_name
                          AND tc.table_schema = kcu.table_schema
                         WHERE tc.constraint_type = 'PRIMARY KEY'
                           AND tc.table_schema = c.table_schema
                           AND tc.table_name = c.table_name
                           AND kcu.column_name = c.column_name),
                        false
                    ) AS is_pk
                FROM information_schema.columns c
                WHERE c.table_schema = $1 AND c.table_name = $2
                ORDER BY c.ordinal_position
                "#,
                &[&schema, &table.name],
            )
            .map_err(query_error)?;

        // A malformed catalog row should drop that column, not the listing.
        let columns = rows
            .iter()
            .filter_map(|row| {
                Some(ColumnInfo {
                    name: row.try_get(0).ok()?,
                    type_name: row.try_get(1).ok()?,
                    nullable: row.try_get::<_, String>(2).ok()? == "YES",
                    default_value: row.try_get(3).ok()?,
                    is_primary_key: row.try_get(4).ok()?,
                })
            })
            .collect();

        Ok(columns)
    }

    fn count_rows(&self, table: &TableRef, timeout: Option<Duration>) -> Result<u64, DbError> {
        let mut client = self.lock();
        let sql = table.count_sql();

        Self::with_statement_timeout(&mut client, timeout, |client| {
            let row = client.query_one(&sql, &[]).map_err(query_error)?;
            let count: i64 = row.try_get(0).map_err(query_error)?;
            Ok(count.max(0) as u64)
        })
    }

    fn select_page(
        &self,
        table: &TableRef,
        page: &Pagination,
        timeout: Option<Duration>,
    ) -> Result<RowSet, DbError> {
        let mut client = self.lock();
        let sql = page.select_sql(table);

        Self::with_statement_timeout(&mut client, timeout, |client| {
            // Prepare first so column names survive an empty result set.
            let stmt = client.prepare(&sql).map_err(query_error)?;
            let columns: Vec<String> = stmt
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect();

            let rows = client.query(&stmt, &[]).map_err(query_error)?;

            let decoded: Vec<Row> = rows
                .iter()
                .map(|row| {
                    (0..columns.len())
                        .map(|i| decode_value(row, i))
                        .collect::<Row>()
                })
                .collect();

            Ok(RowSet::new(columns, decoded))
        })
    }
}

fn decode_value(row: &postgres::Row, idx: usize) -> Value {
    let type_name = row.columns()[idx].type_().name().to_string();

    match type_name.as_str() {
        "bool" => row
            .try_get::<_, Option<bool>>(idx)
            .map(option_value(Value::Bool))
            .unwrap_or(Value::Null),
        "int2" => row
            .try_get::<_, Option<i16>>(idx)
            .map(option_value(|v| Value::Int(i64::from(v))))
            .unwrap_or(Value::Null),
        "int4" => row
            .try_get::<_, Option<i32>>(idx)
            .map(option_value(|v| Value::Int(i64::from(v))))
            .unwrap_or(Value::Null),
        "int8" => row
            .try_get::<_, Option<i64>>(idx)
            .map(option_value(Value::Int))
            .unwrap_or(Value::Null),
        "float4" => row
            .try_get::<_, Option<f32>>(idx)
            .map(option_value(|v| Value::Float(f64::from(v))))
            .unwrap_or(Value::Null),
        "float8" => row
            .try_get::<_, Option<f64>>(idx)
            .map(option_value(Value::Float))
            .unwrap_or(Value::Null),
        // Raw bytes are coerced to text rather than carried as a blob.
        "bytea" => row
            .try_get::<_, Option<Vec<u8>>>(idx)
            .map(option_value(|v: Vec<u8>| {
                Value::Text(String::from_utf8_lossy(&v).to_string())
            }))
            .unwrap_or(Value::Null),
        "timestamptz" => row
            .try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(idx)
            .map(option_value(|v: chrono::DateTime<chrono::Utc>| {
                Value::Text(v.to_rfc3339())
            }))
            .unwrap_or(Value::Null),
        "timestamp" => row
            .try_get::<_, Option<chrono::NaiveDateTime>>(idx)
            .map(option_value(|v: chrono::NaiveDateTime| {
                Value::Text(v.to_string())
            }))
            .unwrap_or(Value::Null),
        "date" => row
            .try_get::<_, Option<chrono::NaiveDate>>(idx)
            .map(option_value(|v: chrono::NaiveDate| Value::Text(v.to_string())))
            .unwrap_or(Value::Null),
        "time" => row
            .try_get::<_, Option<chrono::NaiveTime>>(idx)
            .map(option_value(|v: chrono::NaiveTime| Value::Text(v.to_string())))
            .unwrap_or(Value::Null),
        _ => row
            .try_get::<_, Option<String>>(idx)
            .map(option_value(Value::Text))
            .unwrap_or(Value::Null),
    }
}

fn option_value<T>(f: impl Fn(T) -> Value) -> impl Fn(Option<T>) -> Value {
    move |opt| opt.map(&f).unwrap_or(Value::Null)
}

fn query_error(e: postgres::Error) -> DbError {
    log::error!("postgres query failed: {e}");
    DbError::QueryFailed(e.to_string())
}
