//! Live tests against a real PostgreSQL server.
//!
//! Set `DBSCOPE_POSTGRES_DSN` (e.g. `host=localhost user=postgres
//! password=postgres dbname=postgres`) to run these; without it every test
//! returns early.

use dbscope_core::{BackendKind, Connection, DbDriver, DbError, Pagination, TableRef, Value};
use dbscope_driver_postgres::PostgresDriver;

fn live_dsn() -> Option<String> {
    std::env::var("DBSCOPE_POSTGRES_DSN").ok()
}

fn connect() -> Option<Box<dyn Connection>> {
    let dsn = live_dsn()?;
    let driver = PostgresDriver::new();
    let connection = driver.connect(&dsn).expect("connect to live postgres");
    connection.ping().expect("ping");
    Some(connection)
}

fn exec(dsn: &str, sql: &str) {
    let mut client = postgres::Client::connect(dsn, postgres::NoTls).expect("raw client");
    client.batch_execute(sql).expect("seed fixture");
}

#[test]
fn connect_ping_and_kind() {
    let Some(connection) = connect() else {
        return;
    };
    assert_eq!(connection.kind(), BackendKind::Postgres);
}

#[test]
fn unreachable_server_reports_connection_unreachable() {
    let driver = PostgresDriver::new();
    let err = driver
        .connect("host=127.0.0.1 port=1 user=nobody connect_timeout=1")
        .err()
        .expect("connect should fail");
    assert!(matches!(err, DbError::ConnectionUnreachable(_)));
}

#[test]
fn introspects_public_tables_and_columns() {
    let Some(connection) = connect() else {
        return;
    };
    let dsn = live_dsn().unwrap();

    exec(
        &dsn,
        "DROP TABLE IF EXISTS dbscope_probe;
         CREATE TABLE dbscope_probe (
             id SERIAL PRIMARY KEY,
             name TEXT NOT NULL,
             note TEXT
         );
         INSERT INTO dbscope_probe (name, note) VALUES ('a', NULL), ('b', 'x');",
    );

    let tables = connection.table_names().unwrap();
    let probe = tables
        .iter()
        .find(|t| t.name == "dbscope_probe")
        .expect("probe table listed");
    assert_eq!(probe.schema.as_deref(), Some("public"));

    let columns = connection.table_columns(probe).unwrap();
    assert_eq!(columns.len(), 3);
    assert!(columns[0].is_primary_key);
    assert!(!columns[1].nullable);
    assert!(columns[2].nullable);

    let count = connection.count_rows(probe, None).unwrap();
    assert_eq!(count, 2);

    let page = connection
        .select_page(probe, &Pagination::new(0, 1), None)
        .unwrap();
    assert_eq!(page.rows.len(), 1);
    assert_eq!(page.rows[0][1], Value::Text("a".to_string()));
    assert_eq!(page.rows[0][2], Value::Null);

    exec(&dsn, "DROP TABLE dbscope_probe;");
}
