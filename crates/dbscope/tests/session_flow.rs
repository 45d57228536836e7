//! End-to-end flow over a real on-disk SQLite backend: save a profile,
//! connect, browse schema and data, and exercise the delete-active path.

use dbscope::{BackendKind, DbError, ProfileStore, Session, Value, default_drivers};
use std::path::{Path, PathBuf};

fn new_session() -> (Session, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store_path = dir.path().join("profiles.db");
    let data_path = dir.path().join("data.sqlite");
    std::mem::forget(dir);

    let store = ProfileStore::open(&store_path).expect("open store");
    (Session::new(store, default_drivers()), data_path)
}

fn seed(path: &Path, sql: &str) {
    let conn = rusqlite::Connection::open(path).expect("open fixture db");
    conn.execute_batch(sql).expect("seed fixture");
}

#[test]
fn save_list_delete_round_trip() {
    let (session, data_path) = new_session();

    let saved = session
        .save_connection("local", BackendKind::SQLite, data_path.to_str().unwrap())
        .unwrap();

    let listed = session.list_connections().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, saved.id);
    assert_eq!(listed[0].name, "local");
    assert_eq!(listed[0].kind, BackendKind::SQLite);

    session.delete_connection(saved.id).unwrap();
    assert!(session.list_connections().unwrap().is_empty());
}

#[test]
fn connect_to_missing_profile_fails_not_found() {
    let (session, _data_path) = new_session();
    let err = session.connect(999).unwrap_err();
    assert!(matches!(err, DbError::ProfileNotFound(999)));
}

#[test]
fn scenario_list_tables_and_page_through_rows() {
    let (session, data_path) = new_session();
    seed(
        &data_path,
        "CREATE TABLE t (id INTEGER, name TEXT);
         INSERT INTO t VALUES (1, 'a'), (2, 'b');",
    );

    let saved = session
        .save_connection("local", BackendKind::SQLite, data_path.to_str().unwrap())
        .unwrap();
    session.connect(saved.id).unwrap();
    assert_eq!(session.active_profile_id(), Some(saved.id));

    let tables = session.list_tables().unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].name, "t");
    assert_eq!(tables[0].row_count, 2);

    let page = session.get_page("t", 0, 1).unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.rows.len(), 1);
    assert_eq!(page.rows[0]["id"], Value::Int(1));
    assert_eq!(page.rows[0]["name"], Value::Text("a".to_string()));

    let beyond = session.get_page("t", 5, 10).unwrap();
    assert_eq!(beyond.total, 2);
    assert!(beyond.rows.is_empty());
}

#[test]
fn scenario_column_flags_reflect_declarations() {
    let (session, data_path) = new_session();
    seed(
        &data_path,
        "CREATE TABLE t (id INT, name TEXT NOT NULL, tag TEXT DEFAULT 'x');",
    );

    let saved = session
        .save_connection("local", BackendKind::SQLite, data_path.to_str().unwrap())
        .unwrap();
    session.connect(saved.id).unwrap();

    let columns = session.list_columns("t").unwrap();
    assert_eq!(columns.len(), 3);

    assert_eq!(columns[0].name, "id");
    assert!(!columns[0].is_primary_key, "undeclared PK stays false");
    assert!(columns[0].nullable);

    assert!(!columns[1].nullable);
    assert_eq!(columns[2].default_value.as_deref(), Some("'x'"));
}

#[test]
fn null_fields_round_trip_as_explicit_nulls() {
    let (session, data_path) = new_session();
    seed(
        &data_path,
        "CREATE TABLE t (id INT, name TEXT);
         INSERT INTO t VALUES (1, NULL);",
    );

    let saved = session
        .save_connection("local", BackendKind::SQLite, data_path.to_str().unwrap())
        .unwrap();
    session.connect(saved.id).unwrap();

    let page = session.get_page("t", 0, 10).unwrap();
    let row = &page.rows[0];
    assert!(row.contains_key("name"));
    assert_eq!(row["name"], Value::Null);
}

#[test]
fn deleting_active_profile_clears_connection() {
    let (session, data_path) = new_session();
    seed(&data_path, "CREATE TABLE t (id INT);");

    let saved = session
        .save_connection("local", BackendKind::SQLite, data_path.to_str().unwrap())
        .unwrap();
    session.connect(saved.id).unwrap();

    session.delete_connection(saved.id).unwrap();

    assert_eq!(session.active_profile_id(), None);
    assert!(matches!(
        session.list_tables().unwrap_err(),
        DbError::NoActiveConnection
    ));
}

#[test]
fn deleting_inactive_profile_keeps_connection() {
    let (session, data_path) = new_session();
    seed(&data_path, "CREATE TABLE t (id INT);");

    let active = session
        .save_connection("active", BackendKind::SQLite, data_path.to_str().unwrap())
        .unwrap();
    let other = session
        .save_connection("other", BackendKind::SQLite, data_path.to_str().unwrap())
        .unwrap();

    session.connect(active.id).unwrap();
    session.delete_connection(other.id).unwrap();

    assert_eq!(session.active_profile_id(), Some(active.id));
    assert_eq!(session.list_tables().unwrap().len(), 1);
}

#[test]
fn test_connection_probe_leaves_active_untouched() {
    let (session, data_path) = new_session();
    seed(
        &data_path,
        "CREATE TABLE t (id INT);
         INSERT INTO t VALUES (1);",
    );

    let saved = session
        .save_connection("local", BackendKind::SQLite, data_path.to_str().unwrap())
        .unwrap();
    session.connect(saved.id).unwrap();

    // Probe a different database entirely.
    let probe_dir = tempfile::tempdir().unwrap();
    let probe_path = probe_dir.path().join("probe.sqlite");
    session
        .test_connection(BackendKind::SQLite, probe_path.to_str().unwrap())
        .unwrap();

    // Probe a DSN that cannot be opened.
    let err = session
        .test_connection(BackendKind::SQLite, "/nonexistent-dir-dbscope/x.sqlite")
        .unwrap_err();
    assert!(matches!(err, DbError::ConnectionUnreachable(_)));

    // The active connection still answers for its own schema.
    assert_eq!(session.active_profile_id(), Some(saved.id));
    let tables = session.list_tables().unwrap();
    assert_eq!(tables[0].name, "t");
    assert_eq!(tables[0].row_count, 1);
}

#[test]
fn connect_to_unreachable_dsn_keeps_previous_connection() {
    let (session, data_path) = new_session();
    seed(&data_path, "CREATE TABLE t (id INT);");

    let good = session
        .save_connection("good", BackendKind::SQLite, data_path.to_str().unwrap())
        .unwrap();
    let bad = session
        .save_connection("bad", BackendKind::SQLite, "/nonexistent-dir-dbscope/x.sqlite")
        .unwrap();

    session.connect(good.id).unwrap();

    let err = session.connect(bad.id).unwrap_err();
    assert!(matches!(err, DbError::ConnectionUnreachable(_)));

    assert_eq!(session.active_profile_id(), Some(good.id));
    assert_eq!(session.list_tables().unwrap().len(), 1);
}

#[test]
fn raw_identifiers_from_callers_are_rejected() {
    let (session, data_path) = new_session();
    seed(&data_path, "CREATE TABLE t (id INT);");

    let saved = session
        .save_connection("local", BackendKind::SQLite, data_path.to_str().unwrap())
        .unwrap();
    session.connect(saved.id).unwrap();

    let err = session.get_page("t; DROP TABLE t", 0, 10).unwrap_err();
    assert!(matches!(err, DbError::InvalidTableName(_)));

    // The table is still there.
    assert_eq!(session.list_tables().unwrap().len(), 1);
}

#[test]
fn switching_profiles_targets_the_new_backend() {
    let (session, first_path) = new_session();
    seed(&first_path, "CREATE TABLE first_table (id INT);");

    let second_dir = tempfile::tempdir().unwrap();
    let second_path = second_dir.path().join("second.sqlite");
    std::mem::forget(second_dir);
    seed(&second_path, "CREATE TABLE second_table (id INT);");

    let first = session
        .save_connection("first", BackendKind::SQLite, first_path.to_str().unwrap())
        .unwrap();
    let second = session
        .save_connection("second", BackendKind::SQLite, second_path.to_str().unwrap())
        .unwrap();

    session.connect(first.id).unwrap();
    assert_eq!(session.list_tables().unwrap()[0].name, "first_table");

    session.connect(second.id).unwrap();
    assert_eq!(session.list_tables().unwrap()[0].name, "second_table");
    assert_eq!(session.active_profile_id(), Some(second.id));
}
