use rusqlite::Connection;
use workforce_core::db::migrations::latest_version;
use workforce_core::db::{open_db, open_db_in_memory, DbError};
use workforce_core::{Store, StoreConfig, StoreLocation};

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in ["employees", "contacts", "projects", "employee_project"] {
        assert_table_exists(&conn, table);
    }
    let foreign_keys: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(foreign_keys, 1);
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("workforce.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "employee_project");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }

    assert!(Store::open(&StoreConfig::file(&path)).is_err());
}

#[test]
fn file_store_keeps_data_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");
    let config = StoreConfig::file(&path);

    let store = Store::open(&config).unwrap();
    assert_eq!(store.location(), &StoreLocation::File(path.clone()));
    workforce_core::EmployeeService::new(&store)
        .add_employee("Joan", "Garcia", 35000)
        .unwrap();
    store.close().unwrap();

    let reopened = Store::open(&config).unwrap();
    let count = workforce_core::EntityRepository::new(&reopened)
        .count::<workforce_core::Employee>()
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn schema_rejects_unowned_contacts_and_oversized_names() {
    let conn = open_db_in_memory().unwrap();

    let unowned = conn.execute(
        "INSERT INTO contacts (contact_type, value) VALUES ('EMAIL', 'x@x.cat');",
        [],
    );
    assert!(unowned.is_err());

    let long_name = "x".repeat(101);
    let oversized = conn.execute(
        "INSERT INTO employees (first_name, last_name, salary) VALUES (?1, 'Garcia', 1);",
        [long_name.as_str()],
    );
    assert!(oversized.is_err());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
