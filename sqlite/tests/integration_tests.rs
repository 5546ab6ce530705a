//! Integration tests for the sqlite-cursor crate.

use sqlite_cursor::{
    CellValue, ColumnType, Database, DatabaseConfig, Error, JournalMode, QueryIterator, Step,
    params,
};
use tempfile::TempDir;

/// Opens a fresh file database inside a temporary directory.
fn setup_database() -> (TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("test.db")).unwrap();
    (dir, db)
}

/// Creates `tbl(ID NUMBER, FOO VARCHAR(100))` holding `rows` rows.
fn setup_table(db: &Database, rows: i64) {
    db.exec("CREATE TABLE tbl (ID NUMBER, FOO VARCHAR(100))").unwrap();
    for id in 0..rows {
        db.exec_with(
            "INSERT INTO tbl (ID, FOO) VALUES (?1, ?2)",
            &params![id, format!("row {id}")],
        )
        .unwrap();
    }
}

// =============================================================================
// Table Helpers
// =============================================================================

#[test]
fn test_has_table_and_tables() {
    let (_dir, db) = setup_database();
    setup_table(&db, 0);

    assert!(db.has_table("tbl").unwrap());
    assert!(!db.has_table("nonexistent").unwrap());
    assert_eq!(db.tables().unwrap(), vec!["tbl".to_string()]);
}

#[test]
fn test_tables_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reopen.db");
    {
        let db = Database::open(&path).unwrap();
        db.execute_batch("CREATE TABLE b (x); CREATE TABLE a (x);").unwrap();
        db.close().unwrap();
    }
    let db = Database::open(&path).unwrap();
    assert_eq!(db.tables().unwrap(), vec!["a", "b"]);
}

// =============================================================================
// Query Iteration
// =============================================================================

#[test]
fn test_select_literal_row() {
    let (_dir, db) = setup_database();
    let mut rows = db.exec("SELECT 1 AS x, 'a' AS y").unwrap();

    let row = rows.next().unwrap().unwrap();
    assert_eq!(row[0].value.column_type(), ColumnType::Integer);
    assert_eq!(row[0].value.get_integer().unwrap(), 1);
    assert_eq!(row["y"].column_type(), ColumnType::Text);
    assert_eq!(row["y"].get_text().unwrap(), "a");
    assert!(matches!(
        row["y"].get_integer(),
        Err(Error::TypeMismatch {
            expected: ColumnType::Integer,
            actual: ColumnType::Text
        })
    ));

    assert!(rows.next().is_none());
    assert!(rows.is_end());
    assert_eq!(rows, QueryIterator::end());
}

#[test]
fn test_row_count_then_iterate() {
    let (_dir, db) = setup_database();
    setup_table(&db, 10);

    let mut rows = db.exec("SELECT ID, FOO FROM tbl ORDER BY ID").unwrap();
    assert_eq!(rows.row_count().unwrap(), 10);
    assert_eq!(rows.row_count().unwrap(), 10);

    let ids: Vec<i64> = rows
        .map(|row| row.unwrap()["ID"].get_integer().unwrap())
        .collect();
    assert_eq!(ids, (0..10).collect::<Vec<_>>());
}

#[test]
fn test_exec_statement_with_bound_parameters() {
    let (_dir, db) = setup_database();
    setup_table(&db, 5);

    let mut statement = db
        .prepare("SELECT FOO FROM tbl WHERE ID >= ?1 ORDER BY ID")
        .unwrap();
    assert_eq!(statement.parameter_count(), 1);
    statement.bind(1, &CellValue::from(3)).unwrap();

    let values: Vec<String> = db
        .exec_statement(statement)
        .unwrap()
        .map(|row| row.unwrap()["FOO"].get_text().unwrap().to_string())
        .collect();
    assert_eq!(values, vec!["row 3", "row 4"]);
}

#[test]
fn test_exec_single() {
    let (_dir, db) = setup_database();
    setup_table(&db, 3);

    let row = db
        .exec_single(
            db.prepare_with("SELECT FOO FROM tbl WHERE ID = ?1", &params![1])
                .unwrap(),
            false,
        )
        .unwrap()
        .unwrap();
    assert_eq!(row.value("FOO").unwrap().get_text().unwrap(), "row 1");

    let missing = db
        .exec_single(
            db.prepare_with("SELECT FOO FROM tbl WHERE ID = ?1", &params![99])
                .unwrap(),
            false,
        )
        .unwrap();
    assert!(missing.is_none());

    let err = db
        .exec_single(db.prepare("SELECT FOO FROM tbl").unwrap(), false)
        .unwrap_err();
    assert!(matches!(err, Error::TooManyRows));

    let first = db
        .exec_single(db.prepare("SELECT ID FROM tbl ORDER BY ID").unwrap(), true)
        .unwrap()
        .unwrap();
    assert_eq!(first[0].value.get_integer().unwrap(), 0);
}

// =============================================================================
// Binding
// =============================================================================

#[test]
fn test_null_bind_round_trip() {
    let (_dir, db) = setup_database();

    let mut rows = db.exec_with("SELECT ?1 AS v", &[CellValue::Null]).unwrap();
    let row = rows.current().unwrap();
    assert!(row["v"].is_null());
    assert_eq!(row["v"].column_type(), ColumnType::Null);

    let none: Option<i64> = None;
    let mut rows = db.exec_with("SELECT ?1 AS v", &params![none]).unwrap();
    assert!(rows.current().unwrap()["v"].is_null());
}

#[test]
fn test_bind_null_replaces_previous_binding() {
    let (_dir, db) = setup_database();

    let mut statement = db.prepare("SELECT ?1").unwrap();
    statement.bind(1, &CellValue::from(42)).unwrap();
    statement.bind_null(1).unwrap();
    assert_eq!(statement.step().unwrap(), Step::Row);
    assert!(statement.is_column_null(0).unwrap());
}

#[test]
fn test_text_and_blob_bind_round_trip() {
    let (_dir, db) = setup_database();
    let text = "snowman \u{2603} and a NUL-free tail";
    let blob: Vec<u8> = (0..=255).collect();

    let mut rows = db
        .exec_with(
            "SELECT ?1 AS t, ?2 AS b, length(?2) AS n",
            &params![text, blob.as_slice()],
        )
        .unwrap();
    let row = rows.current().unwrap();
    assert_eq!(row["t"].get_text().unwrap(), text);
    assert_eq!(row["b"].get_blob().unwrap(), blob.as_slice());
    assert_eq!(row["n"].get_integer().unwrap(), 256);
}

#[test]
fn test_empty_blob_round_trip() {
    let (_dir, db) = setup_database();
    let empty: &[u8] = &[];

    let mut rows = db.exec_with("SELECT ?1 AS b", &params![empty]).unwrap();
    let row = rows.current().unwrap();
    assert_eq!(row["b"].column_type(), ColumnType::Blob);
    assert!(row["b"].get_blob().unwrap().is_empty());
}

#[test]
fn test_parameter_out_of_range() {
    let (_dir, db) = setup_database();
    let mut statement = db.prepare("SELECT ?1").unwrap();

    assert!(matches!(
        statement.bind(0, &CellValue::from(1)),
        Err(Error::ParameterOutOfRange { index: 0, count: 1 })
    ));
    assert!(matches!(
        statement.bind(2, &CellValue::from(1)),
        Err(Error::ParameterOutOfRange { index: 2, count: 1 })
    ));
}

// =============================================================================
// Engine Errors
// =============================================================================

#[test]
fn test_compile_error_carries_engine_code() {
    let (_dir, db) = setup_database();
    let err = db.prepare("SELEC 1").unwrap_err();
    assert!(matches!(err, Error::Engine { .. }));
    assert_eq!(err.code(), Some(1));
}

#[test]
fn test_multiple_statements_rejected() {
    let (_dir, db) = setup_database();
    assert!(matches!(
        db.prepare("SELECT 1; SELECT 2"),
        Err(Error::MultipleStatements)
    ));

    let batch = "CREATE TABLE m1 (x); CREATE TABLE m2 (x);";
    assert!(matches!(db.prepare(batch), Err(Error::MultipleStatements)));
    db.execute_batch(batch).unwrap();
    assert_eq!(db.tables().unwrap(), vec!["m1", "m2"]);

    let dependent = "CREATE TABLE z (a); INSERT INTO z VALUES (1)";
    assert!(matches!(db.prepare(dependent), Err(Error::MultipleStatements)));
    assert!(matches!(db.exec(dependent), Err(Error::MultipleStatements)));
    assert!(!db.has_table("z").unwrap());
}

#[test]
fn test_constraint_violation_surfaces_on_exec() {
    let (_dir, db) = setup_database();
    db.execute_batch(
        "CREATE TABLE parent (id INTEGER PRIMARY KEY);
         CREATE TABLE child (parent_id INTEGER REFERENCES parent(id));",
    )
    .unwrap();

    let err = db
        .exec_with("INSERT INTO child VALUES (?1)", &params![7])
        .unwrap_err();
    assert!(matches!(err, Error::Engine { .. }));
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_read_only_database_rejects_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ro.db");
    {
        let db = Database::open(&path).unwrap();
        setup_table(&db, 2);
    }

    let config = DatabaseConfig {
        read_only: true,
        ..DatabaseConfig::default()
    };
    let db = Database::open_with_config(&path, &config).unwrap();
    assert_eq!(db.exec("SELECT ID FROM tbl").unwrap().row_count().unwrap(), 2);
    assert!(matches!(
        db.exec("INSERT INTO tbl VALUES (9, 'nine')"),
        Err(Error::Engine { .. })
    ));
}

#[test]
fn test_missing_file_without_create_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = DatabaseConfig {
        create: false,
        ..DatabaseConfig::default()
    };
    let err = Database::open_with_config(dir.path().join("absent.db"), &config).unwrap_err();
    assert!(matches!(err, Error::Connection(_)));
    assert!(err.code().is_some());
}

#[test]
fn test_config_from_yaml_applies_pragmas() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("db.yaml");
    std::fs::write(
        &config_path,
        "journal_mode: wal\nbusy_timeout_ms: 500\nforeign_keys: false\n",
    )
    .unwrap();

    let config = DatabaseConfig::load(&config_path).unwrap();
    assert_eq!(config.journal_mode, Some(JournalMode::Wal));

    let db = Database::open_with_config(dir.path().join("wal.db"), &config).unwrap();
    let mut rows = db.exec("PRAGMA journal_mode").unwrap();
    assert_eq!(rows.current().unwrap()[0].value.get_text().unwrap(), "wal");
    let mut rows = db.exec("PRAGMA foreign_keys").unwrap();
    assert_eq!(rows.current().unwrap()[0].value.get_integer().unwrap(), 0);
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("bad.yaml");
    std::fs::write(&config_path, "busy_timeout_ms: 0\n").unwrap();
    assert!(matches!(
        DatabaseConfig::load(&config_path),
        Err(Error::Config(_))
    ));
}
