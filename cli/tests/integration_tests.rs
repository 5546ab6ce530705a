use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

fn run_cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sqlcursor"))
        .args(args)
        .output()
        .expect("failed to run sqlcursor")
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("temp path is not UTF-8")
}

/// Creates a database holding `tbl(ID NUMBER, FOO VARCHAR(100))` with two rows.
fn seeded_database(dir: &TempDir) -> PathBuf {
    let db = dir.path().join("test.db");
    let out = run_cli(&[
        "exec",
        "--db",
        path_arg(&db),
        "CREATE TABLE tbl (ID NUMBER, FOO VARCHAR(100));
         INSERT INTO tbl VALUES (1, 'one');
         INSERT INTO tbl VALUES (2, 'two');",
    ]);
    assert!(
        out.status.success(),
        "exec failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    db
}

#[test]
fn exec_then_tables_lists_created_table() {
    let dir = tempfile::tempdir().unwrap();
    let db = seeded_database(&dir);

    let out = run_cli(&["tables", "--db", path_arg(&db)]);
    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout), "tbl\n");
}

#[test]
fn has_table_exit_codes() {
    let dir = tempfile::tempdir().unwrap();
    let db = seeded_database(&dir);

    let present = run_cli(&["has-table", "--db", path_arg(&db), "tbl"]);
    assert_eq!(present.status.code(), Some(0));

    let absent = run_cli(&["has-table", "--db", path_arg(&db), "nonexistent"]);
    assert_eq!(absent.status.code(), Some(2));
}

#[test]
fn query_prints_table_with_header() {
    let dir = tempfile::tempdir().unwrap();
    let db = seeded_database(&dir);

    let out = run_cli(&[
        "query",
        "--db",
        path_arg(&db),
        "SELECT ID, FOO FROM tbl ORDER BY ID",
    ]);
    assert!(out.status.success());
    assert_eq!(
        String::from_utf8_lossy(&out.stdout),
        "ID\tFOO\n1\tone\n2\ttwo\n"
    );
}

#[test]
fn query_binds_params_and_prints_json() {
    let dir = tempfile::tempdir().unwrap();
    let db = seeded_database(&dir);

    let out = run_cli(&[
        "query",
        "--db",
        path_arg(&db),
        "SELECT FOO, ?2 AS missing FROM tbl WHERE ID = ?1",
        "--param",
        "2",
        "--param",
        "NULL",
        "--format",
        "json",
    ]);
    assert!(
        out.status.success(),
        "query failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    let parsed: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(
        parsed,
        serde_json::json!({ "columns": ["FOO", "missing"], "rows": [["two", null]] })
    );
}

#[test]
fn query_with_no_rows_prints_header_only() {
    let dir = tempfile::tempdir().unwrap();
    let db = seeded_database(&dir);

    let out = run_cli(&[
        "query",
        "--db",
        path_arg(&db),
        "SELECT ID FROM tbl WHERE ID < ?1",
        "--param",
        "-5",
    ]);
    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout), "ID\n");
}

#[test]
fn invalid_sql_reports_error() {
    let dir = tempfile::tempdir().unwrap();
    let db = seeded_database(&dir);

    let out = run_cli(&["query", "--db", path_arg(&db), "SELEC 1"]);
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.starts_with("error: "), "stderr: {stderr}");
}

#[test]
fn read_only_config_blocks_writes() {
    let dir = tempfile::tempdir().unwrap();
    let db = seeded_database(&dir);
    let config = dir.path().join("ro.yaml");
    fs::write(&config, "read_only: true\n").unwrap();

    let read = run_cli(&[
        "--config",
        path_arg(&config),
        "query",
        "--db",
        path_arg(&db),
        "SELECT count(*) AS n FROM tbl",
    ]);
    assert!(read.status.success());
    assert_eq!(String::from_utf8_lossy(&read.stdout), "n\n2\n");

    let write = run_cli(&[
        "--config",
        path_arg(&config),
        "exec",
        "--db",
        path_arg(&db),
        "INSERT INTO tbl VALUES (3, 'three')",
    ]);
    assert_eq!(write.status.code(), Some(1));
}

#[test]
fn missing_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("never.db");

    let out = run_cli(&[
        "--config",
        path_arg(&dir.path().join("absent.yaml")),
        "tables",
        "--db",
        path_arg(&db),
    ]);
    assert_eq!(out.status.code(), Some(1));
    assert!(!db.exists());
}
