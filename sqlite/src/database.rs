//! The database connection.
//!
//! [`Database`] owns a rusqlite connection and is the factory for
//! statements and query iterators. Statements and iterators borrow the
//! database, so it cannot be closed while any of them are alive.

use std::path::Path;

use rusqlite::Connection;
use tracing::{debug, warn};

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::query::QueryIterator;
use crate::row::ResultRow;
use crate::statement::{PreparedStatement, SharedPreparedStatement};
use crate::value::CellValue;

/// An open SQLite database.
///
/// # Examples
///
/// ```
/// use sqlite_cursor::{params, Database};
///
/// let db = Database::open_in_memory().unwrap();
/// db.exec("CREATE TABLE tbl (ID NUMBER, FOO VARCHAR(100))").unwrap();
/// db.exec_with("INSERT INTO tbl VALUES (?1, ?2)", &params![1, "one"]).unwrap();
///
/// assert!(db.has_table("tbl").unwrap());
/// assert_eq!(db.tables().unwrap(), vec!["tbl".to_string()]);
///
/// for row in db.exec("SELECT ID, FOO FROM tbl").unwrap() {
///     let row = row.unwrap();
///     assert_eq!(row["FOO"].get_text().unwrap(), "one");
/// }
/// ```
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (creating if needed) the database at `path` with the default
    /// configuration.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, &DatabaseConfig::default())
    }

    /// Opens the database at `path` with `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Connection`](crate::Error::Connection) if the file cannot be
    /// opened or a pragma fails, or [`Config`](crate::Error::Config) for an
    /// invalid configuration.
    pub fn open_with_config(path: impl AsRef<Path>, config: &DatabaseConfig) -> Result<Self> {
        let path = path.as_ref();
        config.validate()?;
        let conn = Connection::open_with_flags(path, config.open_flags())?;
        config.apply(&conn)?;
        debug!(path = %path.display(), read_only = config.read_only, "opened database");
        Ok(Self { conn })
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        DatabaseConfig::default().apply(&conn)?;
        Ok(Self { conn })
    }

    /// Closes the connection, reporting any failure to do so.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, err)| err.into())
    }

    /// The underlying rusqlite connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Compiles `sql` into an exclusively owned statement.
    pub fn prepare(&self, sql: &str) -> Result<PreparedStatement<'_>> {
        PreparedStatement::prepare(self, sql)
    }

    /// Compiles `sql` and binds `params` starting at index 1.
    pub fn prepare_with(
        &self,
        sql: &str,
        params: &[CellValue<'_>],
    ) -> Result<PreparedStatement<'_>> {
        PreparedStatement::prepare_with(self, sql, params)
    }

    /// Compiles `sql` into a statement with shared ownership.
    pub fn prepare_shared(&self, sql: &str) -> Result<SharedPreparedStatement<'_>> {
        SharedPreparedStatement::prepare(self, sql)
    }

    /// Runs `sql` and returns an iterator primed on the first row.
    ///
    /// Statements that produce no rows (DDL, inserts) have run to completion
    /// by the time this returns.
    pub fn exec(&self, sql: &str) -> Result<QueryIterator<'_>> {
        QueryIterator::new(self.prepare(sql)?)
    }

    /// Like [`exec`](Self::exec), binding `params` first.
    pub fn exec_with(&self, sql: &str, params: &[CellValue<'_>]) -> Result<QueryIterator<'_>> {
        QueryIterator::new(self.prepare_with(sql, params)?)
    }

    /// Runs an already prepared (and bound) statement.
    pub fn exec_statement<'conn>(
        &'conn self,
        statement: impl Into<SharedPreparedStatement<'conn>>,
    ) -> Result<QueryIterator<'conn>> {
        QueryIterator::new(statement)
    }

    /// Runs `sql` and hands every row to `callback`.
    pub fn exec_each<F>(&self, sql: &str, mut callback: F) -> Result<()>
    where
        F: FnMut(ResultRow),
    {
        for row in self.exec(sql)? {
            callback(row?);
        }
        Ok(())
    }

    /// Runs a statement expected to produce at most one row.
    ///
    /// Returns `Ok(None)` for no rows. With `ignore_other_rows` the first row
    /// is returned and the rest are never stepped; otherwise a second row
    /// fails with [`TooManyRows`](crate::Error::TooManyRows).
    pub fn exec_single<'conn>(
        &'conn self,
        statement: impl Into<SharedPreparedStatement<'conn>>,
        ignore_other_rows: bool,
    ) -> Result<Option<ResultRow>> {
        let mut rows = QueryIterator::new(statement)?;
        if rows.is_end() {
            return Ok(None);
        }
        let row = rows.current()?.clone();
        if ignore_other_rows {
            return Ok(Some(row));
        }
        rows.advance()?;
        if !rows.is_end() {
            warn!("single-row query produced additional rows");
            return Err(crate::Error::TooManyRows);
        }
        Ok(Some(row))
    }

    /// Runs zero or more semicolon-separated statements, discarding results.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Names of all tables, sorted by name.
    pub fn tables(&self) -> Result<Vec<String>> {
        let mut rows =
            self.exec("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
        let mut names = Vec::with_capacity(rows.row_count()?);
        for row in rows {
            let row = row?;
            names.push(row[0].value.get_text()?.to_string());
        }
        Ok(names)
    }

    /// Returns `true` if a table called `name` exists.
    pub fn has_table(&self, name: &str) -> Result<bool> {
        let mut rows = self.exec_with(
            "SELECT name FROM sqlite_master WHERE type='table' AND name=?1",
            &[CellValue::from(name)],
        )?;
        let count = rows.row_count()?;
        debug_assert!(count <= 1);
        Ok(count == 1)
    }
}
