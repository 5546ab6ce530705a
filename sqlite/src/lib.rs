//! Typed, cursor-style access to SQLite.
//!
//! This crate wraps a SQLite connection with a small, strongly typed
//! surface: dynamically typed cell values, prepared statements with
//! exclusive or shared ownership, materialized result rows, and a forward
//! query iterator that streams rows one step at a time.
//!
//! # Architecture
//!
//! - **`value`**: [`CellValue`] and [`ColumnType`], the five storage classes
//! - **`statement`**: [`Statement`] handles, binding and column extraction
//! - **`row`**: [`ResultRow`], a named snapshot of one result row
//! - **`query`**: [`QueryIterator`], forward iteration over a statement
//! - **`database`**: [`Database`], the connection and its helpers
//! - **`config`**: [`DatabaseConfig`], open flags and pragmas from YAML
//!
//! # Quick start
//!
//! ```
//! use sqlite_cursor::{params, Database};
//!
//! let db = Database::open_in_memory().unwrap();
//! db.execute_batch("CREATE TABLE kv (k TEXT, v BLOB)").unwrap();
//! db.exec_with("INSERT INTO kv VALUES (?1, ?2)", &params!["a", vec![1u8, 2, 3]])
//!     .unwrap();
//!
//! for row in db.exec("SELECT k, v FROM kv").unwrap() {
//!     let row = row.unwrap();
//!     assert_eq!(row["k"].get_text().unwrap(), "a");
//!     assert_eq!(row["v"].get_blob().unwrap(), &[1, 2, 3]);
//! }
//! ```
//!
//! # Lifetimes
//!
//! Statements and iterators borrow the [`Database`] they were prepared on,
//! so a connection cannot be closed while results are still being read.
//! Text and blob views returned by [`Statement::column_text`] and
//! [`Statement::column_blob`] borrow the statement and are invalidated by
//! the next step, reset, or release; the borrow checker enforces this.

mod config;
mod database;
mod error;
mod ffi;
mod query;
mod row;
mod statement;
mod value;

pub use config::{DatabaseConfig, JournalMode};
pub use database::Database;
pub use error::{Error, Result};
pub use ffi::Step;
pub use query::QueryIterator;
pub use row::{ResultCell, ResultRow};
pub use statement::{
    Ownership, PreparedStatement, Shared, SharedPreparedStatement, Statement, Unique,
};
pub use value::{CellValue, ColumnType};
