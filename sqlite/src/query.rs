//! Streaming iteration over query results.
//!
//! [`QueryIterator`] turns statement stepping into forward iteration. It
//! holds a [`SharedPreparedStatement`], a row index, and a lazily
//! materialized [`ResultRow`] for the current position. Rows are produced
//! one step at a time; the full result set is never held in memory.
//!
//! Construction steps once to prime the first row. When the engine reports
//! that no rows remain, the iterator releases its statement and becomes an
//! *end* iterator, equal to every other end iterator.
//!
//! # Example
//!
//! ```
//! use sqlite_cursor::Database;
//!
//! let db = Database::open_in_memory().unwrap();
//! db.execute_batch(
//!     "CREATE TABLE t (n INTEGER);
//!      INSERT INTO t VALUES (1), (2), (3);",
//! )
//! .unwrap();
//!
//! let mut rows = db.exec("SELECT n FROM t ORDER BY n").unwrap();
//! assert_eq!(rows.row_count().unwrap(), 3);
//!
//! let total: i64 = rows
//!     .map(|row| row.unwrap()[0].value.get_integer().unwrap())
//!     .sum();
//! assert_eq!(total, 6);
//! ```

use std::iter::FusedIterator;

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::ffi::Step;
use crate::row::ResultRow;
use crate::statement::SharedPreparedStatement;

/// Forward, single-pass cursor over the rows of a statement.
///
/// The explicit protocol is [`current`](Self::current) to read the row under
/// the cursor and [`advance`](Self::advance) to move on. The [`Iterator`]
/// implementation wraps the same protocol and yields owned rows.
///
/// The iterator is not `Clone`: two cursors stepping one statement would
/// read each other's rows.
///
/// ```compile_fail
/// # use sqlite_cursor::{Database, QueryIterator};
/// let db = Database::open_in_memory().unwrap();
/// let rows = db.exec("SELECT 1").unwrap();
/// let copy: QueryIterator<'_> = rows.clone();
/// ```
#[derive(Debug, Default)]
pub struct QueryIterator<'conn> {
    statement: SharedPreparedStatement<'conn>,
    row: Option<usize>,
    current: Option<ResultRow>,
    pending: Option<Error>,
}

impl<'conn> QueryIterator<'conn> {
    /// The end iterator: no statement, no row.
    pub fn end() -> Self {
        Self::default()
    }

    /// Takes ownership of `statement` and steps it once to reach the first
    /// row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Engine`] if the first step fails.
    pub fn new(statement: impl Into<SharedPreparedStatement<'conn>>) -> Result<Self> {
        let mut iter = Self {
            statement: statement.into(),
            ..Self::default()
        };
        iter.prime()?;
        Ok(iter)
    }

    /// Steps onto the first row, or finishes if there is none.
    fn prime(&mut self) -> Result<()> {
        self.current = None;
        if !self.statement.is_good() {
            return Ok(());
        }
        match self.statement.step() {
            Ok(Step::Row) => {
                self.row = Some(0);
                Ok(())
            }
            Ok(Step::Done) => {
                self.finish();
                Ok(())
            }
            Err(err) => {
                self.finish();
                Err(err)
            }
        }
    }

    fn finish(&mut self) {
        self.row = None;
        self.current = None;
        self.statement.release();
    }

    /// Returns `true` once no rows remain.
    pub fn is_end(&self) -> bool {
        !self.statement.is_good() || self.row.is_none()
    }

    /// Zero-based index of the current row, or `None` at the end.
    pub fn row_index(&self) -> Option<usize> {
        if self.is_end() { None } else { self.row }
    }

    /// The row under the cursor, read from the statement on first access and
    /// cached until the next advance.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStatement`] at the end, or the column
    /// extraction error if reading the row fails.
    pub fn current(&mut self) -> Result<&ResultRow> {
        if self.is_end() {
            return Err(Error::InvalidStatement);
        }
        if self.current.is_none() {
            self.current = Some(ResultRow::materialize(&self.statement)?);
        }
        self.current.as_ref().ok_or(Error::InvalidStatement)
    }

    /// Moves to the next row. A no-op at the end.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Engine`] if the step fails. The iterator is at the
    /// end afterwards and must not be used to continue the query.
    pub fn advance(&mut self) -> Result<()> {
        let Some(index) = self.row_index() else {
            return Ok(());
        };
        self.current = None;
        match self.statement.step() {
            Ok(Step::Row) => {
                self.row = Some(index + 1);
                Ok(())
            }
            Ok(Step::Done) => {
                debug!(rows = index + 1, "query exhausted");
                self.finish();
                Ok(())
            }
            Err(err) => {
                self.finish();
                Err(err)
            }
        }
    }

    /// Rewinds the statement and steps onto the first row again, re-running
    /// the query from the top. A no-op once the statement has been released.
    pub fn reset(&mut self) -> Result<()> {
        if !self.statement.is_good() {
            return Ok(());
        }
        trace!("rewinding query");
        self.current = None;
        if let Err(err) = self.statement.reset() {
            self.finish();
            return Err(err);
        }
        self.prime()
    }

    /// Counts the rows from the cursor to the end, then [`reset`](Self::reset)s
    /// so the query can be iterated again from its first row.
    ///
    /// The reset also happens when counting fails; the counting error is
    /// reported in preference to a reset error.
    pub fn row_count(&mut self) -> Result<usize> {
        let counted = self.fork().count_remaining();
        let restored = self.reset();
        let count = counted?;
        restored?;
        Ok(count)
    }

    /// A second cursor on the same statement and position. Stepping either
    /// moves both, so only one may be read from afterwards.
    pub(crate) fn fork(&self) -> Self {
        Self {
            statement: self.statement.share(),
            row: self.row,
            current: self.current.clone(),
            pending: None,
        }
    }

    fn count_remaining(mut self) -> Result<usize> {
        let mut count = 0;
        while !self.is_end() {
            count += 1;
            self.advance()?;
        }
        Ok(count)
    }
}

/// Equal when both are at the end, or both sit on the same row of the same
/// statement.
impl PartialEq for QueryIterator<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self.is_end(), other.is_end()) {
            (true, true) => true,
            (false, false) => {
                self.statement.same_statement(&other.statement) && self.row == other.row
            }
            _ => false,
        }
    }
}

/// Yields the current row, then advances.
///
/// An error from the advance that follows a yielded row is yielded on the
/// next call, after which iteration ends.
impl Iterator for QueryIterator<'_> {
    type Item = Result<ResultRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.pending.take() {
            return Some(Err(err));
        }
        if self.is_end() {
            return None;
        }
        let row = match self.current.take() {
            Some(row) => row,
            None => match ResultRow::materialize(&self.statement) {
                Ok(row) => row,
                Err(err) => {
                    self.finish();
                    return Some(Err(err));
                }
            },
        };
        if let Err(err) = self.advance() {
            self.pending = Some(err);
        }
        Some(Ok(row))
    }
}

impl FusedIterator for QueryIterator<'_> {}
