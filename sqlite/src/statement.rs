//! Prepared statements with exclusive or shared ownership of the handle.
//!
//! [`Statement`] is generic over an [`Ownership`] strategy chosen at
//! construction: [`Unique`] owns the compiled handle outright, [`Shared`]
//! reference-counts it so a [`QueryIterator`](crate::QueryIterator) and its
//! copies can keep stepping the same handle. The handle is finalized exactly
//! once, when its last owner goes away.
//!
//! Column accessors borrow `&self` and every cursor-moving operation takes
//! `&mut self`, so text and blob views read off the current row cannot
//! outlive the step that produced them.
//!
//! # Example
//!
//! ```
//! use sqlite_cursor::{CellValue, Database, Step};
//!
//! let db = Database::open_in_memory().unwrap();
//! let mut stmt = db.prepare("SELECT ?1 AS greeting").unwrap();
//! stmt.bind(1, &CellValue::from("hello")).unwrap();
//!
//! assert_eq!(stmt.step().unwrap(), Step::Row);
//! assert_eq!(stmt.column_name(0).unwrap(), "greeting");
//! assert_eq!(stmt.column_text(0).unwrap(), "hello");
//! assert_eq!(stmt.step().unwrap(), Step::Done);
//! ```

use std::borrow::Cow;
use std::ffi::c_int;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::database::Database;
use crate::error::{Error, Result};
use crate::ffi::{RawStatement, Step};
use crate::value::{CellValue, ColumnType};

mod sealed {
    pub trait Sealed {}
}

/// How a [`Statement`] holds its compiled handle.
pub trait Ownership: sealed::Sealed {
    #[doc(hidden)]
    type Handle: Deref<Target = RawStatement>;

    #[doc(hidden)]
    fn adopt(raw: RawStatement) -> Self::Handle;
}

/// Exclusive ownership: the statement is move-only.
#[derive(Debug)]
pub enum Unique {}

/// Reference-counted ownership, shared with query iterators.
#[derive(Debug)]
pub enum Shared {}

impl sealed::Sealed for Unique {}
impl sealed::Sealed for Shared {}

impl Ownership for Unique {
    type Handle = Box<RawStatement>;

    fn adopt(raw: RawStatement) -> Self::Handle {
        Box::new(raw)
    }
}

impl Ownership for Shared {
    type Handle = Rc<RawStatement>;

    fn adopt(raw: RawStatement) -> Self::Handle {
        Rc::new(raw)
    }
}

/// A compiled SQL statement tied to the [`Database`] it was prepared on.
///
/// A statement is *good* while it holds a handle. Statements prepared from
/// SQL without any statement in it, and statements that have been
/// [`release`](Self::release)d, are not good; binding, stepping, and column
/// access on them fail with [`Error::InvalidStatement`].
pub struct Statement<'conn, O: Ownership = Unique> {
    handle: Option<O::Handle>,
    _conn: PhantomData<&'conn Database>,
}

/// A statement that exclusively owns its handle.
pub type PreparedStatement<'conn> = Statement<'conn, Unique>;

/// A statement whose handle is reference-counted.
pub type SharedPreparedStatement<'conn> = Statement<'conn, Shared>;

impl<'conn, O: Ownership> Statement<'conn, O> {
    /// Compiles `sql` against `db`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Engine`] with the engine's code if compilation fails,
    /// or [`Error::MultipleStatements`] if `sql` holds more than one
    /// statement.
    pub fn prepare(db: &'conn Database, sql: &str) -> Result<Self> {
        let handle = RawStatement::prepare(db.connection(), sql)?.map(O::adopt);
        debug!(sql, empty = handle.is_none(), "prepared statement");
        Ok(Self {
            handle,
            _conn: PhantomData,
        })
    }

    /// Compiles `sql` and binds `params` positionally, starting at index 1.
    pub fn prepare_with(db: &'conn Database, sql: &str, params: &[CellValue<'_>]) -> Result<Self> {
        let mut statement = Self::prepare(db, sql)?;
        statement.bind_all(params)?;
        Ok(statement)
    }

    fn raw(&self) -> Result<&RawStatement> {
        self.handle.as_deref().ok_or(Error::InvalidStatement)
    }

    /// Returns `true` if the statement holds a compiled handle.
    pub fn is_good(&self) -> bool {
        self.handle.is_some()
    }

    /// Returns `true` if both statements refer to the same compiled handle.
    pub fn same_statement<P: Ownership>(&self, other: &Statement<'_, P>) -> bool {
        match (self.handle.as_deref(), other.handle.as_deref()) {
            (Some(a), Some(b)) => std::ptr::eq(a, b),
            _ => false,
        }
    }

    /// The SQL text the statement was compiled from.
    pub fn sql(&self) -> Option<String> {
        self.handle.as_deref().map(RawStatement::sql)
    }

    /// Number of columns in the result shape. Zero for statements that are
    /// not good or produce no result columns.
    pub fn column_count(&self) -> usize {
        self.handle.as_deref().map_or(0, RawStatement::column_count)
    }

    /// Number of bindable parameters.
    pub fn parameter_count(&self) -> usize {
        self.handle.as_deref().map_or(0, RawStatement::parameter_count)
    }

    /// Validates `column` against the current shape.
    fn column(&self, column: usize) -> Result<(&RawStatement, c_int)> {
        let raw = self.raw()?;
        let count = raw.column_count();
        if column >= count {
            return Err(Error::ColumnOutOfRange {
                index: column,
                count,
            });
        }
        // In range, and the engine counts columns in a c_int.
        Ok((raw, column as c_int))
    }

    pub fn column_type(&self, column: usize) -> Result<ColumnType> {
        let (raw, index) = self.column(column)?;
        Ok(raw.column_type(index))
    }

    pub fn column_name(&self, column: usize) -> Result<String> {
        let (raw, index) = self.column(column)?;
        raw.column_name(index)
    }

    pub fn column_float(&self, column: usize) -> Result<f64> {
        let (raw, index) = self.column(column)?;
        Ok(raw.column_float(index))
    }

    pub fn column_integer(&self, column: usize) -> Result<i64> {
        let (raw, index) = self.column(column)?;
        Ok(raw.column_integer(index))
    }

    /// Text of `column` in the current row, borrowed from the engine.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUtf8`] if the stored bytes are not UTF-8.
    pub fn column_text(&self, column: usize) -> Result<&str> {
        let (raw, index) = self.column(column)?;
        // SAFETY: the slice borrows `self`, and stepping, resetting, or
        // releasing need `&mut self`.
        let bytes = unsafe { raw.column_text(index) }?;
        std::str::from_utf8(bytes).map_err(|_| Error::InvalidUtf8 { column })
    }

    /// Bytes of `column` in the current row, borrowed from the engine.
    pub fn column_blob(&self, column: usize) -> Result<&[u8]> {
        let (raw, index) = self.column(column)?;
        // SAFETY: as for `column_text`.
        unsafe { raw.column_blob(index) }
    }

    pub fn is_column_null(&self, column: usize) -> Result<bool> {
        Ok(self.column_type(column)? == ColumnType::Null)
    }

    /// Reads `column` of the current row as a [`CellValue`] borrowing the
    /// engine's buffer for text and blob columns.
    pub fn cell(&self, column: usize) -> Result<CellValue<'_>> {
        let value = match self.column_type(column)? {
            ColumnType::Float => CellValue::Float(self.column_float(column)?),
            ColumnType::Integer => CellValue::Integer(self.column_integer(column)?),
            ColumnType::Text => CellValue::Text(Cow::Borrowed(self.column_text(column)?)),
            ColumnType::Blob => CellValue::Blob(Cow::Borrowed(self.column_blob(column)?)),
            ColumnType::Null => CellValue::Null,
        };
        Ok(value)
    }

    /// Advances the cursor by one row.
    pub fn step(&mut self) -> Result<Step> {
        let step = self.raw()?.step()?;
        trace!(?step, "stepped statement");
        Ok(step)
    }

    /// Rewinds the cursor so the statement can be stepped from the start.
    /// Bound parameters are kept.
    pub fn reset(&mut self) -> Result<()> {
        self.raw()?.reset()?;
        trace!("reset statement");
        Ok(())
    }

    /// Drops this owner's reference to the handle, leaving the statement
    /// in its default, not-good state.
    pub fn release(&mut self) {
        self.handle = None;
    }

    fn parameter(&self, index: usize) -> Result<(&RawStatement, c_int)> {
        let raw = self.raw()?;
        let count = raw.parameter_count();
        if index == 0 || index > count {
            return Err(Error::ParameterOutOfRange { index, count });
        }
        Ok((raw, index as c_int))
    }

    /// Binds `value` to the 1-based parameter `index`.
    ///
    /// Text and blob bytes are copied into engine-owned storage, so the
    /// caller's buffer may be reused as soon as this returns.
    pub fn bind(&mut self, index: usize, value: &CellValue<'_>) -> Result<()> {
        let (raw, position) = self.parameter(index)?;
        trace!(index, kind = %value.column_type(), "binding parameter");
        match value {
            CellValue::Float(v) => raw.bind_float(position, *v),
            CellValue::Integer(v) => raw.bind_integer(position, *v),
            CellValue::Text(v) => raw.bind_text(position, v),
            CellValue::Blob(v) => raw.bind_blob(position, v),
            CellValue::Null => raw.bind_null(position),
        }
    }

    /// Binds SQL NULL to the 1-based parameter `index`.
    pub fn bind_null(&mut self, index: usize) -> Result<()> {
        let (raw, position) = self.parameter(index)?;
        raw.bind_null(position)
    }

    /// Binds `params` to parameters `1..=params.len()`.
    pub fn bind_all(&mut self, params: &[CellValue<'_>]) -> Result<()> {
        for (offset, value) in params.iter().enumerate() {
            self.bind(offset + 1, value)?;
        }
        Ok(())
    }
}

impl<'conn> PreparedStatement<'conn> {
    /// Converts to a shared statement, keeping the same handle.
    pub fn into_shared(self) -> SharedPreparedStatement<'conn> {
        SharedPreparedStatement::from(self)
    }
}

impl SharedPreparedStatement<'_> {
    /// Another owner of the same handle.
    ///
    /// Kept crate-private: views borrowed from one owner would dangle if a
    /// second owner outside the crate stepped the handle.
    pub(crate) fn share(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            _conn: PhantomData,
        }
    }
}

impl<'conn> From<PreparedStatement<'conn>> for SharedPreparedStatement<'conn> {
    fn from(statement: PreparedStatement<'conn>) -> Self {
        Self {
            handle: statement.handle.map(|raw| Rc::new(*raw)),
            _conn: PhantomData,
        }
    }
}

impl<O: Ownership> Default for Statement<'_, O> {
    fn default() -> Self {
        Self {
            handle: None,
            _conn: PhantomData,
        }
    }
}

impl<O: Ownership> fmt::Debug for Statement<'_, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("sql", &self.sql())
            .field("good", &self.is_good())
            .finish()
    }
}
