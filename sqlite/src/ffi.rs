//! Raw statement handle over the SQLite C API.
//!
//! This is the only module that contains `unsafe` code. Connections are
//! opened and owned by rusqlite; compiled statements are driven directly
//! through `rusqlite::ffi` because a statement that outlives a single call
//! and is stepped repeatedly cannot be held through rusqlite's borrowed
//! `Rows` cursor.

use std::ffi::{CStr, c_char, c_int, c_void};
use std::ptr::{self, NonNull};

use rusqlite::{Connection, ffi};
use tracing::trace;

use crate::error::{Error, Result, fatal_unknown_type};
use crate::value::ColumnType;

/// Outcome of one successful `sqlite3_step` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A result row is available for column reads.
    Row,
    /// The statement has run to completion.
    Done,
}

/// An owned, non-null `sqlite3_stmt`. Finalized on drop.
///
/// Every method takes `&self`; the engine does its own bookkeeping behind
/// the pointer. Callers must not keep a slice returned by
/// [`column_text`](Self::column_text) or [`column_blob`](Self::column_blob)
/// alive across a step, reset, or finalize of the same statement.
#[derive(Debug)]
pub struct RawStatement {
    ptr: NonNull<ffi::sqlite3_stmt>,
}

impl RawStatement {
    /// Compiles the single statement in `sql`.
    ///
    /// Returns `Ok(None)` when `sql` holds no statement at all (empty,
    /// whitespace, or comments only). Fails with
    /// [`Error::MultipleStatements`] if anything other than comments
    /// follows the first statement, and with [`Error::NulInSql`] if `sql`
    /// contains a NUL byte, where the engine would stop reading.
    pub(crate) fn prepare(conn: &Connection, sql: &str) -> Result<Option<RawStatement>> {
        if let Some(position) = sql.find('\0') {
            return Err(Error::NulInSql { position });
        }

        // SAFETY: the handle stays valid while `conn` is borrowed, and it is
        // only passed to engine calls below.
        let db = unsafe { conn.handle() };

        let (statement, consumed) = prepare_one(db, sql)?;
        let rest = &sql[consumed..];
        if !rest.trim_matches(|c: char| c.is_whitespace() || c == ';').is_empty() {
            // A tail that depends on the first statement fails to compile.
            match prepare_one(db, rest) {
                Ok((None, _)) => {}
                Ok((Some(_), _)) | Err(_) => return Err(Error::MultipleStatements),
            }
        }
        Ok(statement)
    }

    fn as_ptr(&self) -> *mut ffi::sqlite3_stmt {
        self.ptr.as_ptr()
    }

    /// Builds an [`Error::Engine`] from `rc` and the connection's message.
    fn error(&self, rc: c_int) -> Error {
        // SAFETY: a live statement always has a live owning connection.
        unsafe { engine_error(ffi::sqlite3_db_handle(self.as_ptr()), rc) }
    }

    fn check(&self, rc: c_int) -> Result<()> {
        if rc == ffi::SQLITE_OK {
            Ok(())
        } else {
            Err(self.error(rc))
        }
    }

    pub(crate) fn step(&self) -> Result<Step> {
        // SAFETY: `ptr` is a live statement owned by `self`.
        let rc = unsafe { ffi::sqlite3_step(self.as_ptr()) };
        match rc {
            ffi::SQLITE_ROW => Ok(Step::Row),
            ffi::SQLITE_DONE => Ok(Step::Done),
            rc => Err(self.error(rc)),
        }
    }

    /// Rewinds the statement.
    ///
    /// After a failed step, `sqlite3_reset` rewinds but returns that step's
    /// error again. A second call reports on the reset itself.
    pub(crate) fn reset(&self) -> Result<()> {
        // SAFETY: `ptr` is a live statement owned by `self`.
        let rc = unsafe { ffi::sqlite3_reset(self.as_ptr()) };
        if rc == ffi::SQLITE_OK {
            return Ok(());
        }
        trace!(rc, "reset repeated the last step error");
        // SAFETY: as above.
        let rc = unsafe { ffi::sqlite3_reset(self.as_ptr()) };
        self.check(rc)
    }

    pub(crate) fn sql(&self) -> String {
        // SAFETY: `ptr` is live; the returned string is owned by the statement.
        unsafe { lossy(ffi::sqlite3_sql(self.as_ptr())) }
    }

    pub(crate) fn parameter_count(&self) -> usize {
        // SAFETY: `ptr` is a live statement owned by `self`.
        let count = unsafe { ffi::sqlite3_bind_parameter_count(self.as_ptr()) };
        usize::try_from(count).unwrap_or(0)
    }

    pub(crate) fn bind_float(&self, index: c_int, value: f64) -> Result<()> {
        // SAFETY: `ptr` is a live statement owned by `self`.
        let rc = unsafe { ffi::sqlite3_bind_double(self.as_ptr(), index, value) };
        self.check(rc)
    }

    pub(crate) fn bind_integer(&self, index: c_int, value: i64) -> Result<()> {
        // SAFETY: `ptr` is a live statement owned by `self`.
        let rc = unsafe { ffi::sqlite3_bind_int64(self.as_ptr(), index, value) };
        self.check(rc)
    }

    /// Binds text; the engine copies the bytes before returning.
    pub(crate) fn bind_text(&self, index: c_int, value: &str) -> Result<()> {
        let len = self.length(value.len())?;
        // SAFETY: `value` is valid for `len` bytes and SQLITE_TRANSIENT makes
        // the engine take its own copy.
        let rc = unsafe {
            ffi::sqlite3_bind_text(
                self.as_ptr(),
                index,
                value.as_ptr().cast::<c_char>(),
                len,
                ffi::SQLITE_TRANSIENT(),
            )
        };
        self.check(rc)
    }

    /// Binds a blob; the engine copies the bytes before returning.
    pub(crate) fn bind_blob(&self, index: c_int, value: &[u8]) -> Result<()> {
        let len = self.length(value.len())?;
        // A null data pointer would bind NULL, so empty blobs go through
        // zeroblob instead.
        let rc = if len == 0 {
            // SAFETY: `ptr` is a live statement owned by `self`.
            unsafe { ffi::sqlite3_bind_zeroblob(self.as_ptr(), index, 0) }
        } else {
            // SAFETY: `value` is valid for `len` bytes and SQLITE_TRANSIENT
            // makes the engine take its own copy.
            unsafe {
                ffi::sqlite3_bind_blob(
                    self.as_ptr(),
                    index,
                    value.as_ptr().cast::<c_void>(),
                    len,
                    ffi::SQLITE_TRANSIENT(),
                )
            }
        };
        self.check(rc)
    }

    pub(crate) fn bind_null(&self, index: c_int) -> Result<()> {
        // SAFETY: `ptr` is a live statement owned by `self`.
        let rc = unsafe { ffi::sqlite3_bind_null(self.as_ptr(), index) };
        self.check(rc)
    }

    pub(crate) fn column_count(&self) -> usize {
        // SAFETY: `ptr` is a live statement owned by `self`.
        let count = unsafe { ffi::sqlite3_column_count(self.as_ptr()) };
        usize::try_from(count).unwrap_or(0)
    }

    pub(crate) fn column_type(&self, column: c_int) -> ColumnType {
        // SAFETY: `ptr` is live and `column` was range-checked by the caller.
        let code = unsafe { ffi::sqlite3_column_type(self.as_ptr(), column) };
        match code {
            ffi::SQLITE_INTEGER => ColumnType::Integer,
            ffi::SQLITE_FLOAT => ColumnType::Float,
            ffi::SQLITE_TEXT => ColumnType::Text,
            ffi::SQLITE_BLOB => ColumnType::Blob,
            ffi::SQLITE_NULL => ColumnType::Null,
            other => fatal_unknown_type(other),
        }
    }

    pub(crate) fn column_name(&self, column: c_int) -> Result<String> {
        // SAFETY: `ptr` is live and `column` was range-checked by the caller.
        let name = unsafe { ffi::sqlite3_column_name(self.as_ptr(), column) };
        if name.is_null() {
            return Err(self.error(ffi::SQLITE_NOMEM));
        }
        // SAFETY: non-null names are NUL-terminated and owned by the statement.
        Ok(unsafe { lossy(name) })
    }

    pub(crate) fn column_float(&self, column: c_int) -> f64 {
        // SAFETY: `ptr` is live and `column` was range-checked by the caller.
        unsafe { ffi::sqlite3_column_double(self.as_ptr(), column) }
    }

    pub(crate) fn column_integer(&self, column: c_int) -> i64 {
        // SAFETY: `ptr` is live and `column` was range-checked by the caller.
        unsafe { ffi::sqlite3_column_int64(self.as_ptr(), column) }
    }

    /// Returns the raw bytes of a text column.
    ///
    /// # Safety
    ///
    /// The slice points into the engine's per-step buffer. It must not be
    /// used after the next step, reset, or finalize of this statement.
    pub(crate) unsafe fn column_text(&self, column: c_int) -> Result<&[u8]> {
        // SAFETY: `ptr` is live; text must be fetched before its byte count.
        unsafe {
            let data = ffi::sqlite3_column_text(self.as_ptr(), column);
            let len = ffi::sqlite3_column_bytes(self.as_ptr(), column);
            self.column_bytes(data.cast::<u8>(), len)
        }
    }

    /// Returns the raw bytes of a blob column.
    ///
    /// # Safety
    ///
    /// Same contract as [`column_text`](Self::column_text).
    pub(crate) unsafe fn column_blob(&self, column: c_int) -> Result<&[u8]> {
        // SAFETY: `ptr` is live; blob must be fetched before its byte count.
        unsafe {
            let data = ffi::sqlite3_column_blob(self.as_ptr(), column);
            let len = ffi::sqlite3_column_bytes(self.as_ptr(), column);
            self.column_bytes(data.cast::<u8>(), len)
        }
    }

    /// # Safety
    ///
    /// `data` must be null or valid for `len` bytes for the returned lifetime.
    unsafe fn column_bytes(&self, data: *const u8, len: c_int) -> Result<&[u8]> {
        let len = usize::try_from(len).unwrap_or(0);
        if data.is_null() {
            // Zero-length values come back as null; anything else is OOM.
            return if len == 0 {
                Ok(&[])
            } else {
                Err(self.error(ffi::SQLITE_NOMEM))
            };
        }
        // SAFETY: upheld by the caller.
        Ok(unsafe { std::slice::from_raw_parts(data, len) })
    }

    fn length(&self, len: usize) -> Result<c_int> {
        c_int::try_from(len).map_err(|_| Error::Engine {
            code: ffi::SQLITE_TOOBIG,
            message: format!("value of {len} bytes exceeds the engine limit"),
        })
    }
}

impl Drop for RawStatement {
    fn drop(&mut self) {
        // SAFETY: `ptr` is owned by `self` and finalized exactly once here.
        // The return code repeats the last step's error, which was already
        // surfaced.
        unsafe {
            ffi::sqlite3_finalize(self.as_ptr());
        }
    }
}

/// Compiles the first statement of `sql`, returning it (if any) and the
/// number of bytes consumed.
fn prepare_one(db: *mut ffi::sqlite3, sql: &str) -> Result<(Option<RawStatement>, usize)> {
    let len = c_int::try_from(sql.len()).map_err(|_| Error::Engine {
        code: ffi::SQLITE_TOOBIG,
        message: format!("SQL text of {} bytes exceeds the engine limit", sql.len()),
    })?;
    let mut stmt = ptr::null_mut();
    let mut tail: *const c_char = ptr::null();
    // SAFETY: `db` is a live connection handle and `sql` is valid for `len`
    // bytes; the engine does not require NUL termination when a length is
    // given.
    let rc = unsafe {
        ffi::sqlite3_prepare_v2(db, sql.as_ptr().cast::<c_char>(), len, &mut stmt, &mut tail)
    };
    if rc != ffi::SQLITE_OK {
        // SAFETY: on failure no statement is allocated; `db` is live.
        return Err(unsafe { engine_error(db, rc) });
    }
    let consumed = if tail.is_null() {
        sql.len()
    } else {
        // `tail` points into `sql`, at or after its start.
        (tail as usize).saturating_sub(sql.as_ptr() as usize).min(sql.len())
    };
    Ok((NonNull::new(stmt).map(|ptr| RawStatement { ptr }), consumed))
}

/// # Safety
///
/// `db` must be a live connection handle or null.
unsafe fn engine_error(db: *mut ffi::sqlite3, rc: c_int) -> Error {
    // SAFETY: the engine tolerates null for both calls; strings it returns
    // are NUL-terminated and static or connection-owned.
    unsafe {
        let code = if db.is_null() {
            rc
        } else {
            match ffi::sqlite3_extended_errcode(db) {
                // A stale connection code; report the call's own result.
                ffi::SQLITE_OK => rc,
                extended if extended & 0xff == rc & 0xff => extended,
                _ => rc,
            }
        };
        let message = if db.is_null() {
            lossy(ffi::sqlite3_errstr(rc))
        } else {
            lossy(ffi::sqlite3_errmsg(db))
        };
        Error::Engine { code, message }
    }
}

/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string.
unsafe fn lossy(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    // SAFETY: upheld by the caller.
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}
