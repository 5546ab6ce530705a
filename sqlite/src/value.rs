//! The cell value type: one column of one row.
//!
//! [`CellValue`] is a closed five-kind sum type. Text and blob payloads are
//! held as [`Cow`] so a value read straight off a statement can borrow the
//! engine's per-step buffer, while values stored in a
//! [`ResultRow`](crate::ResultRow) own their bytes.
//!
//! # Example
//!
//! ```
//! use sqlite_cursor::{CellValue, ColumnType};
//!
//! let value = CellValue::from(42);
//! assert_eq!(value.column_type(), ColumnType::Integer);
//! assert_eq!(value.get_integer().unwrap(), 42);
//! assert!(value.get_text().is_err());
//! ```

use std::borrow::Cow;
use std::fmt;

use crate::error::{Error, Result};

/// The kind of value held by a [`CellValue`] or reported for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Float,
    Integer,
    Text,
    Blob,
    Null,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Float => "Float",
            ColumnType::Integer => "Integer",
            ColumnType::Text => "Text",
            ColumnType::Blob => "Blob",
            ColumnType::Null => "Null",
        };
        f.write_str(name)
    }
}

/// A single column value.
///
/// The default value is [`CellValue::Null`]. Typed accessors succeed only
/// for the active kind and fail with [`Error::TypeMismatch`] otherwise.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue<'a> {
    Float(f64),
    Integer(i64),
    Text(Cow<'a, str>),
    Blob(Cow<'a, [u8]>),
    #[default]
    Null,
}

impl<'a> CellValue<'a> {
    /// Creates a null value.
    pub const fn null() -> Self {
        CellValue::Null
    }

    /// Returns the kind currently held.
    pub fn column_type(&self) -> ColumnType {
        match self {
            CellValue::Float(_) => ColumnType::Float,
            CellValue::Integer(_) => ColumnType::Integer,
            CellValue::Text(_) => ColumnType::Text,
            CellValue::Blob(_) => ColumnType::Blob,
            CellValue::Null => ColumnType::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn get_float(&self) -> Result<f64> {
        match self {
            CellValue::Float(v) => Ok(*v),
            other => Err(other.mismatch(ColumnType::Float)),
        }
    }

    pub fn get_integer(&self) -> Result<i64> {
        match self {
            CellValue::Integer(v) => Ok(*v),
            other => Err(other.mismatch(ColumnType::Integer)),
        }
    }

    /// Reads an integer cell as a boolean (`0` is false, anything else true).
    pub fn get_bool(&self) -> Result<bool> {
        self.get_integer().map(|v| v != 0)
    }

    pub fn get_text(&self) -> Result<&str> {
        match self {
            CellValue::Text(v) => Ok(v),
            other => Err(other.mismatch(ColumnType::Text)),
        }
    }

    pub fn get_blob(&self) -> Result<&[u8]> {
        match self {
            CellValue::Blob(v) => Ok(v),
            other => Err(other.mismatch(ColumnType::Blob)),
        }
    }

    /// Detaches the value from whatever buffer it borrows from.
    pub fn into_owned(self) -> CellValue<'static> {
        match self {
            CellValue::Float(v) => CellValue::Float(v),
            CellValue::Integer(v) => CellValue::Integer(v),
            CellValue::Text(v) => CellValue::Text(Cow::Owned(v.into_owned())),
            CellValue::Blob(v) => CellValue::Blob(Cow::Owned(v.into_owned())),
            CellValue::Null => CellValue::Null,
        }
    }

    fn mismatch(&self, expected: ColumnType) -> Error {
        Error::TypeMismatch {
            expected,
            actual: self.column_type(),
        }
    }
}

/// Renders floats and integers in decimal, text as-is, blobs as lowercase
/// hex, and null as `{Null}`.
impl fmt::Display for CellValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Integer(v) => write!(f, "{v}"),
            CellValue::Text(v) => f.write_str(v),
            CellValue::Blob(bytes) => {
                for byte in bytes.iter() {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            CellValue::Null => f.write_str("{Null}"),
        }
    }
}

impl From<f64> for CellValue<'_> {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<f32> for CellValue<'_> {
    fn from(value: f32) -> Self {
        CellValue::Float(f64::from(value))
    }
}

macro_rules! from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for CellValue<'_> {
                fn from(value: $ty) -> Self {
                    CellValue::Integer(i64::from(value))
                }
            }
        )*
    };
}

from_integer!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for CellValue<'_> {
    fn from(value: bool) -> Self {
        CellValue::Integer(i64::from(value))
    }
}

impl<'a> From<&'a str> for CellValue<'a> {
    fn from(value: &'a str) -> Self {
        CellValue::Text(Cow::Borrowed(value))
    }
}

impl<'a> From<&'a String> for CellValue<'a> {
    fn from(value: &'a String) -> Self {
        CellValue::Text(Cow::Borrowed(value.as_str()))
    }
}

impl From<String> for CellValue<'_> {
    fn from(value: String) -> Self {
        CellValue::Text(Cow::Owned(value))
    }
}

impl<'a> From<&'a [u8]> for CellValue<'a> {
    fn from(value: &'a [u8]) -> Self {
        CellValue::Blob(Cow::Borrowed(value))
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for CellValue<'a> {
    fn from(value: &'a [u8; N]) -> Self {
        CellValue::Blob(Cow::Borrowed(value.as_slice()))
    }
}

impl From<Vec<u8>> for CellValue<'_> {
    fn from(value: Vec<u8>) -> Self {
        CellValue::Blob(Cow::Owned(value))
    }
}

impl<'a, T> From<Option<T>> for CellValue<'a>
where
    T: Into<CellValue<'a>>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Null, Into::into)
    }
}

/// Builds an array of [`CellValue`]s from heterogeneous expressions.
///
/// Each expression is converted with `CellValue::from`, so anything with a
/// `From` conversion is accepted.
///
/// ```
/// use sqlite_cursor::{params, CellValue};
///
/// let bound = params![1, 2.5, "three", None::<i64>];
/// assert_eq!(bound.len(), 4);
/// assert!(bound[3].is_null());
/// ```
#[macro_export]
macro_rules! params {
    () => {{
        let params: [$crate::CellValue<'static>; 0] = [];
        params
    }};
    ($($param:expr),+ $(,)?) => {
        [$($crate::CellValue::from($param)),+]
    };
}
