//! Error types for statement, iterator, and connection operations.
//!
//! Every recoverable failure is an [`Error`] surfaced to the immediate
//! caller. Corrupted type tags are not recoverable and go through
//! [`fatal_unknown_type`] instead.

use thiserror::Error;

use crate::value::ColumnType;

/// Errors that can occur while preparing, binding, stepping, or reading
/// statements.
#[derive(Debug, Error)]
pub enum Error {
    /// The engine rejected an operation (prepare, bind, step, reset).
    #[error("sqlite error {code}: {message}")]
    Engine {
        /// Extended result code reported by the engine.
        code: i32,
        /// Engine-provided description of the failure.
        message: String,
    },

    /// Connection-level failure surfaced through rusqlite.
    #[error("connection error: {0}")]
    Connection(#[from] rusqlite::Error),

    /// A typed accessor was called on a cell holding another kind.
    #[error("cell value is not of type {expected} (found {actual})")]
    TypeMismatch {
        /// The kind the caller asked for.
        expected: ColumnType,
        /// The kind the cell actually holds.
        actual: ColumnType,
    },

    /// The statement has no compiled handle (empty or released).
    #[error("attempt to use an invalid statement")]
    InvalidStatement,

    /// Column index outside `[0, column_count)`.
    #[error("column {index} is out of range (statement has {count} columns)")]
    ColumnOutOfRange { index: usize, count: usize },

    /// Parameter index outside `[1, parameter_count]`.
    #[error("parameter {index} is out of range (statement has {count} parameters)")]
    ParameterOutOfRange { index: usize, count: usize },

    /// No column in the row carries the requested name.
    #[error("no column named '{0}'")]
    ColumnNotFound(String),

    /// A text column held bytes that are not valid UTF-8.
    #[error("column {column} does not contain valid UTF-8 text")]
    InvalidUtf8 { column: usize },

    /// The SQL text contained more than one statement.
    #[error("multiple statements provided; only one statement can be prepared at a time")]
    MultipleStatements,

    /// The SQL text contained a NUL byte.
    #[error("SQL text contains a NUL byte at offset {position}")]
    NulInSql { position: usize },

    /// A single-row query produced more than one row.
    #[error("query returned more than one row")]
    TooManyRows,

    /// Invalid connection configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// File I/O failure while reading or writing configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Returns the engine's native result code, if the failure came from
    /// the engine.
    pub fn code(&self) -> Option<i32> {
        match self {
            Error::Engine { code, .. } => Some(*code),
            Error::Connection(rusqlite::Error::SqliteFailure(err, _)) => Some(err.extended_code),
            _ => None,
        }
    }
}

/// Convenience alias for results with [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Terminates the process after observing a column type code outside the
/// five known kinds.
///
/// This is not an error condition a caller can handle: it means the engine
/// and this crate disagree about the type tag set, or memory is corrupted.
#[cold]
pub(crate) fn fatal_unknown_type(code: i32) -> ! {
    tracing::error!(code, "unknown sqlite column type returned");
    std::process::abort()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_reports_code() {
        let err = Error::Engine {
            code: 1,
            message: "near \"SELEC\": syntax error".to_string(),
        };
        assert_eq!(err.code(), Some(1));
        assert!(err.to_string().contains("syntax error"));
    }

    #[test]
    fn test_non_engine_errors_have_no_code() {
        assert_eq!(Error::InvalidStatement.code(), None);
        assert_eq!(Error::TooManyRows.code(), None);
    }

    #[test]
    fn test_type_mismatch_names_expected_kind() {
        let err = Error::TypeMismatch {
            expected: ColumnType::Integer,
            actual: ColumnType::Text,
        };
        assert_eq!(err.to_string(), "cell value is not of type Integer (found Text)");
    }
}
