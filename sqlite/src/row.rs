//! Materialized result rows.

use std::fmt;
use std::ops::Index;

use crate::error::{Error, Result};
use crate::statement::{Ownership, Statement};
use crate::value::CellValue;

/// One named column of a [`ResultRow`].
#[derive(Debug, Clone, PartialEq)]
pub struct ResultCell {
    pub name: String,
    pub value: CellValue<'static>,
}

/// An ordered snapshot of every column of one result row.
///
/// Columns keep result-set order. Names need not be unique (joins may
/// repeat them); name lookups return the first match.
///
/// # Examples
///
/// ```
/// use sqlite_cursor::Database;
///
/// let db = Database::open_in_memory().unwrap();
/// let mut rows = db.exec("SELECT 1 AS x, 'a' AS y").unwrap();
/// let row = rows.current().unwrap();
///
/// assert_eq!(row.len(), 2);
/// assert_eq!(row[0].value.get_integer().unwrap(), 1);
/// assert_eq!(row["y"].get_text().unwrap(), "a");
/// assert_eq!(row.index_of("y"), Some(1));
/// assert_eq!(row.index_of("z"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultRow {
    columns: Vec<ResultCell>,
}

impl ResultRow {
    pub fn new(columns: Vec<ResultCell>) -> Self {
        Self { columns }
    }

    /// Reads every column of the statement's current row, copying text and
    /// blob bytes out of the engine buffer.
    pub(crate) fn materialize<O: Ownership>(statement: &Statement<'_, O>) -> Result<Self> {
        let count = statement.column_count();
        let mut columns = Vec::with_capacity(count);
        for column in 0..count {
            columns.push(ResultCell {
                name: statement.column_name(column)?,
                value: statement.cell(column)?.into_owned(),
            });
        }
        Ok(Self { columns })
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ResultCell> {
        self.columns.get(index)
    }

    /// Position of the first column called `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|cell| cell.name == name)
    }

    /// Value of the first column called `name`.
    pub fn get_by_name(&self, name: &str) -> Option<&CellValue<'static>> {
        self.index_of(name).map(|index| &self.columns[index].value)
    }

    /// Like [`get_by_name`](Self::get_by_name), failing with
    /// [`Error::ColumnNotFound`] when no column matches.
    pub fn value(&self, name: &str) -> Result<&CellValue<'static>> {
        self.get_by_name(name)
            .ok_or_else(|| Error::ColumnNotFound(name.to_string()))
    }

    pub fn first(&self) -> Option<&ResultCell> {
        self.columns.first()
    }

    pub fn last(&self) -> Option<&ResultCell> {
        self.columns.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResultCell> {
        self.columns.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|cell| cell.name.as_str())
    }

    pub fn into_columns(self) -> Vec<ResultCell> {
        self.columns
    }
}

impl Index<usize> for ResultRow {
    type Output = ResultCell;

    fn index(&self, index: usize) -> &ResultCell {
        &self.columns[index]
    }
}

/// Panics if no column carries `name`; use
/// [`get_by_name`](ResultRow::get_by_name) to check first.
impl Index<&str> for ResultRow {
    type Output = CellValue<'static>;

    fn index(&self, name: &str) -> &CellValue<'static> {
        match self.get_by_name(name) {
            Some(value) => value,
            None => panic!("no column named '{name}' in result row"),
        }
    }
}

impl<'a> IntoIterator for &'a ResultRow {
    type Item = &'a ResultCell;
    type IntoIter = std::slice::Iter<'a, ResultCell>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}

impl IntoIterator for ResultRow {
    type Item = ResultCell;
    type IntoIter = std::vec::IntoIter<ResultCell>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.into_iter()
    }
}

/// Renders `name=value` pairs separated by `|`.
impl fmt::Display for ResultRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, cell) in self.columns.iter().enumerate() {
            if position > 0 {
                f.write_str("|")?;
            }
            write!(f, "{}={}", cell.name, cell.value)?;
        }
        Ok(())
    }
}
