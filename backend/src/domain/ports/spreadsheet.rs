//! Port for a spreadsheet exposing named single-column ranges.
//!
//! Rows and columns are 1-based. Writes may be buffered by the collaborator;
//! [`Spreadsheet::flush`] is the commit barrier that must run before a
//! written cell is read back.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use super::define_port_error;

define_port_error! {
    /// Errors raised by spreadsheet adapters.
    pub enum SpreadsheetError {
        /// The sheet could not be reached or refused the operation.
        Unavailable { message: String } =>
            ServiceUnavailable: "spreadsheet unavailable: {message}",
        /// A row or column outside the sheet was addressed.
        OutOfRange { row: usize, column: usize } =>
            InvalidRequest: "cell ({row}, {column}) is outside the sheet",
    }
}

/// One data row with its 1-based sheet position.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRow {
    /// 1-based row number.
    pub position: usize,
    /// Cell values; index 0 is column 1.
    pub cells: Vec<Value>,
}

impl SheetRow {
    /// Value in 1-based `column`, or null past the end of the row.
    pub fn cell(&self, column: usize) -> &Value {
        column
            .checked_sub(1)
            .and_then(|index| self.cells.get(index))
            .unwrap_or(&Value::Null)
    }
}

/// Spreadsheet operations the sheet-backed store relies on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Spreadsheet: Send + Sync {
    /// Named single-column ranges, by name, with their 1-based column.
    async fn named_columns(&self) -> Result<BTreeMap<String, usize>, SpreadsheetError>;

    /// Every data row, header excluded.
    async fn rows(&self) -> Result<Vec<SheetRow>, SpreadsheetError>;

    /// Append an empty row and return its position.
    async fn append_blank_row(&self) -> Result<usize, SpreadsheetError>;

    /// Write `(column, value)` pairs into `row`.
    async fn write_cells(&self, row: usize, cells: &[(usize, Value)])
    -> Result<(), SpreadsheetError>;

    /// Read one committed cell.
    async fn read_cell(&self, row: usize, column: usize) -> Result<Value, SpreadsheetError>;

    /// Remove `row`, shifting later rows up.
    async fn delete_row(&self, row: usize) -> Result<(), SpreadsheetError>;

    /// Commit pending writes and any formulas they trigger.
    async fn flush(&self) -> Result<(), SpreadsheetError>;
}
