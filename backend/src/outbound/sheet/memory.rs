//! In-memory spreadsheet with buffered writes.
//!
//! Writes stay pending until [`Spreadsheet::flush`], which also evaluates an
//! optional id formula the way a hosted sheet fills a formula column after a
//! commit. Row 1 is the header; data rows start at row 2.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::ports::{SheetRow, Spreadsheet, SpreadsheetError};

const FIRST_DATA_ROW: usize = 2;

#[derive(Debug, Clone)]
struct IdFormula {
    column: usize,
    prefix: String,
}

#[derive(Debug, Default)]
struct SheetState {
    rows: Vec<Vec<Value>>,
    pending: Vec<(usize, usize, Value)>,
    flushes: usize,
    ids_issued: usize,
}

/// Spreadsheet held in process memory.
#[derive(Debug)]
pub struct InMemorySpreadsheet {
    columns: BTreeMap<String, usize>,
    id_formula: Option<IdFormula>,
    state: Mutex<SheetState>,
}

impl InMemorySpreadsheet {
    /// Sheet whose named ranges are `names`, bound to columns 1, 2, ...
    pub fn new<I, N>(names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        let columns = names
            .into_iter()
            .enumerate()
            .map(|(index, name)| (name.into(), index + 1))
            .collect();
        Self {
            columns,
            id_formula: None,
            state: Mutex::new(SheetState::default()),
        }
    }

    /// Fill blank cells of the `named` column with `prefix` + a sequence
    /// number on every flush. The sequence starts at the first data row
    /// number and never reuses a value, even after rows are deleted.
    pub fn with_id_formula(mut self, named: &str, prefix: impl Into<String>) -> Self {
        self.id_formula = self.columns.get(named).map(|&column| IdFormula {
            column,
            prefix: prefix.into(),
        });
        self
    }

    /// Number of completed flushes.
    pub fn flush_count(&self) -> usize {
        self.lock().map_or(0, |state| state.flushes)
    }

    fn lock(&self) -> Result<MutexGuard<'_, SheetState>, SpreadsheetError> {
        self.state
            .lock()
            .map_err(|_| SpreadsheetError::unavailable("sheet state lock poisoned"))
    }

    fn index_of(state: &SheetState, row: usize, column: usize) -> Result<usize, SpreadsheetError> {
        let index = row
            .checked_sub(FIRST_DATA_ROW)
            .filter(|&index| index < state.rows.len());
        match index {
            Some(index) if column >= 1 => Ok(index),
            _ => Err(SpreadsheetError::out_of_range(row, column)),
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}

#[async_trait]
impl Spreadsheet for InMemorySpreadsheet {
    async fn named_columns(&self) -> Result<BTreeMap<String, usize>, SpreadsheetError> {
        Ok(self.columns.clone())
    }

    async fn rows(&self) -> Result<Vec<SheetRow>, SpreadsheetError> {
        let state = self.lock()?;
        Ok(state
            .rows
            .iter()
            .enumerate()
            .map(|(index, cells)| SheetRow {
                position: index + FIRST_DATA_ROW,
                cells: cells.clone(),
            })
            .collect())
    }

    async fn append_blank_row(&self) -> Result<usize, SpreadsheetError> {
        let mut state = self.lock()?;
        state.rows.push(Vec::new());
        Ok(state.rows.len() + FIRST_DATA_ROW - 1)
    }

    async fn write_cells(
        &self,
        row: usize,
        cells: &[(usize, Value)],
    ) -> Result<(), SpreadsheetError> {
        let mut state = self.lock()?;
        for (column, value) in cells {
            Self::index_of(&state, row, *column)?;
            state.pending.push((row, *column, value.clone()));
        }
        Ok(())
    }

    async fn read_cell(&self, row: usize, column: usize) -> Result<Value, SpreadsheetError> {
        let state = self.lock()?;
        let index = Self::index_of(&state, row, column)?;
        Ok(state
            .rows
            .get(index)
            .and_then(|cells| cells.get(column - 1))
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn delete_row(&self, row: usize) -> Result<(), SpreadsheetError> {
        let mut state = self.lock()?;
        let index = Self::index_of(&state, row, 1)?;
        state.rows.remove(index);
        state
            .pending
            .retain(|(pending_row, _, _)| *pending_row != row);
        for pending in &mut state.pending {
            if pending.0 > row {
                pending.0 -= 1;
            }
        }
        Ok(())
    }

    async fn flush(&self) -> Result<(), SpreadsheetError> {
        let mut state = self.lock()?;
        let pending = std::mem::take(&mut state.pending);
        for (row, column, value) in pending {
            let index = Self::index_of(&state, row, column)?;
            if let Some(cells) = state.rows.get_mut(index) {
                if cells.len() < column {
                    cells.resize(column, Value::Null);
                }
                if let Some(cell) = cells.get_mut(column - 1) {
                    *cell = value;
                }
            }
        }
        if let Some(formula) = &self.id_formula {
            let SheetState {
                rows, ids_issued, ..
            } = &mut *state;
            for cells in rows.iter_mut() {
                let has_content = cells.iter().any(|cell| !is_blank(cell));
                if cells.len() < formula.column {
                    cells.resize(formula.column, Value::Null);
                }
                if let Some(cell) = cells.get_mut(formula.column - 1) {
                    if has_content && is_blank(cell) {
                        let sequence = *ids_issued + FIRST_DATA_ROW;
                        *ids_issued += 1;
                        *cell = Value::String(format!("{}{sequence}", formula.prefix));
                    }
                }
            }
        }
        state.flushes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn writes_are_invisible_until_flushed() {
        let sheet = InMemorySpreadsheet::new(["id", "email"]);
        let row = sheet.append_blank_row().await.expect("append");
        assert_eq!(row, 2);
        sheet
            .write_cells(row, &[(2, json!("a@b.org"))])
            .await
            .expect("write");
        assert_eq!(sheet.read_cell(row, 2).await.expect("read"), Value::Null);
        sheet.flush().await.expect("flush");
        assert_eq!(sheet.read_cell(row, 2).await.expect("read"), json!("a@b.org"));
    }

    #[tokio::test]
    async fn id_formula_fills_rows_with_content() {
        let sheet = InMemorySpreadsheet::new(["id", "email"]).with_id_formula("id", "M-");
        let first = sheet.append_blank_row().await.expect("append");
        let second = sheet.append_blank_row().await.expect("append");
        sheet
            .write_cells(first, &[(2, json!("a@b.org"))])
            .await
            .expect("write");
        sheet.flush().await.expect("flush");
        assert_eq!(sheet.read_cell(first, 1).await.expect("read"), json!("M-2"));
        assert_eq!(sheet.read_cell(second, 1).await.expect("read"), Value::Null);
    }

    #[tokio::test]
    async fn formula_ids_are_not_reused_after_a_delete() {
        let sheet = InMemorySpreadsheet::new(["id", "email"]).with_id_formula("id", "M-");
        for email in ["a@b.org", "c@d.org"] {
            let row = sheet.append_blank_row().await.expect("append");
            sheet.write_cells(row, &[(2, json!(email))]).await.expect("write");
            sheet.flush().await.expect("flush");
        }
        sheet.delete_row(2).await.expect("delete");

        let row = sheet.append_blank_row().await.expect("append");
        sheet.write_cells(row, &[(2, json!("e@f.org"))]).await.expect("write");
        sheet.flush().await.expect("flush");

        let ids: Vec<_> = sheet
            .rows()
            .await
            .expect("rows")
            .iter()
            .map(|row| row.cell(1).clone())
            .collect();
        assert_eq!(ids, [json!("M-3"), json!("M-4")]);
    }

    #[tokio::test]
    async fn deleting_shifts_later_rows_up() {
        let sheet = InMemorySpreadsheet::new(["id"]);
        for id in ["a", "b", "c"] {
            let row = sheet.append_blank_row().await.expect("append");
            sheet.write_cells(row, &[(1, json!(id))]).await.expect("write");
        }
        sheet.flush().await.expect("flush");
        sheet.delete_row(3).await.expect("delete");
        let rows = sheet.rows().await.expect("rows");
        let ids: Vec<_> = rows.iter().map(|row| row.cell(1).clone()).collect();
        assert_eq!(ids, [json!("a"), json!("c")]);
        assert_eq!(rows.last().map(|row| row.position), Some(3));
    }

    #[tokio::test]
    async fn out_of_range_rows_are_rejected() {
        let sheet = InMemorySpreadsheet::new(["id"]);
        let result = sheet.read_cell(9, 1).await;
        assert_eq!(result, Err(SpreadsheetError::out_of_range(9_usize, 1_usize)));
    }
}
