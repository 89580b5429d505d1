//! `StorageManager` over a spreadsheet addressed through named columns.
//!
//! Lookups by id scan every row. That linear scan is the cost centre of the
//! sheet backend and is acceptable only while the registry stays small; each
//! scan is logged with its row count so growth is visible.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use pagination::Page;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::ports::{
    ListParams, SheetRow, Spreadsheet, StorageError, StorageManager, StorageResult,
};
use crate::domain::{Entity, EntityId, ID_FIELD, Mappable, MappingTable, Record, Response};

/// Sheet-backed store for one entity type.
///
/// The column map is read once in [`SheetStore::connect`] and kept for the
/// store's lifetime; named ranges added later are not seen until a new store
/// is connected.
pub struct SheetStore<T> {
    sheet: Arc<dyn Spreadsheet>,
    table: MappingTable,
    columns: BTreeMap<String, usize>,
    id_key: String,
    id_column: usize,
    clock: Arc<dyn Clock>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Mappable> SheetStore<T> {
    /// Read the sheet's named columns and bind them to `table`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Mapping`] when the table has no id binding and
    /// [`StorageError::NotConfigured`] when the sheet lacks the id column.
    pub async fn connect(
        sheet: Arc<dyn Spreadsheet>,
        table: MappingTable,
        clock: Arc<dyn Clock>,
    ) -> StorageResult<Self> {
        let id_key = table.require(ID_FIELD)?.to_owned();
        let named = sheet.named_columns().await?;
        let id_column = *named.get(&id_key).ok_or_else(|| {
            StorageError::not_configured(format!("sheet has no `{id_key}` named range"))
        })?;
        let columns: BTreeMap<String, usize> = table
            .backend_keys()
            .filter_map(|key| named.get(key).map(|&column| (key.to_owned(), column)))
            .collect();
        for key in table.backend_keys().filter(|key| !columns.contains_key(*key)) {
            debug!(entity = T::KIND, key, "mapped field has no named range; it will not be stored");
        }
        Ok(Self {
            sheet,
            table,
            columns,
            id_key,
            id_column,
            clock,
            _entity: PhantomData,
        })
    }

    async fn scan(&self) -> StorageResult<Vec<SheetRow>> {
        let rows = self.sheet.rows().await?;
        debug!(entity = T::KIND, rows = rows.len(), "full sheet scan");
        Ok(rows)
    }

    async fn find_row(&self, id: &EntityId) -> StorageResult<Option<SheetRow>> {
        Ok(self
            .scan()
            .await?
            .into_iter()
            .find(|row| cell_text(row.cell(self.id_column)) == id.as_str()))
    }

    fn record_from_row(&self, row: &SheetRow) -> Record {
        self.columns
            .iter()
            .filter_map(|(key, &column)| {
                let value = row.cell(column);
                (!is_blank(value)).then(|| (key.clone(), value.clone()))
            })
            .collect()
    }

    fn entity_from_row(&self, row: &SheetRow) -> Entity<T> {
        let fields = self.table.from_record(&self.record_from_row(row));
        Entity::from_fields(&fields, self.clock.utc())
    }

    /// Cells for every mapped column except the id; absent values clear the
    /// cell.
    fn cells_for(&self, entity: &Entity<T>) -> Vec<(usize, Value)> {
        let record = self.table.to_record(&entity.to_fields());
        self.columns
            .iter()
            .filter(|(key, _)| **key != self.id_key)
            .map(|(key, &column)| (column, to_cell(record.get(key))))
            .collect()
    }

    fn not_found<R>(id: &EntityId) -> Response<R> {
        Response::not_found(format!("{} {id} not found", T::KIND))
    }

    async fn assign_id(&self, row: usize) -> StorageResult<EntityId> {
        let assigned = cell_text(&self.sheet.read_cell(row, self.id_column).await?);
        if !assigned.trim().is_empty() {
            return Ok(EntityId::new(assigned.trim()));
        }
        let generated = EntityId::generate();
        self.sheet
            .write_cells(row, &[(self.id_column, Value::from(generated.as_str()))])
            .await?;
        self.sheet.flush().await?;
        let confirmed = cell_text(&self.sheet.read_cell(row, self.id_column).await?);
        if confirmed.trim().is_empty() {
            return Err(StorageError::id_assignment(format!(
                "row {row} id cell is still blank after writing a generated id"
            )));
        }
        Ok(EntityId::new(confirmed.trim()))
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Encode a record value for a single cell. Lists and objects are stored as
/// JSON text so items containing commas survive a read back.
fn to_cell(value: Option<&Value>) -> Value {
    match value {
        None | Some(Value::Null) => Value::String(String::new()),
        Some(structured @ (Value::Array(_) | Value::Object(_))) => {
            Value::String(structured.to_string())
        }
        Some(scalar) => scalar.clone(),
    }
}

fn page_for(count: usize) -> Page {
    Page::single(u32::try_from(count).unwrap_or(u32::MAX))
}

#[async_trait]
impl<T: Mappable> StorageManager<T> for SheetStore<T> {
    async fn add(&self, entity: Entity<T>) -> StorageResult<Response<Entity<T>>> {
        let row = self.sheet.append_blank_row().await?;
        self.sheet.write_cells(row, &self.cells_for(&entity)).await?;
        // Commit before reading back: the id may come from a formula.
        self.sheet.flush().await?;
        match self.assign_id(row).await {
            Ok(id) => {
                debug!(entity = T::KIND, id = %id, row, "row appended");
                Ok(Response::ok(entity.with_id(id)))
            }
            Err(error) => {
                warn!(entity = T::KIND, row, error = %error, "id assignment failed; removing row");
                if let Err(cleanup) = self.sheet.delete_row(row).await {
                    warn!(entity = T::KIND, row, error = %cleanup, "orphan row left behind");
                }
                Err(error)
            }
        }
    }

    async fn get_by_id(&self, id: &EntityId) -> StorageResult<Response<Entity<T>>> {
        Ok(match self.find_row(id).await? {
            Some(row) => Response::ok(self.entity_from_row(&row)),
            None => Self::not_found(id),
        })
    }

    async fn update(&self, id: &EntityId, entity: Entity<T>) -> StorageResult<Response<Entity<T>>> {
        let Some(row) = self.find_row(id).await? else {
            return Ok(Self::not_found(id));
        };
        self.sheet
            .write_cells(row.position, &self.cells_for(&entity))
            .await?;
        self.sheet.flush().await?;
        debug!(entity = T::KIND, id = %id, row = row.position, "row updated");
        Ok(Response::ok(entity.with_id(id.clone())))
    }

    async fn delete(&self, id: &EntityId) -> StorageResult<bool> {
        let Some(row) = self.find_row(id).await? else {
            return Ok(false);
        };
        self.sheet.delete_row(row.position).await?;
        self.sheet.flush().await?;
        debug!(entity = T::KIND, id = %id, row = row.position, "row deleted");
        Ok(true)
    }

    /// Every row; the sheet has no native paging or filtering, so `params`
    /// is ignored and the single page holds the whole result.
    async fn get_all(&self, _params: &ListParams) -> StorageResult<Response<Vec<Entity<T>>>> {
        let entities: Vec<Entity<T>> = self
            .scan()
            .await?
            .iter()
            .filter(|row| !row.cells.iter().all(is_blank))
            .map(|row| self.entity_from_row(row))
            .collect();
        let page = page_for(entities.len());
        Ok(Response::ok_page(entities, page))
    }

    async fn get_by_key_value(
        &self,
        key: &str,
        value: &str,
    ) -> StorageResult<Response<Vec<Entity<T>>>> {
        let Some(column) = self
            .table
            .backend_key(key)
            .and_then(|backend| self.columns.get(backend).copied())
        else {
            return Ok(Response::ok_page(Vec::new(), page_for(0)));
        };
        let wanted = value.trim().to_lowercase();
        let entities: Vec<Entity<T>> = self
            .scan()
            .await?
            .iter()
            .filter(|row| cell_text(row.cell(column)).trim().to_lowercase() == wanted)
            .map(|row| self.entity_from_row(row))
            .collect();
        let page = page_for(entities.len());
        Ok(Response::ok_page(entities, page))
    }
}
