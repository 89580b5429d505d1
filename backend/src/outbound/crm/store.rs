//! `StorageManager` over the CRM's REST resources.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use pagination::Page;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::domain::ports::{
    JsonRequest, JsonTransport, ListParams, StorageError, StorageManager, StorageResult,
};
use crate::domain::{
    CREATED_AT_FIELD, Entity, EntityId, ID_FIELD, Mappable, MappingTable, Record, Response,
    UPDATED_AT_FIELD,
};

use super::custom_fields;
use super::money::{self, Direction};
use super::resource::CrmResource;

/// Page size requested when the caller does not choose one.
pub const DEFAULT_PAGE_SIZE: u32 = 200;

/// CRM-backed store for one entity type.
///
/// The CRM assigns ids and timestamps; outgoing payloads never carry them.
pub struct CrmStore<T> {
    transport: Arc<dyn JsonTransport>,
    resource: CrmResource,
    table: MappingTable,
    server_keys: Vec<String>,
    clock: Arc<dyn Clock>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Mappable> CrmStore<T> {
    /// Bind `table` to `resource` on `transport`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Mapping`] when the table has no id binding.
    pub fn new(
        transport: Arc<dyn JsonTransport>,
        resource: CrmResource,
        table: MappingTable,
        clock: Arc<dyn Clock>,
    ) -> StorageResult<Self> {
        let id_key = table.require(ID_FIELD)?.to_owned();
        let mut server_keys = vec![id_key];
        server_keys.extend(
            [CREATED_AT_FIELD, UPDATED_AT_FIELD]
                .iter()
                .filter_map(|local| table.backend_key(local))
                .map(ToOwned::to_owned),
        );
        Ok(Self {
            transport,
            resource,
            table,
            server_keys,
            clock,
            _entity: PhantomData,
        })
    }

    /// Send `request`; `None` when the CRM reports the resource missing.
    async fn call(&self, request: JsonRequest) -> StorageResult<Option<Map<String, Value>>> {
        match self.transport.send(request).await {
            Ok(body) => open_envelope(body).map(Some),
            Err(error) if error.is_not_found() => Ok(None),
            Err(error) => {
                warn!(entity = T::KIND, error = %error, "CRM request failed");
                Err(error.into())
            }
        }
    }

    fn entity_from(&self, value: Value) -> StorageResult<Entity<T>> {
        let Value::Object(mut object) = value else {
            return Err(StorageError::decode(format!(
                "{} is not an object",
                self.resource.singular()
            )));
        };
        custom_fields::fold(&mut object);
        let mut value = Value::Object(object);
        money::convert(&mut value, self.resource.money_fields(), Direction::Incoming);
        let record = match value {
            Value::Object(object) => Record::from(object),
            _ => Record::new(),
        };
        let fields = self.table.from_record(&record);
        Ok(Entity::from_fields(&fields, self.clock.utc()))
    }

    fn single_from(&self, mut body: Map<String, Value>) -> StorageResult<Entity<T>> {
        let value = body.remove(self.resource.singular()).ok_or_else(|| {
            StorageError::decode(format!("response has no `{}`", self.resource.singular()))
        })?;
        self.entity_from(value)
    }

    /// Outgoing body: mapped fields without server-managed keys, with
    /// amounts in currency units and extension fields nested.
    fn payload(&self, entity: &Entity<T>, creating: bool) -> Value {
        let mut object = self.table.to_record(&entity.to_fields()).into_object();
        for key in &self.server_keys {
            object.remove(key);
        }
        if creating {
            for (key, value) in self.resource.create_defaults() {
                let missing = object.get(key).is_none_or(Value::is_null);
                if missing {
                    object.insert(key.clone(), value.clone());
                }
            }
        }
        let mut value = Value::Object(object);
        money::convert(&mut value, self.resource.money_fields(), Direction::Outgoing);
        if let Value::Object(object) = &mut value {
            custom_fields::unfold(object);
        }
        value
    }

    /// Caller filters under backend names; unmapped keys pass through.
    fn backend_filters(&self, params: &ListParams) -> Vec<(String, String)> {
        let translated: Vec<(String, String)> = params
            .filters
            .iter()
            .map(|(key, value)| {
                let key = self.table.backend_key(key).unwrap_or(key.as_str());
                (key.to_owned(), value.clone())
            })
            .collect();
        self.resource.merged_filter(&translated)
    }

    fn not_found<R>(id: &EntityId) -> Response<R> {
        Response::not_found(format!("{} {id} not found", T::KIND))
    }
}

/// Reject bodies whose `code` reports an application error.
fn open_envelope(body: Value) -> StorageResult<Map<String, Value>> {
    let object = match body {
        Value::Object(object) => object,
        Value::Null => Map::new(),
        other => {
            return Err(StorageError::decode(format!(
                "expected a JSON object, got {other}"
            )));
        }
    };
    let code = object.get("code").and_then(Value::as_i64).unwrap_or(0);
    if code != 0 {
        let message = object
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("no message");
        return Err(StorageError::remote(format!("code {code}: {message}")));
    }
    Ok(object)
}

fn page_from(body: &Map<String, Value>, requested: u32, per_page: u32) -> Page {
    let context = body.get("page_context");
    let number = |key: &str| {
        context
            .and_then(|context| context.get(key))
            .and_then(Value::as_u64)
            .and_then(|value| u32::try_from(value).ok())
    };
    let has_more = context
        .and_then(|context| context.get("has_more_page"))
        .and_then(Value::as_bool)
        .unwrap_or(false);
    Page::numbered(
        number("page").unwrap_or(requested),
        number("per_page").unwrap_or(per_page),
        has_more,
    )
}

#[async_trait]
impl<T: Mappable> StorageManager<T> for CrmStore<T> {
    async fn add(&self, entity: Entity<T>) -> StorageResult<Response<Entity<T>>> {
        let request = JsonRequest::post(self.resource.plural(), self.payload(&entity, true));
        let Some(body) = self.call(request).await? else {
            return Err(StorageError::remote(format!(
                "{} collection not found",
                self.resource.plural()
            )));
        };
        let created = self.single_from(body)?;
        let Some(id) = created.id().cloned() else {
            return Err(StorageError::id_assignment(format!(
                "created {} has no id",
                self.resource.singular()
            )));
        };
        debug!(entity = T::KIND, id = %id, "created");
        Ok(Response::ok(created))
    }

    async fn get_by_id(&self, id: &EntityId) -> StorageResult<Response<Entity<T>>> {
        let request = JsonRequest::get(self.resource.item_path(id.as_str()));
        match self.call(request).await? {
            Some(body) => Ok(Response::ok(self.single_from(body)?.with_id(id.clone()))),
            None => Ok(Self::not_found(id)),
        }
    }

    async fn update(&self, id: &EntityId, entity: Entity<T>) -> StorageResult<Response<Entity<T>>> {
        let request = JsonRequest::put(
            self.resource.item_path(id.as_str()),
            self.payload(&entity, false),
        );
        let Some(mut body) = self.call(request).await? else {
            return Ok(Self::not_found(id));
        };
        let updated = match body.remove(self.resource.singular()) {
            Some(value) => self.entity_from(value)?,
            None => entity,
        };
        debug!(entity = T::KIND, id = %id, "updated");
        Ok(Response::ok(updated.with_id(id.clone())))
    }

    async fn delete(&self, id: &EntityId) -> StorageResult<bool> {
        let request = JsonRequest::delete(self.resource.item_path(id.as_str()));
        let deleted = self.call(request).await?.is_some();
        debug!(entity = T::KIND, id = %id, deleted, "delete");
        Ok(deleted)
    }

    async fn get_all(&self, params: &ListParams) -> StorageResult<Response<Vec<Entity<T>>>> {
        let page = params
            .page
            .page_number()
            .map_err(|error| StorageError::invalid(error.to_string()))?;
        let per_page = params.page.size_or(DEFAULT_PAGE_SIZE);
        let request = JsonRequest::get(self.resource.plural())
            .with_query("page", page.to_string())
            .with_query("per_page", per_page.to_string())
            .with_queries(self.backend_filters(params));
        let Some(mut body) = self.call(request).await? else {
            return Err(StorageError::remote(format!(
                "{} collection not found",
                self.resource.plural()
            )));
        };
        let listed = match body.remove(self.resource.plural()) {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                return Err(StorageError::decode(format!(
                    "`{}` is not a list: {other}",
                    self.resource.plural()
                )));
            }
        };
        let entities = listed
            .into_iter()
            .map(|item| self.entity_from(item))
            .collect::<StorageResult<Vec<_>>>()?;
        Ok(Response::ok_page(entities, page_from(&body, page, per_page)))
    }

    /// Server-side filter on the mapped field, verified client-side; the CRM
    /// may match loosely.
    async fn get_by_key_value(
        &self,
        key: &str,
        value: &str,
    ) -> StorageResult<Response<Vec<Entity<T>>>> {
        if self.table.backend_key(key).is_none() {
            warn!(entity = T::KIND, key, "lookup on an unmapped field matches nothing");
            return Ok(Response::ok_page(Vec::new(), Page::single(0)));
        }
        let wanted = value.trim().to_lowercase();
        let matches = |entity: &Entity<T>| {
            entity.to_fields().text(key).trim().to_lowercase() == wanted
        };
        let params = ListParams::new().with_filter(key, value.trim());
        self.get_filtered(&matches, &params).await
    }
}
