//! `StorageManager<Event>` over a calendar service.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use mockable::Clock;
use pagination::Page;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::domain::ports::{
    JsonRequest, JsonTransport, ListParams, OccurrenceAttendees, StorageError, StorageManager,
    StorageResult, TransportError,
};
use crate::domain::{Entity, EntityId, Event, MappingTable, Response};

use super::directory::ResourceDirectory;
use super::dto::{AttendeeDto, EventDto};

/// Occurrences requested per page when the caller does not choose.
pub const DEFAULT_MAX_RESULTS: u32 = 250;

/// Half-width of the window used to find an occurrence by its start.
const OCCURRENCE_SLACK_MINUTES: i64 = 1;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListDto {
    #[serde(default)]
    items: Vec<EventDto>,
    next_page_token: Option<String>,
}

fn rfc3339(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn is_gone(error: &TransportError) -> bool {
    error.is_not_found() || matches!(error, TransportError::Status { status: 410, .. })
}

/// Calendar-backed event store.
///
/// The resource directory is fetched on first use and kept for the store's
/// lifetime.
pub struct CalendarStore {
    calendar: Arc<dyn JsonTransport>,
    directory_source: Arc<dyn JsonTransport>,
    directory: OnceCell<ResourceDirectory>,
    calendar_id: String,
    table: MappingTable,
    window: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl CalendarStore {
    /// Store for `calendar_id`, listing `window` ahead of now by default.
    pub fn new(
        calendar: Arc<dyn JsonTransport>,
        directory_source: Arc<dyn JsonTransport>,
        calendar_id: impl Into<String>,
        table: MappingTable,
        window: TimeDelta,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            calendar,
            directory_source,
            directory: OnceCell::new(),
            calendar_id: calendar_id.into(),
            table,
            window,
            clock,
        }
    }

    fn events_path(&self) -> String {
        format!("calendars/{}/events", self.calendar_id)
    }

    fn event_path(&self, id: &str) -> String {
        format!("calendars/{}/events/{id}", self.calendar_id)
    }

    async fn directory(&self) -> StorageResult<&ResourceDirectory> {
        self.directory
            .get_or_try_init(|| ResourceDirectory::load(self.directory_source.as_ref()))
            .await
    }

    /// `None` when the service reports the event missing or deleted.
    async fn call(&self, request: JsonRequest) -> StorageResult<Option<Value>> {
        match self.calendar.send(request).await {
            Ok(body) => Ok(Some(body)),
            Err(error) if is_gone(&error) => Ok(None),
            Err(error) => {
                warn!(error = %error, "calendar request failed");
                Err(error.into())
            }
        }
    }

    fn decode<D: for<'de> Deserialize<'de>>(body: Value) -> StorageResult<D> {
        serde_json::from_value(body)
            .map_err(|error| StorageError::decode(format!("calendar event: {error}")))
    }

    fn entity_from(&self, dto: EventDto, directory: &ResourceDirectory) -> Entity<Event> {
        let fields = self.table.from_record(&dto.into_record(directory));
        Entity::from_fields(&fields, self.clock.utc())
    }

    async fn entity_from_body(&self, body: Value) -> StorageResult<Entity<Event>> {
        let dto: EventDto = Self::decode(body)?;
        let directory = self.directory().await?;
        Ok(self.entity_from(dto, directory))
    }

    fn payload(&self, entity: &Entity<Event>) -> StorageResult<Value> {
        let record = self.table.to_record(&entity.to_fields());
        serde_json::to_value(EventDto::from_record(&record))
            .map_err(|error| StorageError::mapping(error.to_string()))
    }

    fn not_found<R>(id: &EntityId) -> Response<R> {
        Response::not_found(format!("event {id} not found"))
    }

    /// Raw occurrence of `event_id` starting at `start`.
    ///
    /// A non-recurring event is its own single occurrence.
    async fn occurrence_dto(
        &self,
        event_id: &EntityId,
        start: DateTime<Utc>,
    ) -> StorageResult<Option<EventDto>> {
        let slack = TimeDelta::minutes(OCCURRENCE_SLACK_MINUTES);
        let request = JsonRequest::get(format!("{}/instances", self.event_path(event_id.as_str())))
            .with_query("timeMin", rfc3339(start - slack))
            .with_query("timeMax", rfc3339(start + slack));
        let Some(body) = self.call(request).await? else {
            return Ok(None);
        };
        let listed: EventListDto = Self::decode(body)?;
        if let Some(found) = listed
            .items
            .into_iter()
            .find(|dto| !dto.is_cancelled() && dto.start_instant() == Some(start))
        {
            return Ok(Some(found));
        }
        let Some(body) = self.call(JsonRequest::get(self.event_path(event_id.as_str()))).await?
        else {
            return Ok(None);
        };
        let base: EventDto = Self::decode(body)?;
        let single = base.recurrence.is_empty() && base.start_instant() == Some(start);
        Ok(single.then_some(base))
    }

    /// Replace the attendee list of one occurrence, keeping resource
    /// attendees.
    async fn patch_attendees(
        &self,
        occurrence: &EventDto,
        attendees: Vec<AttendeeDto>,
    ) -> StorageResult<Response<Entity<Event>>> {
        let Some(id) = occurrence.id.as_deref() else {
            return Err(StorageError::decode("occurrence has no id"));
        };
        let count = attendees.len();
        let request = JsonRequest::patch(self.event_path(id), json!({ "attendees": attendees }));
        let Some(updated) = self.call(request).await? else {
            return Ok(Self::not_found(&EntityId::new(id)));
        };
        debug!(id, attendees = count, "occurrence attendees patched");
        Ok(Response::ok(self.entity_from_body(updated).await?))
    }

    async fn resolved(
        &self,
        event_id: &EntityId,
        start: DateTime<Utc>,
    ) -> StorageResult<Result<EventDto, Response<Entity<Event>>>> {
        Ok(self
            .occurrence_dto(event_id, start)
            .await?
            .ok_or_else(|| {
                Response::not_found(format!(
                    "event {event_id} has no occurrence starting at {}",
                    rfc3339(start)
                ))
            }))
    }
}

fn same_address(attendee: &AttendeeDto, email: &str) -> bool {
    attendee.email.trim().eq_ignore_ascii_case(email.trim())
}

#[async_trait]
impl StorageManager<Event> for CalendarStore {
    async fn add(&self, entity: Entity<Event>) -> StorageResult<Response<Entity<Event>>> {
        let request = JsonRequest::post(self.events_path(), self.payload(&entity)?);
        let Some(body) = self.call(request).await? else {
            return Err(StorageError::remote(format!(
                "calendar {} not found",
                self.calendar_id
            )));
        };
        let created = self.entity_from_body(body).await?;
        if created.id().is_none() {
            return Err(StorageError::id_assignment("created event has no id"));
        }
        debug!(id = ?created.id().map(EntityId::as_str), "event created");
        Ok(Response::ok(created))
    }

    async fn get_by_id(&self, id: &EntityId) -> StorageResult<Response<Entity<Event>>> {
        match self.call(JsonRequest::get(self.event_path(id.as_str()))).await? {
            Some(body) => {
                let entity = self.entity_from_body(body).await?;
                Ok(Response::ok(entity.with_id(id.clone())))
            }
            None => Ok(Self::not_found(id)),
        }
    }

    async fn update(
        &self,
        id: &EntityId,
        entity: Entity<Event>,
    ) -> StorageResult<Response<Entity<Event>>> {
        let request = JsonRequest::put(self.event_path(id.as_str()), self.payload(&entity)?);
        match self.call(request).await? {
            Some(body) => {
                let updated = self.entity_from_body(body).await?;
                debug!(id = %id, "event updated");
                Ok(Response::ok(updated.with_id(id.clone())))
            }
            None => Ok(Self::not_found(id)),
        }
    }

    async fn delete(&self, id: &EntityId) -> StorageResult<bool> {
        let deleted = self
            .call(JsonRequest::delete(self.event_path(id.as_str())))
            .await?
            .is_some();
        debug!(id = %id, deleted, "event delete");
        Ok(deleted)
    }

    /// Occurrences in `[time_min, time_max)`, defaulting to the configured
    /// window from now. Series are expanded into single occurrences.
    async fn get_all(&self, params: &ListParams) -> StorageResult<Response<Vec<Entity<Event>>>> {
        let time_min = params.time_min.unwrap_or_else(|| self.clock.utc());
        let time_max = params.time_max.unwrap_or(time_min + self.window);
        let mut request = JsonRequest::get(self.events_path())
            .with_query("timeMin", rfc3339(time_min))
            .with_query("timeMax", rfc3339(time_max))
            .with_query("singleEvents", "true")
            .with_query("orderBy", "startTime")
            .with_query("maxResults", params.page.size_or(DEFAULT_MAX_RESULTS).to_string());
        if let Some(token) = params.page.continuation_token() {
            request = request.with_query("pageToken", token);
        }
        for (key, value) in &params.filters {
            request = match self.table.backend_key(key) {
                Some(backend) => request
                    .with_query("privateExtendedProperty", format!("{backend}={value}")),
                None => request.with_query(key.as_str(), value.as_str()),
            };
        }
        let Some(body) = self.call(request).await? else {
            return Err(StorageError::remote(format!(
                "calendar {} not found",
                self.calendar_id
            )));
        };
        let listed: EventListDto = Self::decode(body)?;
        let directory = self.directory().await?;
        let entities: Vec<Entity<Event>> = listed
            .items
            .into_iter()
            .filter(|dto| !dto.is_cancelled())
            .map(|dto| self.entity_from(dto, directory))
            .collect();
        let size = u32::try_from(entities.len()).unwrap_or(u32::MAX);
        let page = Page::continuation(params.page.current_marker(), size, listed.next_page_token);
        debug!(events = entities.len(), has_more = page.has_more(), "calendar listing");
        Ok(Response::ok_page(entities, page))
    }
}

#[async_trait]
impl OccurrenceAttendees for CalendarStore {
    async fn get_occurrence(
        &self,
        event_id: &EntityId,
        start: DateTime<Utc>,
    ) -> StorageResult<Response<Entity<Event>>> {
        match self.resolved(event_id, start).await? {
            Ok(dto) => {
                let directory = self.directory().await?;
                Ok(Response::ok(self.entity_from(dto, directory)))
            }
            Err(missing) => Ok(missing),
        }
    }

    async fn add_attendee(
        &self,
        event_id: &EntityId,
        start: DateTime<Utc>,
        email: &str,
    ) -> StorageResult<Response<Entity<Event>>> {
        let occurrence = match self.resolved(event_id, start).await? {
            Ok(dto) => dto,
            Err(missing) => return Ok(missing),
        };
        if occurrence.attendees.iter().any(|a| same_address(a, email)) {
            let directory = self.directory().await?;
            return Ok(Response::ok(self.entity_from(occurrence, directory)));
        }
        let mut attendees = occurrence.attendees.clone();
        attendees.push(AttendeeDto {
            email: email.trim().to_owned(),
            ..AttendeeDto::default()
        });
        self.patch_attendees(&occurrence, attendees).await
    }

    async fn remove_attendee(
        &self,
        event_id: &EntityId,
        start: DateTime<Utc>,
        email: &str,
    ) -> StorageResult<Response<Entity<Event>>> {
        let occurrence = match self.resolved(event_id, start).await? {
            Ok(dto) => dto,
            Err(missing) => return Ok(missing),
        };
        if !occurrence.attendees.iter().any(|a| same_address(a, email)) {
            let directory = self.directory().await?;
            return Ok(Response::ok(self.entity_from(occurrence, directory)));
        }
        let attendees: Vec<AttendeeDto> = occurrence
            .attendees
            .iter()
            .filter(|attendee| attendee.resource || !same_address(attendee, email))
            .cloned()
            .collect();
        self.patch_attendees(&occurrence, attendees).await
    }
}
