//! Polymorphic persistence port implemented by every storage backend.
//!
//! Lookup misses are reported as `not_found` [`Response`]s; only
//! infrastructure failures surface as [`StorageError`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pagination::PageRequest;

use crate::domain::mapping::MappingError;
use crate::domain::{Entity, EntityId, Event, Mappable, Response};

use super::define_port_error;
use super::spreadsheet::SpreadsheetError;
use super::transport::TransportError;

define_port_error! {
    /// Errors raised by storage adapters.
    pub enum StorageError {
        /// Backend lacks configuration it needs, such as a named id column.
        NotConfigured { message: String } =>
            ServiceUnavailable: "storage backend not configured: {message}",
        /// Backend could not produce an identifier for a new record.
        IdAssignment { message: String } =>
            InternalError: "storage backend could not assign an id: {message}",
        /// Remote collaborator rejected the request.
        Remote { message: String } =>
            ServiceUnavailable: "storage backend request failed: {message}",
        /// Remote response could not be interpreted.
        Decode { message: String } =>
            ServiceUnavailable: "storage backend returned an unreadable response: {message}",
        /// Entity could not be expressed through the backend's mapping.
        Mapping { message: String } =>
            InternalError: "storage mapping failed: {message}",
        /// Remote collaborator could not be reached.
        Transport { message: String } =>
            ServiceUnavailable: "storage backend unreachable: {message}",
        /// Caller supplied a value the backend cannot use.
        Invalid { message: String } =>
            InvalidRequest: "invalid storage request: {message}",
    }
}

impl From<TransportError> for StorageError {
    fn from(value: TransportError) -> Self {
        match value {
            TransportError::Transport { message } | TransportError::Timeout { message } => {
                Self::transport(message)
            }
            TransportError::Status { status, message } => {
                Self::remote(format!("status {status}: {message}"))
            }
            TransportError::Decode { message } => Self::decode(message),
        }
    }
}

impl From<SpreadsheetError> for StorageError {
    fn from(value: SpreadsheetError) -> Self {
        Self::remote(value.to_string())
    }
}

impl From<MappingError> for StorageError {
    fn from(value: MappingError) -> Self {
        Self::mapping(value.to_string())
    }
}

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Client-side predicate applied by [`StorageManager::get_filtered`].
pub type Predicate<'a, T> = &'a (dyn Fn(&Entity<T>) -> bool + Send + Sync);

/// Listing parameters shared by all backends.
///
/// Filter keys are local field names; backends translate them through their
/// mapping table and pass unmapped keys through unchanged. Backends without
/// server-side filtering ignore them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
    /// Requested page.
    pub page: PageRequest,
    /// Server-side equality filters.
    pub filters: Vec<(String, String)>,
    /// Lower time bound for time-indexed backends.
    pub time_min: Option<DateTime<Utc>>,
    /// Upper time bound for time-indexed backends.
    pub time_max: Option<DateTime<Utc>>,
}

impl ListParams {
    /// First page, no filters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a specific page.
    pub fn with_page(mut self, page: PageRequest) -> Self {
        self.page = page;
        self
    }

    /// Add an equality filter.
    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((key.into(), value.into()));
        self
    }

    /// Restrict a time-indexed listing to `[time_min, time_max)`.
    pub fn with_window(mut self, time_min: DateTime<Utc>, time_max: DateTime<Utc>) -> Self {
        self.time_min = Some(time_min);
        self.time_max = Some(time_max);
        self
    }
}

/// Storage contract for one entity type.
///
/// ## Contract
/// - `add` returns an entity whose id is populated and usable with
///   `get_by_id`, `update` and `delete` on the same backend.
/// - `update` never sends the id in the outgoing payload to a backend that
///   assigns ids; the adapter strips it.
/// - List results always carry a page.
#[async_trait]
pub trait StorageManager<T: Mappable>: Send + Sync {
    /// Store a new entity and return it with its assigned id.
    async fn add(&self, entity: Entity<T>) -> StorageResult<Response<Entity<T>>>;

    /// Fetch one entity; a miss is a `not_found` response.
    async fn get_by_id(&self, id: &EntityId) -> StorageResult<Response<Entity<T>>>;

    /// Replace the stored entity `id` with `entity`.
    async fn update(&self, id: &EntityId, entity: Entity<T>) -> StorageResult<Response<Entity<T>>>;

    /// Remove an entity; `false` when it did not exist.
    async fn delete(&self, id: &EntityId) -> StorageResult<bool>;

    /// List one page of entities.
    async fn get_all(&self, params: &ListParams) -> StorageResult<Response<Vec<Entity<T>>>>;

    /// List one page and keep the entities accepted by `predicate`.
    ///
    /// The predicate always runs client-side; `params` may pre-filter on the
    /// server.
    async fn get_filtered(
        &self,
        predicate: Predicate<'_, T>,
        params: &ListParams,
    ) -> StorageResult<Response<Vec<Entity<T>>>> {
        let response = self.get_all(params).await?;
        Ok(response.map(|entities| {
            entities
                .into_iter()
                .filter(|entity| predicate(entity))
                .collect()
        }))
    }

    /// Entities whose local field `key` equals `value`, ignoring case and
    /// surrounding whitespace.
    ///
    /// Zero, one or many entities may match; the store does not enforce
    /// uniqueness.
    async fn get_by_key_value(
        &self,
        key: &str,
        value: &str,
    ) -> StorageResult<Response<Vec<Entity<T>>>> {
        let wanted = value.trim().to_lowercase();
        let matches = |entity: &Entity<T>| {
            entity.to_fields().text(key).trim().to_lowercase() == wanted
        };
        self.get_filtered(&matches, &ListParams::new()).await
    }
}

/// Calendar extension of the storage contract: attendee changes on one
/// occurrence of a possibly recurring event.
#[async_trait]
pub trait OccurrenceAttendees: StorageManager<Event> {
    /// Resolve the occurrence of `event_id` starting at `start`.
    async fn get_occurrence(
        &self,
        event_id: &EntityId,
        start: DateTime<Utc>,
    ) -> StorageResult<Response<Entity<Event>>>;

    /// Add `email` to the occurrence's attendee list.
    async fn add_attendee(
        &self,
        event_id: &EntityId,
        start: DateTime<Utc>,
        email: &str,
    ) -> StorageResult<Response<Entity<Event>>>;

    /// Remove `email` from the occurrence's attendee list.
    async fn remove_attendee(
        &self,
        event_id: &EntityId,
        start: DateTime<Utc>,
        email: &str,
    ) -> StorageResult<Response<Entity<Event>>>;
}
