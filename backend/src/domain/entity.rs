//! Generic persisted entity and the per-type mapping capability.
//!
//! One [`Entity<T>`] type carries identity and timestamps for every domain
//! body. The body type implements [`Mappable`] to describe itself as
//! [`Fields`]; backends pair those fields with their own
//! [`MappingTable`](crate::domain::MappingTable).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::mapping::{Fields, timestamp_value};

/// Local field name carrying the entity id.
pub const ID_FIELD: &str = "id";
/// Local field name carrying the creation timestamp.
pub const CREATED_AT_FIELD: &str = "createdAt";
/// Local field name carrying the last-modified timestamp.
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// Capability implemented by every persisted domain body.
///
/// Implementations list their own fields; date-valued fields are emitted as
/// RFC 3339 text and must be re-hydrated explicitly in
/// [`Mappable::from_fields`].
pub trait Mappable: Clone + Send + Sync + 'static {
    /// Short entity name used in logs and messages.
    const KIND: &'static str;

    /// Describe the body as local fields.
    fn to_fields(&self) -> Fields;

    /// Rebuild the body from local fields, defaulting anything missing.
    fn from_fields(fields: &Fields) -> Self;
}

/// Opaque entity identifier assigned by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Wrap a backend-assigned identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identifier for backends that do not assign one.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Raw id text.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A domain body with identity and timestamps.
///
/// ## Invariants
/// - `id` is `None` only before a backend has stored the entity.
/// - `updated_at` is never earlier than `created_at` when set through
///   [`Entity::touch`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity<T> {
    id: Option<EntityId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(flatten)]
    body: T,
}

impl<T> Entity<T> {
    /// Wrap a new, not yet stored body.
    pub fn new(body: T, now: DateTime<Utc>) -> Self {
        Self {
            id: None,
            created_at: now,
            updated_at: now,
            body,
        }
    }

    /// Attach an identifier.
    pub fn with_id(mut self, id: EntityId) -> Self {
        self.id = Some(id);
        self
    }

    /// Attach a backend-assigned id.
    pub fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    /// Remove and return the identifier.
    pub fn take_id(&mut self) -> Option<EntityId> {
        self.id.take()
    }

    /// Backend id; `None` before the first save.
    pub fn id(&self) -> Option<&EntityId> {
        self.id.as_ref()
    }

    /// Creation instant.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last modification instant.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Payload.
    pub fn body(&self) -> &T {
        &self.body
    }

    /// Mutable payload; callers [`touch`](Self::touch) afterwards.
    pub fn body_mut(&mut self) -> &mut T {
        &mut self.body
    }

    /// Discard identity and keep the payload.
    pub fn into_body(self) -> T {
        self.body
    }

    /// Refresh `updated_at` after a mutation.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now.max(self.created_at);
    }

    /// Swap in a new body, keeping identity and creation time.
    pub fn replace_body(&mut self, body: T, now: DateTime<Utc>) {
        self.body = body;
        self.touch(now);
    }

    /// Transform the body, keeping identity and timestamps.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Entity<U> {
        Entity {
            id: self.id,
            created_at: self.created_at,
            updated_at: self.updated_at,
            body: f(self.body),
        }
    }
}

impl<T: Mappable> Entity<T> {
    /// Describe the entity, identity included, as local fields.
    pub fn to_fields(&self) -> Fields {
        let mut fields = self.body.to_fields();
        fields.insert_opt(ID_FIELD, self.id.as_ref().map(|id| id.as_str().to_owned()));
        fields.insert(CREATED_AT_FIELD, timestamp_value(&self.created_at));
        fields.insert(UPDATED_AT_FIELD, timestamp_value(&self.updated_at));
        fields
    }

    /// Rebuild an entity from local fields.
    ///
    /// Missing timestamps fall back to `fallback` (usually the current
    /// time); a blank id leaves the entity unidentified.
    pub fn from_fields(fields: &Fields, fallback: DateTime<Utc>) -> Self {
        let created_at = fields.timestamp(CREATED_AT_FIELD).unwrap_or(fallback);
        let updated_at = fields.timestamp(UPDATED_AT_FIELD).unwrap_or(created_at);
        Self {
            id: fields.opt_text(ID_FIELD).map(|id| EntityId::new(id.trim())),
            created_at,
            updated_at,
            body: T::from_fields(fields),
        }
    }
}
