//! Domain primitives, aggregates and services.
//!
//! Purpose: define the persisted entities, the mapping convention that
//! carries them to and from backend records, and the business services built
//! on the storage port. Nothing here knows which backend is in use.
//!
//! Public surface:
//! - `Entity<T>` / `EntityId` / `Mappable`: generic persisted wrapper.
//! - `Fields` / `Record` / `MappingTable`: local and backend field maps and
//!   the bijection between them.
//! - `Member`, `Event`, `Invoice`: the three managed entity bodies.
//! - `Response<T>` / `Error` / `ErrorCode`: result envelope returned by every
//!   service operation.
//! - `MembershipManager`, `EventManager`, `InvoiceManager`: business services.

pub mod config;
pub mod entity;
pub mod error;
pub mod event;
pub mod event_service;
pub mod invoice;
pub mod invoice_service;
pub mod login;
pub mod mapping;
pub mod member;
pub mod membership_service;
pub mod ports;
pub mod registration;
pub mod response;

pub use self::config::{
    ConfigError, DEFAULT_CALENDAR_WINDOW_DAYS, DEFAULT_LEVEL, DEFAULT_LEVEL_THRESHOLDS,
    DEFAULT_SESSION_EXTENSION_MINUTES, DEFAULT_TOKEN_LIFETIME_MINUTES, LevelThreshold,
    MembershipConfig, parse_level_thresholds,
};
pub use self::entity::{CREATED_AT_FIELD, Entity, EntityId, ID_FIELD, Mappable, UPDATED_AT_FIELD};
pub use self::error::{Error, ErrorCode};
pub use self::event::{Event, EventItem};
pub use self::event_service::EventManager;
pub use self::invoice::{Invoice, InvoiceStatus, LineItem};
pub use self::invoice_service::InvoiceManager;
pub use self::login::{
    Authentication, Login, LoginStatus, LoginToken, LoginTokenError, RandomTokenSource,
    TokenSource,
};
pub use self::mapping::{Fields, MappingError, MappingTable, Record, date_value, timestamp_value};
pub use self::member::{EMAIL_FIELD, EmailAddress, Member, MemberProfile, MemberValidationError};
pub use self::membership_service::MembershipManager;
pub use self::registration::{Registration, RegistrationStatus};
pub use self::response::Response;
