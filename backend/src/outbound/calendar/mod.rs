//! Calendar-service-backed event storage.
//!
//! Events are time-bounded occurrences rather than rows: listings cover a
//! window starting now, recurring series are addressed separately from
//! their occurrences, and room names come from the resource directory.

mod directory;
mod dto;
mod mappings;
mod store;

pub use mappings::event_table;
pub use store::{CalendarStore, DEFAULT_MAX_RESULTS};
