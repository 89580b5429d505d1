//! Normalised pagination primitives for the membership storage backends.
//!
//! Three storage backends page their results in incompatible ways: the
//! spreadsheet registry returns everything at once, the CRM API pages by
//! number, and the calendar API hands out opaque continuation tokens. This
//! crate hides those differences behind one [`Page`] descriptor exposing the
//! same observable contract for every backend:
//!
//! - `currentPageMarker`
//! - `nextPageMarker`
//! - `previousPageMarker`
//! - `hasMore`
//! - `pageSize`
//!
//! The backend-specific state behind a page stays private, so callers cannot
//! branch on how a page was produced.

mod marker;
mod page;
mod request;

pub use marker::{PageMarker, PageMarkerError};
pub use page::Page;
pub use request::PageRequest;
