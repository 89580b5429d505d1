//! Membership persistence and business services.
//!
//! One storage contract fronts a spreadsheet registry, an accounting REST
//! service and a calendar service. Members, events and invoices are mapped
//! to each backend through declarative field tables, and the business
//! services in [`domain`] only ever see the contract.

pub mod domain;
pub mod outbound;
pub mod settings;
pub mod telemetry;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
