//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! This module follows the hexagonal architecture pattern, providing concrete
//! implementations of domain port traits for the three record stores and
//! their supporting collaborators:
//!
//! - **sheet**: member registry kept on a spreadsheet's named ranges
//! - **crm**: contacts, items and invoices on the CRM/accounting REST API
//! - **calendar**: events and their occurrences on a calendar service
//! - **http**: reqwest-backed JSON transport shared by the REST adapters
//! - **notify**: log-only notifier
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod calendar;
pub mod crm;
pub mod http;
pub mod notify;
pub mod sheet;
