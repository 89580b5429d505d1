//! Spreadsheet-backed storage.
//!
//! This module provides [`SheetStore`], a `StorageManager` over any
//! `Spreadsheet` port implementation, the member column table, and an
//! in-memory spreadsheet used for local runs and tests.

mod mappings;
mod memory;
mod store;

pub use mappings::member_table;
pub use memory::InMemorySpreadsheet;
pub use store::SheetStore;
