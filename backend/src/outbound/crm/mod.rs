//! CRM/accounting REST-backed storage.
//!
//! The collaborator names resources in the plural (`contacts`, `items`,
//! `invoices`), keys list bodies by the plural and single bodies by the
//! singular, and nests extension fields under `custom_fields`. [`CrmStore`]
//! hides those conventions behind `StorageManager`.

mod custom_fields;
mod mappings;
mod money;
mod resource;
mod store;

pub use mappings::{
    contact_resource, contact_table, invoice_resource, invoice_table, line_item_table,
};
pub use resource::CrmResource;
pub use store::CrmStore;
