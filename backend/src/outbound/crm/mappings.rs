//! Field bindings and resource descriptions for the CRM.

use crate::domain::{MappingError, MappingTable};

/// Contacts flagged as members.
pub fn contact_resource() -> super::CrmResource {
    super::CrmResource::new("contacts", "contact")
        .with_default_filter("contact_type", "customer")
        .with_default_filter("cf_member", "true")
        .with_create_default("contact_type", "customer")
        .with_create_default("cf_member", true)
}

/// Member fields on a CRM contact. Membership state lives in custom fields.
///
/// # Errors
///
/// Returns [`MappingError`] if the table stops being a bijection.
pub fn contact_table() -> Result<MappingTable, MappingError> {
    MappingTable::new([
        ("id", "contact_id"),
        ("createdAt", "created_time"),
        ("updatedAt", "last_modified_time"),
        ("emailAddress", "email"),
        ("firstName", "first_name"),
        ("lastName", "last_name"),
        ("phoneNumber", "phone"),
        ("address", "cf_address"),
        ("interests", "cf_interests"),
        ("loginStatus", "cf_login_status"),
        ("authToken", "cf_auth_token"),
        ("authExpiration", "cf_auth_expires"),
        ("level", "cf_membership_level"),
        ("registrationStatus", "cf_registration_status"),
        ("waiverSigned", "cf_waiver_signed"),
        ("waiverDate", "cf_waiver_date"),
        ("waiverPdfLink", "cf_waiver_pdf"),
    ])
}

/// Invoice line fields; `item_id` names the billed catalogue item.
///
/// # Errors
///
/// Returns [`MappingError`] if the table stops being a bijection.
pub fn line_item_table() -> Result<MappingTable, MappingError> {
    MappingTable::new([
        ("itemId", "item_id"),
        ("name", "name"),
        ("description", "description"),
        ("rateCents", "rate"),
        ("quantity", "quantity"),
    ])
}

/// Invoices; amounts on the invoice and its lines are currency values.
pub fn invoice_resource() -> super::CrmResource {
    super::CrmResource::new("invoices", "invoice").with_money_fields(["rate", "total"])
}

/// Invoice fields, with line items mapped element-wise.
///
/// # Errors
///
/// Returns [`MappingError`] if the table stops being a bijection.
pub fn invoice_table() -> Result<MappingTable, MappingError> {
    MappingTable::new([
        ("id", "invoice_id"),
        ("createdAt", "created_time"),
        ("updatedAt", "last_modified_time"),
        ("customerId", "customer_id"),
        ("customerName", "customer_name"),
        ("invoiceNumber", "invoice_number"),
        ("date", "date"),
        ("dueDate", "due_date"),
        ("status", "status"),
        ("reference", "reference_number"),
        ("totalCents", "total"),
    ])?
    .with_nested("lineItems", "line_items", line_item_table()?)
}
