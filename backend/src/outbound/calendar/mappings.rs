//! Local event fields and their flattened calendar record keys.

use crate::domain::{MappingError, MappingTable};

/// Event fields keyed the way the calendar adapter flattens a calendar
/// event.
///
/// # Errors
///
/// Returns [`MappingError`] if the table stops being a bijection.
pub fn event_table() -> Result<MappingTable, MappingError> {
    MappingTable::new([
        ("id", "id"),
        ("createdAt", "created"),
        ("updatedAt", "updated"),
        ("summary", "summary"),
        ("description", "description"),
        ("location", "location"),
        ("start", "start"),
        ("end", "end"),
        ("attendees", "attendees"),
        ("resourceEmail", "resource_email"),
        ("recurrence", "recurrence"),
        ("recurringEventId", "recurring_event_id"),
        ("itemId", "item_id"),
        ("itemName", "item_name"),
        ("priceCents", "price_cents"),
        ("costCents", "cost_cents"),
        ("capacity", "capacity"),
    ])
}
