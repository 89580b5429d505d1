//! Calendar events and the catalogue item attached to them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entity::Mappable;
use crate::domain::mapping::{Fields, timestamp_value};

pub(crate) const SUMMARY_FIELD: &str = "summary";
pub(crate) const DESCRIPTION_FIELD: &str = "description";
pub(crate) const LOCATION_FIELD: &str = "location";
pub(crate) const START_FIELD: &str = "start";
pub(crate) const END_FIELD: &str = "end";
pub(crate) const ATTENDEES_FIELD: &str = "attendees";
pub(crate) const RESOURCE_EMAIL_FIELD: &str = "resourceEmail";
pub(crate) const RECURRENCE_FIELD: &str = "recurrence";
pub(crate) const RECURRING_EVENT_ID_FIELD: &str = "recurringEventId";
pub(crate) const ITEM_ID_FIELD: &str = "itemId";
pub(crate) const ITEM_NAME_FIELD: &str = "itemName";
pub(crate) const PRICE_FIELD: &str = "priceCents";
pub(crate) const COST_FIELD: &str = "costCents";
pub(crate) const CAPACITY_FIELD: &str = "capacity";

/// Catalogue data for an event: what it costs and how many may attend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventItem {
    /// Identifier of the matching catalogue item in the accounting service.
    pub item_id: Option<String>,
    /// Catalogue name.
    pub name: String,
    /// Price charged per attendee, in cents.
    pub price_cents: i64,
    /// Cost to the organisation per attendee, in cents.
    pub cost_cents: i64,
    /// Attendee limit; `None` is unlimited.
    pub capacity: Option<u32>,
}

impl EventItem {
    /// Whether `attendees` more people still fit.
    pub fn has_room_for(&self, attendees: usize) -> bool {
        self.capacity
            .is_none_or(|capacity| usize::try_from(capacity).is_ok_and(|cap| attendees < cap))
    }
}

/// An event, or one occurrence of a recurring series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Title shown on the calendar.
    pub summary: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Human-readable location, resolved from `resource_email` when set.
    #[serde(default)]
    pub location: String,
    /// Start instant.
    pub start: DateTime<Utc>,
    /// End instant.
    pub end: DateTime<Utc>,
    /// Attendee email addresses.
    #[serde(default)]
    pub attendees: Vec<String>,
    /// Booked room or resource, by directory email.
    #[serde(default)]
    pub resource_email: Option<String>,
    /// Recurrence rules for a series, stored verbatim.
    #[serde(default)]
    pub recurrence: Vec<String>,
    /// Parent series when this is a single occurrence.
    #[serde(default)]
    pub recurring_event_id: Option<String>,
    /// Catalogue data.
    #[serde(default)]
    pub item: EventItem,
}

impl Event {
    /// New one-off event.
    pub fn new(summary: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            summary: summary.into(),
            description: String::new(),
            location: String::new(),
            start,
            end,
            attendees: Vec::new(),
            resource_email: None,
            recurrence: Vec::new(),
            recurring_event_id: None,
            item: EventItem::default(),
        }
    }

    /// Whether `email` is on the attendee list, ignoring case.
    pub fn is_attending(&self, email: &str) -> bool {
        self.attendees
            .iter()
            .any(|attendee| attendee.eq_ignore_ascii_case(email.trim()))
    }

    /// Whether another attendee can be added.
    pub fn has_room(&self) -> bool {
        self.item.has_room_for(self.attendees.len())
    }
}

impl Mappable for Event {
    const KIND: &'static str = "event";

    fn to_fields(&self) -> Fields {
        let mut fields = Fields::new()
            .with(SUMMARY_FIELD, self.summary.as_str())
            .with(DESCRIPTION_FIELD, self.description.as_str())
            .with(LOCATION_FIELD, self.location.as_str())
            .with(START_FIELD, timestamp_value(&self.start))
            .with(END_FIELD, timestamp_value(&self.end))
            .with(ATTENDEES_FIELD, self.attendees.clone())
            .with(RECURRENCE_FIELD, self.recurrence.clone())
            .with(ITEM_NAME_FIELD, self.item.name.as_str())
            .with(PRICE_FIELD, self.item.price_cents)
            .with(COST_FIELD, self.item.cost_cents);
        fields.insert_opt(RESOURCE_EMAIL_FIELD, self.resource_email.clone());
        fields.insert_opt(RECURRING_EVENT_ID_FIELD, self.recurring_event_id.clone());
        fields.insert_opt(ITEM_ID_FIELD, self.item.item_id.clone());
        fields.insert_opt(CAPACITY_FIELD, self.item.capacity);
        fields
    }

    fn from_fields(fields: &Fields) -> Self {
        let start = fields.timestamp(START_FIELD).unwrap_or_default();
        Self {
            summary: fields.text(SUMMARY_FIELD),
            description: fields.text(DESCRIPTION_FIELD),
            location: fields.text(LOCATION_FIELD),
            start,
            end: fields.timestamp(END_FIELD).unwrap_or(start),
            attendees: fields.list(ATTENDEES_FIELD),
            resource_email: fields.opt_text(RESOURCE_EMAIL_FIELD),
            recurrence: fields.list(RECURRENCE_FIELD),
            recurring_event_id: fields.opt_text(RECURRING_EVENT_ID_FIELD),
            item: EventItem {
                item_id: fields.opt_text(ITEM_ID_FIELD),
                name: fields.text(ITEM_NAME_FIELD),
                price_cents: fields.integer(PRICE_FIELD).unwrap_or_default(),
                cost_cents: fields.integer(COST_FIELD).unwrap_or_default(),
                capacity: fields.count(CAPACITY_FIELD),
            },
        }
    }
}
