//! DTOs for calendar event resources.
//!
//! The adapter decodes into these transport DTOs, then flattens them into a
//! [`Record`] keyed by the event mapping table. Catalogue data rides in the
//! event's private extended properties.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::Record;
use crate::domain::mapping::timestamp_value;

use super::directory::ResourceDirectory;

const ITEM_KEYS: [&str; 5] = ["item_id", "item_name", "price_cents", "cost_cents", "capacity"];
const CANCELLED: &str = "cancelled";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct EventDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) id: Option<String>,
    #[serde(default, skip_serializing)]
    pub(super) status: Option<String>,
    #[serde(default)]
    pub(super) summary: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub(super) description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub(super) location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) start: Option<EventTimeDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) end: Option<EventTimeDto>,
    #[serde(default)]
    pub(super) attendees: Vec<AttendeeDto>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(super) recurrence: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) recurring_event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) extended_properties: Option<ExtendedPropertiesDto>,
    #[serde(default, skip_serializing)]
    pub(super) created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing)]
    pub(super) updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct EventTimeDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) date_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AttendeeDto {
    pub(super) email: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub(super) resource: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) response_status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(super) struct ExtendedPropertiesDto {
    #[serde(default)]
    pub(super) private: BTreeMap<String, String>,
}

impl EventTimeDto {
    fn instant(&self) -> Option<DateTime<Utc>> {
        self.date_time.or_else(|| {
            self.date
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        })
    }

    fn at(instant: DateTime<Utc>) -> Self {
        Self {
            date_time: Some(instant),
            date: None,
        }
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn instant_of(value: Option<&Value>) -> Option<DateTime<Utc>> {
    value
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw.trim()).ok())
        .map(|instant| instant.with_timezone(&Utc))
}

fn strings_of(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(text_of).collect(),
        _ => Vec::new(),
    }
}

impl EventDto {
    /// Whether the service reports the event as cancelled.
    pub(super) fn is_cancelled(&self) -> bool {
        self.status.as_deref() == Some(CANCELLED)
    }

    /// Start instant, date-only events starting at midnight UTC.
    pub(super) fn start_instant(&self) -> Option<DateTime<Utc>> {
        self.start.as_ref().and_then(EventTimeDto::instant)
    }

    /// Flatten into a record; the location becomes the directory name of the
    /// booked resource when the directory knows it.
    pub(super) fn into_record(self, directory: &ResourceDirectory) -> Record {
        let mut record = Record::new();
        let (resources, people): (Vec<AttendeeDto>, Vec<AttendeeDto>) =
            self.attendees.into_iter().partition(|attendee| attendee.resource);
        let resource_email = resources.into_iter().next().map(|attendee| attendee.email);
        let location = resource_email
            .as_deref()
            .and_then(|email| directory.name_of(email))
            .map_or(self.location, ToOwned::to_owned);

        if let Some(id) = self.id {
            record.insert("id", id);
        }
        record.insert("summary", self.summary);
        record.insert("description", self.description);
        record.insert("location", location);
        let start = self.start.as_ref().and_then(EventTimeDto::instant);
        let end = self.end.as_ref().and_then(EventTimeDto::instant);
        if let Some(start) = start {
            record.insert("start", timestamp_value(&start));
        }
        if let Some(end) = end {
            record.insert("end", timestamp_value(&end));
        }
        let emails: Vec<String> = people.into_iter().map(|attendee| attendee.email).collect();
        record.insert("attendees", emails);
        if let Some(email) = resource_email {
            record.insert("resource_email", email);
        }
        record.insert("recurrence", self.recurrence);
        if let Some(parent) = self.recurring_event_id {
            record.insert("recurring_event_id", parent);
        }
        let private = self
            .extended_properties
            .map(|properties| properties.private)
            .unwrap_or_default();
        for key in ITEM_KEYS {
            if let Some(value) = private.get(key) {
                record.insert(key, value.as_str());
            }
        }
        if let Some(created) = self.created {
            record.insert("created", timestamp_value(&created));
        }
        if let Some(updated) = self.updated {
            record.insert("updated", timestamp_value(&updated));
        }
        record
    }

    /// Rebuild the wire shape from a flattened record; the id and
    /// server-managed timestamps are left out.
    pub(super) fn from_record(record: &Record) -> Self {
        let mut attendees: Vec<AttendeeDto> = strings_of(record.get("attendees"))
            .into_iter()
            .map(|email| AttendeeDto {
                email,
                ..AttendeeDto::default()
            })
            .collect();
        if let Some(email) = record.get("resource_email").and_then(text_of) {
            attendees.push(AttendeeDto {
                email,
                resource: true,
                response_status: Some("accepted".to_owned()),
            });
        }
        let private: BTreeMap<String, String> = ITEM_KEYS
            .iter()
            .filter_map(|key| {
                record
                    .get(key)
                    .and_then(text_of)
                    .map(|value| ((*key).to_owned(), value))
            })
            .collect();
        Self {
            summary: record.get("summary").and_then(text_of).unwrap_or_default(),
            description: record.get("description").and_then(text_of).unwrap_or_default(),
            location: record.get("location").and_then(text_of).unwrap_or_default(),
            start: instant_of(record.get("start")).map(EventTimeDto::at),
            end: instant_of(record.get("end")).map(EventTimeDto::at),
            attendees,
            recurrence: strings_of(record.get("recurrence")),
            recurring_event_id: record.get("recurring_event_id").and_then(text_of),
            extended_properties: (!private.is_empty())
                .then_some(ExtendedPropertiesDto { private }),
            ..Self::default()
        }
    }
}
