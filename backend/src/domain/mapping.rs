//! Bidirectional field mapping between domain entities and backend records.
//!
//! A [`MappingTable`] declares, once, which local field corresponds to which
//! backend field. The backend→local direction is derived from it by swapping
//! pairs unless a table declares an explicit inverse. Because the inverse is
//! derived, the forward table must be a bijection; tables are validated when
//! they are built so a violation surfaces at composition time.
//!
//! Fields absent from a table are dropped in both directions. Omitting a
//! field from a backend's table is the way to keep it off that backend.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

/// Mapping contract violations detected while building a table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    /// The same local field was declared twice.
    #[error("local field `{local}` is declared more than once")]
    DuplicateLocalKey { local: String },
    /// Two local fields were bound to one backend field.
    #[error("backend field `{backend}` is bound to both `{first}` and `{second}`")]
    DuplicateBackendKey {
        backend: String,
        first: String,
        second: String,
    },
    /// An inverse override names a local field the forward table lacks.
    #[error("inverse binding targets undeclared local field `{local}`")]
    UnknownInverseTarget { local: String },
    /// An inverse override maps two backend fields onto one local field.
    #[error("local field `{local}` is the target of more than one inverse binding")]
    DuplicateInverseTarget { local: String },
    /// A binding a backend depends on is absent.
    #[error("mapping has no binding for required field `{local}`")]
    MissingBinding { local: String },
}

/// Domain-side field values keyed by local field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields(BTreeMap<String, Value>);

impl Fields {
    /// Empty field set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Set `key` only when `value` is present.
    pub fn insert_opt<V: Into<Value>>(&mut self, key: impl Into<String>, value: Option<V>) {
        if let Some(value) = value {
            self.insert(key, value);
        }
    }

    /// Builder form of [`Fields::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Add every entry of `other`, replacing existing keys.
    pub fn merge(&mut self, other: Fields) {
        self.0.extend(other.0);
    }

    /// Value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Remove and return the value under `key`.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keep only the keys accepted by `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.0.retain(|key, _| keep(key));
    }

    /// Convert into a JSON object.
    pub fn into_value(self) -> Value {
        Value::Object(self.0.into_iter().collect())
    }

    /// Build from a JSON value; non-objects yield an empty set.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => map
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            _ => Self::default(),
        }
    }

    /// Text value of `key`; scalars are stringified and anything else is
    /// blank.
    pub fn text(&self, key: &str) -> String {
        match self.get(key) {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Number(number)) => number.to_string(),
            Some(Value::Bool(flag)) => flag.to_string(),
            _ => String::new(),
        }
    }

    /// Non-blank text value of `key`.
    pub fn opt_text(&self, key: &str) -> Option<String> {
        let text = self.text(key);
        (!text.trim().is_empty()).then_some(text)
    }

    /// Boolean value of `key`, accepting sheet-style spellings.
    pub fn flag(&self, key: &str) -> bool {
        match self.get(key) {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
            Some(Value::String(text)) => matches!(
                text.trim().to_ascii_lowercase().as_str(),
                "true" | "yes" | "y" | "1"
            ),
            _ => false,
        }
    }

    /// Numeric value of `key`, accepting numeric strings.
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.get(key) {
            Some(Value::Number(number)) => number.as_f64(),
            Some(Value::String(text)) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// Non-negative integer value of `key`.
    pub fn count(&self, key: &str) -> Option<u32> {
        match self.get(key) {
            Some(Value::Number(number)) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
            Some(Value::String(text)) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// Signed integer value of `key`, accepting integral strings.
    pub fn integer(&self, key: &str) -> Option<i64> {
        match self.get(key) {
            Some(Value::Number(number)) => number.as_i64(),
            Some(Value::String(text)) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// Timestamp value of `key`.
    ///
    /// The generic conversion keeps timestamps as RFC 3339 text; entities
    /// call this to re-hydrate them.
    pub fn timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        let text = self.opt_text(key)?;
        DateTime::parse_from_rfc3339(text.trim())
            .ok()
            .map(|parsed| parsed.with_timezone(&Utc))
    }

    /// Calendar date value of `key`; accepts `YYYY-MM-DD` or RFC 3339.
    pub fn date(&self, key: &str) -> Option<NaiveDate> {
        let text = self.opt_text(key)?;
        let trimmed = text.trim();
        NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .ok()
            .or_else(|| self.timestamp(key).map(|ts| ts.date_naive()))
    }

    /// List of strings under `key`.
    ///
    /// Accepts a JSON array, JSON array text (as written to a sheet cell), or
    /// comma-separated text.
    pub fn list(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Some(Value::Array(items)) => items.iter().filter_map(scalar_text).collect(),
            Some(Value::String(text)) => {
                let trimmed = text.trim();
                if trimmed.starts_with('[') {
                    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(trimmed) {
                        return items.iter().filter_map(scalar_text).collect();
                    }
                }
                trimmed
                    .split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_owned)
                    .collect()
            }
            _ => Vec::new(),
        }
    }

    /// Nested field sets under `key` (an array of objects).
    pub fn records(&self, key: &str) -> Vec<Fields> {
        match self.get(key) {
            Some(Value::Array(items)) => items.iter().map(Fields::from_value).collect(),
            Some(Value::String(text)) if text.trim().starts_with('[') => {
                match serde_json::from_str::<Value>(text.trim()) {
                    Ok(Value::Array(items)) => items.iter().map(Fields::from_value).collect(),
                    _ => Vec::new(),
                }
            }
            _ => Vec::new(),
        }
    }
}

impl FromIterator<(String, Value)> for Fields {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_owned()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Canonical text encoding for timestamps stored in fields and records.
pub fn timestamp_value(timestamp: &DateTime<Utc>) -> Value {
    Value::String(timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

/// Canonical text encoding for calendar dates.
pub fn date_value(date: &NaiveDate) -> Value {
    Value::String(date.format("%Y-%m-%d").to_string())
}

/// Backend-side record keyed by backend field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Set `key`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Remove and return the value under `key`.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying JSON object.
    pub fn as_object(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Take the underlying JSON object.
    pub fn into_object(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Record {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Value::Object(value.0)
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Binding {
    backend: String,
    nested: Option<MappingTable>,
}

/// Declared correspondence between local and backend field names.
///
/// ## Invariants
/// - No local field is declared twice.
/// - No two local fields share a backend field, so the derived inverse is
///   lossless.
///
/// # Examples
/// ```
/// use membership::domain::{Fields, MappingTable};
///
/// let table = MappingTable::new([("emailAddress", "email"), ("firstName", "first_name")])
///     .expect("bijective table");
/// let fields = Fields::new()
///     .with("emailAddress", "a@b.org")
///     .with("unmapped", "dropped");
/// let record = table.to_record(&fields);
/// assert_eq!(record.get("email").and_then(|v| v.as_str()), Some("a@b.org"));
/// assert_eq!(record.len(), 1);
/// assert_eq!(table.from_record(&record).text("emailAddress"), "a@b.org");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MappingTable {
    forward: BTreeMap<String, Binding>,
    inverse: BTreeMap<String, String>,
}

impl MappingTable {
    /// Build a table from `(local, backend)` pairs.
    ///
    /// # Errors
    ///
    /// Returns a [`MappingError`] when a local field repeats or two local
    /// fields share a backend field.
    pub fn new<I, L, B>(pairs: I) -> Result<Self, MappingError>
    where
        I: IntoIterator<Item = (L, B)>,
        L: Into<String>,
        B: Into<String>,
    {
        let mut table = Self {
            forward: BTreeMap::new(),
            inverse: BTreeMap::new(),
        };
        for (local, backend) in pairs {
            table.bind(local.into(), backend.into(), None)?;
        }
        Ok(table)
    }

    /// Add a binding whose value is an array of objects mapped element-wise
    /// through `nested`.
    ///
    /// # Errors
    ///
    /// Same as [`MappingTable::new`].
    pub fn with_nested(
        mut self,
        local: impl Into<String>,
        backend: impl Into<String>,
        nested: MappingTable,
    ) -> Result<Self, MappingError> {
        self.bind(local.into(), backend.into(), Some(nested))?;
        Ok(self)
    }

    /// Replace the derived backend→local table with explicit
    /// `(backend, local)` pairs.
    ///
    /// # Errors
    ///
    /// Returns a [`MappingError`] when a target is not a declared local field
    /// or the override is not itself one-to-one.
    pub fn with_inverse<I, B, L>(mut self, pairs: I) -> Result<Self, MappingError>
    where
        I: IntoIterator<Item = (B, L)>,
        B: Into<String>,
        L: Into<String>,
    {
        let mut inverse = BTreeMap::new();
        let mut targets = BTreeSet::new();
        for (backend, local) in pairs {
            let (backend, local) = (backend.into(), local.into());
            if !self.forward.contains_key(&local) {
                return Err(MappingError::UnknownInverseTarget { local });
            }
            if !targets.insert(local.clone()) {
                return Err(MappingError::DuplicateInverseTarget { local });
            }
            if let Some(first) = inverse.get(&backend) {
                return Err(MappingError::DuplicateBackendKey {
                    backend,
                    first: String::clone(first),
                    second: local,
                });
            }
            inverse.insert(backend, local);
        }
        self.inverse = inverse;
        Ok(self)
    }

    fn bind(
        &mut self,
        local: String,
        backend: String,
        nested: Option<MappingTable>,
    ) -> Result<(), MappingError> {
        if self.forward.contains_key(&local) {
            return Err(MappingError::DuplicateLocalKey { local });
        }
        if let Some(first) = self.inverse.get(&backend) {
            return Err(MappingError::DuplicateBackendKey {
                backend,
                first: first.clone(),
                second: local,
            });
        }
        self.inverse.insert(backend.clone(), local.clone());
        self.forward.insert(local, Binding { backend, nested });
        Ok(())
    }

    /// Backend field bound to `local`.
    pub fn backend_key(&self, local: &str) -> Option<&str> {
        self.forward.get(local).map(|binding| binding.backend.as_str())
    }

    /// Local field read from `backend`.
    pub fn local_key(&self, backend: &str) -> Option<&str> {
        self.inverse.get(backend).map(String::as_str)
    }

    /// Backend field bound to `local`, or an error naming the gap.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::MissingBinding`] when `local` is unmapped.
    pub fn require(&self, local: &str) -> Result<&str, MappingError> {
        self.backend_key(local)
            .ok_or_else(|| MappingError::MissingBinding {
                local: local.to_owned(),
            })
    }

    /// Declared local fields, sorted.
    pub fn local_keys(&self) -> impl Iterator<Item = &str> {
        self.forward.keys().map(String::as_str)
    }

    /// Backend fields in local-field order.
    pub fn backend_keys(&self) -> impl Iterator<Item = &str> {
        self.forward.values().map(|binding| binding.backend.as_str())
    }

    /// Emit the mapped subset of `fields` under backend names.
    pub fn to_record(&self, fields: &Fields) -> Record {
        fields
            .iter()
            .filter_map(|(local, value)| {
                let binding = self.forward.get(local)?;
                let value = match &binding.nested {
                    Some(nested) => map_array(value, |item| nested.to_record(item).into()),
                    None => value.clone(),
                };
                Some((binding.backend.clone(), value))
            })
            .collect()
    }

    /// Read the mapped subset of `record` back under local names.
    pub fn from_record(&self, record: &Record) -> Fields {
        record
            .iter()
            .filter_map(|(backend, value)| {
                let local = self.inverse.get(backend)?;
                let nested = self
                    .forward
                    .get(local)
                    .and_then(|binding| binding.nested.as_ref());
                let value = match nested {
                    Some(nested) => map_array(value, |item| {
                        let record: Record = item.iter().map(|(k, v)| (k.to_owned(), v.clone())).collect();
                        nested.from_record(&record).into_value()
                    }),
                    None => value.clone(),
                };
                Some((local.clone(), value))
            })
            .collect()
    }
}

fn map_array(value: &Value, mut convert: impl FnMut(&Fields) -> Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| convert(&Fields::from_value(item)))
                .collect(),
        ),
        other => other.clone(),
    }
}
