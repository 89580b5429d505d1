//! Folding of CRM `custom_fields` into top-level `cf_*` keys and back.

use serde_json::{Map, Value, json};

const CUSTOM_FIELDS_KEY: &str = "custom_fields";
const PREFIX: &str = "cf_";

fn prefixed(name: &str) -> String {
    if name.starts_with(PREFIX) {
        name.to_owned()
    } else {
        format!("{PREFIX}{name}")
    }
}

/// Move every `custom_fields` entry to a top-level `cf_*` key.
///
/// A top-level key already present wins over the nested copy.
pub(super) fn fold(object: &mut Map<String, Value>) {
    let Some(Value::Array(entries)) = object.remove(CUSTOM_FIELDS_KEY) else {
        return;
    };
    for entry in entries {
        let name = entry
            .get("api_name")
            .or_else(|| entry.get("label"))
            .and_then(Value::as_str)
            .map(prefixed);
        if let Some(name) = name {
            let value = entry.get("value").cloned().unwrap_or(Value::Null);
            object.entry(name).or_insert(value);
        }
    }
}

/// Move every top-level `cf_*` key into a `custom_fields` array.
pub(super) fn unfold(object: &mut Map<String, Value>) {
    let names: Vec<String> = object
        .keys()
        .filter(|key| key.starts_with(PREFIX))
        .cloned()
        .collect();
    if names.is_empty() {
        return;
    }
    let entries: Vec<Value> = names
        .into_iter()
        .filter_map(|name| {
            let value = object.remove(&name)?;
            Some(json!({ "api_name": name, "value": value }))
        })
        .collect();
    object.insert(CUSTOM_FIELDS_KEY.to_owned(), Value::Array(entries));
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn fold_lifts_custom_fields_to_top_level() {
        let mut record = object(json!({
            "contact_id": "1",
            "custom_fields": [
                {"api_name": "cf_member", "value": true},
                {"label": "interests", "value": "hiking"}
            ]
        }));
        fold(&mut record);
        assert_eq!(
            Value::Object(record),
            json!({"contact_id": "1", "cf_member": true, "cf_interests": "hiking"})
        );
    }

    #[test]
    fn fold_keeps_existing_top_level_values() {
        let mut record = object(json!({
            "cf_member": false,
            "custom_fields": [{"api_name": "cf_member", "value": true}]
        }));
        fold(&mut record);
        assert_eq!(record.get("cf_member"), Some(&json!(false)));
    }

    #[test]
    fn unfold_moves_prefixed_keys_under_custom_fields() {
        let mut record = object(json!({"email": "a@b.org", "cf_level": "family"}));
        unfold(&mut record);
        assert_eq!(
            Value::Object(record),
            json!({
                "email": "a@b.org",
                "custom_fields": [{"api_name": "cf_level", "value": "family"}]
            })
        );
    }

    #[test]
    fn unfold_without_custom_keys_adds_nothing() {
        let mut record = object(json!({"email": "a@b.org"}));
        unfold(&mut record);
        assert!(!record.contains_key("custom_fields"));
    }
}
