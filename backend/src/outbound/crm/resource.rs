//! Per-entity description of a CRM resource.

use serde_json::Value;

/// How one entity type is addressed on the CRM service.
#[derive(Debug, Clone, PartialEq)]
pub struct CrmResource {
    plural: String,
    singular: String,
    default_filter: Vec<(String, String)>,
    create_defaults: Vec<(String, Value)>,
    money_fields: Vec<String>,
}

impl CrmResource {
    /// Resource with the given collection and item names.
    pub fn new(plural: impl Into<String>, singular: impl Into<String>) -> Self {
        Self {
            plural: plural.into(),
            singular: singular.into(),
            default_filter: Vec::new(),
            create_defaults: Vec::new(),
            money_fields: Vec::new(),
        }
    }

    /// Server-side filter merged into every listing.
    pub fn with_default_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_filter.push((key.into(), value.into()));
        self
    }

    /// Backend field set on creation when the entity leaves it empty.
    pub fn with_create_default(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.create_defaults.push((key.into(), value.into()));
        self
    }

    /// Backend fields holding currency amounts, at any nesting depth.
    pub fn with_money_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.money_fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Collection path segment and list body key.
    pub fn plural(&self) -> &str {
        &self.plural
    }

    /// Single-entity body key.
    pub fn singular(&self) -> &str {
        &self.singular
    }

    /// Filter merged into listings.
    pub fn default_filter(&self) -> &[(String, String)] {
        &self.default_filter
    }

    /// Defaults applied on creation.
    pub fn create_defaults(&self) -> &[(String, Value)] {
        &self.create_defaults
    }

    /// Fields converted between cents and currency amounts.
    pub fn money_fields(&self) -> &[String] {
        &self.money_fields
    }

    /// `plural/id`.
    pub(crate) fn item_path(&self, id: &str) -> String {
        format!("{}/{id}", self.plural)
    }

    /// Default filter with `overrides` applied; an override replaces a
    /// default of the same key.
    pub(crate) fn merged_filter(&self, overrides: &[(String, String)]) -> Vec<(String, String)> {
        let mut merged: Vec<(String, String)> = self
            .default_filter
            .iter()
            .filter(|(key, _)| !overrides.iter().any(|(other, _)| other == key))
            .cloned()
            .collect();
        merged.extend(overrides.iter().cloned());
        merged
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;

    #[test]
    fn caller_filters_override_defaults_of_the_same_key() {
        let resource = CrmResource::new("contacts", "contact")
            .with_default_filter("contact_type", "customer")
            .with_default_filter("cf_member", "true");
        let merged = resource.merged_filter(&[
            ("cf_member".to_owned(), "false".to_owned()),
            ("email".to_owned(), "a@b.org".to_owned()),
        ]);
        assert_eq!(
            merged,
            [
                ("contact_type".to_owned(), "customer".to_owned()),
                ("cf_member".to_owned(), "false".to_owned()),
                ("email".to_owned(), "a@b.org".to_owned()),
            ]
        );
    }

    #[test]
    fn item_paths_use_the_plural() {
        assert_eq!(CrmResource::new("invoices", "invoice").item_path("9"), "invoices/9");
    }
}
