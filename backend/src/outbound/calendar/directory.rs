//! Resource directory lookups: room email to display name.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::debug;

use crate::domain::ports::{JsonRequest, JsonTransport, StorageError, StorageResult};

const RESOURCES_PATH: &str = "resources/calendars";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceListDto {
    #[serde(default)]
    items: Vec<ResourceDto>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceDto {
    resource_email: String,
    #[serde(default)]
    resource_name: String,
    generated_resource_name: Option<String>,
}

/// Snapshot of the directory's bookable resources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct ResourceDirectory {
    names: BTreeMap<String, String>,
}

impl ResourceDirectory {
    /// Fetch every page of the directory.
    pub(super) async fn load(transport: &dyn JsonTransport) -> StorageResult<Self> {
        let mut names = BTreeMap::new();
        let mut token: Option<String> = None;
        loop {
            let mut request = JsonRequest::get(RESOURCES_PATH);
            if let Some(next) = &token {
                request = request.with_query("pageToken", next.as_str());
            }
            let body = transport.send(request).await?;
            let page: ResourceListDto = serde_json::from_value(body)
                .map_err(|error| StorageError::decode(format!("resource directory: {error}")))?;
            for resource in page.items {
                let name = resource
                    .generated_resource_name
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or(resource.resource_name);
                names.insert(resource.resource_email.trim().to_lowercase(), name);
            }
            match page.next_page_token.filter(|next| !next.is_empty()) {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        debug!(resources = names.len(), "resource directory loaded");
        Ok(Self { names })
    }

    #[cfg(test)]
    pub(super) fn insert(&mut self, email: &str, name: &str) {
        self.names.insert(email.trim().to_lowercase(), name.to_owned());
    }

    /// Display name for `email`, ignoring case.
    pub(super) fn name_of(&self, email: &str) -> Option<&str> {
        self.names
            .get(&email.trim().to_lowercase())
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::test_support::RecordingTransport;
    use serde_json::json;

    #[tokio::test]
    async fn load_follows_page_tokens_and_prefers_generated_names() {
        let transport = RecordingTransport::new()
            .reply(json!({
                "items": [{
                    "resourceEmail": "Boathouse@resource.example.org",
                    "resourceName": "Boathouse",
                    "generatedResourceName": "Harbour-1-Boathouse (12)"
                }],
                "nextPageToken": "p2"
            }))
            .reply(json!({
                "items": [{"resourceEmail": "hall@resource.example.org", "resourceName": "Hall"}]
            }));
        let directory = ResourceDirectory::load(&transport).await.expect("loads");
        assert_eq!(
            directory.name_of("boathouse@resource.example.org"),
            Some("Harbour-1-Boathouse (12)")
        );
        assert_eq!(directory.name_of("HALL@resource.example.org"), Some("Hall"));
        assert_eq!(transport.last_request().query_value("pageToken"), Some("p2"));
    }
}
