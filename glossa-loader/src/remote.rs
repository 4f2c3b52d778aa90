//! Remote JSON catalog source over HTTP.

use async_trait::async_trait;
use glossa_core::{Catalog, LocaleKey, SourceError};
use reqwest::Client;

use crate::source::Source;

/// A remote source retrieving catalogs as `GET {base}/{key}.json`.
///
/// Primary and secondary remote sources are two instances of this type with
/// different bases and names; the chain algorithm does not distinguish them.
pub struct RemoteJsonSource {
    name: String,
    client: Client,
    base_url: String,
}

impl RemoteJsonSource {
    /// Create a source with a fresh HTTP client.
    ///
    /// # Arguments
    /// * `name` - Name used in failure attribution (e.g. "primary-cdn")
    /// * `base_url` - Base URL; `/{key}.json` is appended per request
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self::with_client(name, base_url, Client::new())
    }

    /// Create a source reusing an existing HTTP client (connection pooling
    /// across sources).
    pub fn with_client(
        name: impl Into<String>,
        base_url: impl Into<String>,
        client: Client,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            name: name.into(),
            client,
            base_url,
        }
    }

    fn url_for(&self, key: &LocaleKey) -> String {
        format!("{}/{}.json", self.base_url, key)
    }
}

#[async_trait]
impl Source for RemoteJsonSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, key: &LocaleKey) -> Result<Catalog, SourceError> {
        let url = self.url_for(key);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::Unavailable {
                reason: format!("GET {url} failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Unavailable {
                reason: format!("GET {url} returned {status}"),
            });
        }

        let value: serde_json::Value =
            response.json().await.map_err(|e| SourceError::InvalidPayload {
                reason: format!("response from {url} is not valid JSON: {e}"),
            })?;

        Catalog::from_value(value)
    }
}

impl std::fmt::Debug for RemoteJsonSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteJsonSource")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .finish()
    }
}
