//! Bing search API provider (Azure datamarket).
//!
//! Bing authenticates with HTTP Basic where both user and password are the
//! account key, and expects some query parameters wrapped in single quotes
//! while others (like `$format`) are not.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::SearchConfig;
use crate::engine::SearchProvider;
use crate::error::SearchError;
use crate::http;
use crate::qualify::Qualifier;
use crate::types::{null_as_default, CandidateResult, Provider, StructuredDocument};

/// Bing web search client. Returns up to 50 results per query.
pub struct BingProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    qualifier: Qualifier,
}

impl BingProvider {
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &SearchConfig, qualifier: Qualifier) -> Result<Self, SearchError> {
        Ok(Self {
            client: http::build_client(config)?,
            endpoint: config.endpoints.bing.clone(),
            api_key: config.credentials.bing.clone(),
            qualifier,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BingResponse {
    #[serde(deserialize_with = "null_as_default")]
    d: BingPayload,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BingPayload {
    #[serde(deserialize_with = "null_as_default")]
    results: Vec<BingItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct BingItem {
    #[serde(deserialize_with = "null_as_default")]
    url: String,
    #[serde(deserialize_with = "null_as_default")]
    title: String,
    #[serde(deserialize_with = "null_as_default")]
    description: String,
}

/// Quote a value the way the datamarket API wants it.
fn quoted(value: &str) -> String {
    format!("'{value}'")
}

#[async_trait]
impl SearchProvider for BingProvider {
    async fn search(&self, term: &str) -> Result<Vec<StructuredDocument>, SearchError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SearchError::Config("no Bing API key configured".into()))?;

        tracing::trace!(term, "Bing search");

        // Moderate filters explicit images but not explicit text.
        let query = quoted(term);
        let request = self
            .client
            .post(&self.endpoint)
            .basic_auth(key, Some(key))
            .query(&[
                ("Query", query.as_str()),
                ("$format", "JSON"),
                ("Market", "'en-US'"),
                ("Options", "'DisableLocationDetection'"),
                ("Adult", "'Moderate'"),
            ]);
        let response: BingResponse = http::send_json(request, "Bing").await?;

        let total = response.d.results.len();
        let results = qualify_items(response.d.results, &self.qualifier);
        tracing::info!(
            term,
            count = results.len(),
            total,
            "searching Bing returned results"
        );
        Ok(results)
    }

    fn provider(&self) -> Provider {
        Provider::Bing
    }
}

fn qualify_items(items: Vec<BingItem>, qualifier: &Qualifier) -> Vec<StructuredDocument> {
    items
        .into_iter()
        .filter(|item| !item.url.is_empty())
        .filter(|item| qualifier.qualify(&item.url, &item.description, None))
        .map(|item| {
            CandidateResult::new(item.url, item.title, Provider::Bing)
                .with_summary(item.description)
                .into()
        })
        .collect()
}
