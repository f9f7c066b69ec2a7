//! Google Custom Search JSON API provider.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::SearchConfig;
use crate::engine::SearchProvider;
use crate::error::SearchError;
use crate::http;
use crate::qualify::Qualifier;
use crate::types::{null_as_default, CandidateResult, Provider, StructuredDocument};

/// Google Custom Search client.
///
/// Requires an API key and a custom search engine id. Results are
/// restricted to English pages and filtered through the [`Qualifier`].
pub struct GoogleProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    cse: String,
    qualifier: Qualifier,
}

impl GoogleProvider {
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &SearchConfig, qualifier: Qualifier) -> Result<Self, SearchError> {
        Ok(Self {
            client: http::build_client(config)?,
            endpoint: config.endpoints.google.clone(),
            api_key: config.credentials.google.clone(),
            cse: config.google_cse.clone(),
            qualifier,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GoogleResponse {
    #[serde(deserialize_with = "null_as_default")]
    items: Vec<GoogleItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GoogleItem {
    #[serde(deserialize_with = "null_as_default")]
    link: String,
    #[serde(deserialize_with = "null_as_default")]
    title: String,
    #[serde(deserialize_with = "null_as_default")]
    snippet: String,
}

#[async_trait]
impl SearchProvider for GoogleProvider {
    async fn search(&self, term: &str) -> Result<Vec<StructuredDocument>, SearchError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SearchError::Config("no Google API key configured".into()))?;

        tracing::trace!(term, "Google search");

        let request = self.client.get(&self.endpoint).query(&[
            ("key", key),
            ("cx", self.cse.as_str()),
            ("q", term),
            ("lr", "lang_en"),
        ]);
        let response: GoogleResponse = http::send_json(request, "Google").await?;

        let results = qualify_items(response.items, &self.qualifier);
        tracing::info!(term, count = results.len(), "searching Google returned results");
        Ok(results)
    }

    fn provider(&self) -> Provider {
        Provider::Google
    }
}

fn qualify_items(items: Vec<GoogleItem>, qualifier: &Qualifier) -> Vec<StructuredDocument> {
    items
        .into_iter()
        .filter(|item| !item.link.is_empty())
        .filter(|item| qualifier.qualify(&item.link, &item.snippet, None))
        .map(|item| {
            CandidateResult::new(item.link, item.title, Provider::Google)
                .with_summary(item.snippet)
                .into()
        })
        .collect()
}
