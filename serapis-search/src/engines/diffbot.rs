//! Diffbot global-index provider.
//!
//! Diffbot returns pages it has already crawled and extracted, so results
//! carry full text and skip the enrichment fan-out. Used as an alternate,
//! cache-like source rather than a primary engine.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::config::SearchConfig;
use crate::engine::SearchProvider;
use crate::error::SearchError;
use crate::http;
use crate::text;
use crate::types::{null_as_default, CandidateResult, Provider, StructuredDocument};

/// Diffbot search client.
pub struct DiffbotProvider {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl DiffbotProvider {
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        Ok(Self {
            client: http::build_client(config)?,
            endpoint: config.endpoints.diffbot.clone(),
            token: config.credentials.diffbot.clone(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct DiffbotResponse {
    #[serde(deserialize_with = "null_as_default")]
    objects: Vec<DiffbotObject>,
    error: Option<String>,
    error_code: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct DiffbotObject {
    #[serde(deserialize_with = "null_as_default")]
    title: String,
    #[serde(deserialize_with = "null_as_default")]
    page_url: String,
    author: Option<String>,
    date: Option<String>,
    text: Option<String>,
}

#[async_trait]
impl SearchProvider for DiffbotProvider {
    async fn search(&self, term: &str) -> Result<Vec<StructuredDocument>, SearchError> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| SearchError::Config("no Diffbot token configured".into()))?;

        tracing::trace!(term, "Diffbot search");

        let phrase = format!("\"{term}\"");
        let request = self.client.get(&self.endpoint).query(&[
            ("token", token),
            ("query", phrase.as_str()),
            ("col", "GLOBAL-INDEX"),
        ]);
        let response: DiffbotResponse = http::send_json(request, "Diffbot").await?;

        let results = parse_response(response, term)?;
        tracing::info!(term, count = results.len(), "searching Diffbot returned results");
        Ok(results)
    }

    fn provider(&self) -> Provider {
        Provider::Diffbot
    }
}

fn parse_response(
    response: DiffbotResponse,
    term: &str,
) -> Result<Vec<StructuredDocument>, SearchError> {
    if response.objects.is_empty() {
        if let Some(error) = response.error {
            let code = response
                .error_code
                .map(|code| code.to_string())
                .unwrap_or_else(|| "unknown".to_owned());
            return Err(SearchError::Provider(format!(
                "Diffbot: {error} (code {code})"
            )));
        }
        tracing::debug!(term, "Diffbot returned no objects");
    }

    Ok(response
        .objects
        .into_iter()
        .filter_map(|object| {
            let body = object.text.filter(|t| !t.trim().is_empty())?;
            let mut candidate = CandidateResult::new(object.page_url, object.title, Provider::Diffbot);
            candidate.author = object.author.filter(|a| !a.trim().is_empty());
            candidate.date = object.date.as_deref().and_then(normalise_date);
            let extracted = text::extract(&body, term);
            Some(StructuredDocument::enriched(
                candidate,
                body,
                extracted.sentences,
                extracted.variants,
            ))
        })
        .collect())
}

/// Parse the date formats Diffbot emits into RFC 3339.
fn normalise_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.to_rfc3339());
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(raw) {
        return Some(parsed.to_rfc3339());
    }
    // Diffbot's usual shape: "Fri, 20 Nov 2015 00:00:00 GMT".
    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%a, %d %b %Y %H:%M:%S GMT") {
        return Some(parsed.and_utc().to_rfc3339());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().to_rfc3339())
}
