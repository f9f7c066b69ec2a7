//! DuckDuckGo instant-answer provider.
//!
//! Uses the JSON API at `https://api.duckduckgo.com/`. Only the abstract and
//! definition of an instant answer are used, and only when the abstract
//! comes from an allow-listed source. Both texts are short, so sentence
//! extraction happens right here instead of through the enrichment fan-out.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::SearchConfig;
use crate::engine::SearchProvider;
use crate::error::SearchError;
use crate::http;
use crate::text;
use crate::types::{null_as_default, CandidateResult, Provider, StructuredDocument};

/// DuckDuckGo instant-answer client.
pub struct DuckDuckGoProvider {
    client: reqwest::Client,
    endpoint: String,
    sources: Vec<String>,
}

impl DuckDuckGoProvider {
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        Ok(Self {
            client: http::build_client(config)?,
            endpoint: config.endpoints.duckduckgo.clone(),
            sources: config.duckduckgo_sources.clone(),
        })
    }
}

/// The subset of the instant-answer payload serapis reads.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub(crate) struct InstantAnswer {
    #[serde(deserialize_with = "null_as_default")]
    heading: String,
    #[serde(rename = "Abstract", deserialize_with = "null_as_default")]
    abstract_text: String,
    #[serde(rename = "AbstractURL", deserialize_with = "null_as_default")]
    abstract_url: String,
    #[serde(deserialize_with = "null_as_default")]
    abstract_source: String,
    #[serde(deserialize_with = "null_as_default")]
    definition: String,
    #[serde(rename = "DefinitionURL", deserialize_with = "null_as_default")]
    definition_url: String,
    #[serde(deserialize_with = "null_as_default")]
    definition_source: String,
}

#[async_trait]
impl SearchProvider for DuckDuckGoProvider {
    async fn search(&self, term: &str) -> Result<Vec<StructuredDocument>, SearchError> {
        tracing::trace!(term, "DuckDuckGo search");

        let request = self
            .client
            .get(&self.endpoint)
            .query(&[("q", term), ("format", "json")]);
        let answer: InstantAnswer = http::send_json(request, "DuckDuckGo").await?;

        let results = parse_instant_answer(&answer, term, &self.sources);
        tracing::info!(term, count = results.len(), "searching DuckDuckGo returned results");
        Ok(results)
    }

    fn provider(&self) -> Provider {
        Provider::DuckDuckGo
    }
}

/// Turn an instant answer into at most two enriched documents.
pub(crate) fn parse_instant_answer(
    answer: &InstantAnswer,
    term: &str,
    sources: &[String],
) -> Vec<StructuredDocument> {
    if !sources.iter().any(|source| *source == answer.abstract_source) {
        tracing::debug!(source = %answer.abstract_source, "instant answer source not allowed");
        return Vec::new();
    }

    let entries = [
        (&answer.abstract_text, &answer.abstract_url, &answer.abstract_source),
        (&answer.definition, &answer.definition_url, &answer.definition_source),
    ];

    entries
        .into_iter()
        .filter(|(body, _, _)| !body.trim().is_empty())
        .map(|(body, url, source)| {
            let mut candidate =
                CandidateResult::new(url.clone(), answer.heading.clone(), Provider::DuckDuckGo);
            candidate.source = Some(source.clone());
            let extracted = text::extract(body, term);
            StructuredDocument::enriched(
                candidate,
                body.clone(),
                extracted.sentences,
                extracted.variants,
            )
        })
        .collect()
}
