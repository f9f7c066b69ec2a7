//! Search configuration with sensible defaults.
//!
//! [`SearchConfig`] is injected into the aggregator and every provider at
//! construction; nothing in this crate reads global state.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::SearchError;
use crate::types::PrimaryEngine;

/// Configuration for search aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Primary engine whose results are enriched: `"bing"` or `"google"`.
    ///
    /// Kept as free text so an unsupported value degrades to an empty
    /// search at run time instead of failing config loading.
    pub search_engine: String,
    /// Maximum time in seconds to wait for page enrichment jobs.
    pub max_search_duration: f64,
    /// URL substrings that disqualify a Google/Bing result.
    pub exclude_domains: Vec<String>,
    /// DuckDuckGo `AbstractSource` values whose instant answers are kept.
    pub duckduckgo_sources: Vec<String>,
    /// Maximum enrichment jobs running at once. `0` means unbounded.
    pub max_concurrent_enrichments: usize,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
    /// Custom User-Agent string. If `None`, rotates through built-in ones.
    pub user_agent: Option<String>,
    /// Google custom search engine id (`cx`).
    pub google_cse: String,
    /// Provider API keys.
    pub credentials: Credentials,
    /// Provider base URLs, overridable for testing.
    pub endpoints: Endpoints,
}

/// Provider API keys. A provider without a key fails fast and contributes
/// no results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub google: Option<String>,
    pub bing: Option<String>,
    pub diffbot: Option<String>,
}

/// Base URLs for each provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub duckduckgo: String,
    pub google: String,
    pub bing: String,
    pub diffbot: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            duckduckgo: "https://api.duckduckgo.com/".to_owned(),
            google: "https://www.googleapis.com/customsearch/v1".to_owned(),
            bing: "https://api.datamarket.azure.com/Bing/Search/Web".to_owned(),
            diffbot: "http://api.diffbot.com/v3/search".to_owned(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            search_engine: "google".to_owned(),
            max_search_duration: 10.0,
            exclude_domains: vec![
                "pinterest.com".to_owned(),
                "youtube.com".to_owned(),
                "facebook.com".to_owned(),
            ],
            duckduckgo_sources: vec![
                "Wikipedia".to_owned(),
                "Wiktionary".to_owned(),
                "Merriam-Webster".to_owned(),
            ],
            max_concurrent_enrichments: 16,
            timeout_seconds: 10,
            user_agent: None,
            google_cse: String::new(),
            credentials: Credentials::default(),
            endpoints: Endpoints::default(),
        }
    }
}

impl SearchConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// The engine name is not checked here: an unsupported engine is a
    /// run-time degradation handled by the aggregator.
    pub fn validate(&self) -> Result<(), SearchError> {
        if !self.max_search_duration.is_finite() || self.max_search_duration <= 0.0 {
            return Err(SearchError::Config(
                "max_search_duration must be a positive number of seconds".into(),
            ));
        }
        if self.timeout_seconds == 0 {
            return Err(SearchError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        let endpoints = [
            &self.endpoints.duckduckgo,
            &self.endpoints.google,
            &self.endpoints.bing,
            &self.endpoints.diffbot,
        ];
        if endpoints.iter().any(|endpoint| endpoint.trim().is_empty()) {
            return Err(SearchError::Config(
                "provider endpoints must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// The configured primary engine, if it is one of the supported ones.
    pub fn primary_engine(&self) -> Result<PrimaryEngine, SearchError> {
        self.search_engine.parse()
    }

    /// Enrichment deadline as a [`Duration`].
    pub fn max_search_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.max_search_duration).unwrap_or(Duration::ZERO)
    }
}
