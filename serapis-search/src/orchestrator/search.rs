//! Core aggregator: DuckDuckGo plus one primary engine, enriched under a deadline.
//!
//! # Pipeline
//!
//! 1. Resolve the primary engine from config; an unsupported value logs an
//!    error and yields nothing without touching any provider
//! 2. Schedule two jobs: DuckDuckGo, and the primary engine followed by
//!    per-URL enrichment ([`SearchAggregator::search_and_parse`])
//! 3. Wait for both with no overall deadline
//! 4. Concatenate, DuckDuckGo first, dropping entries without a URL
//!
//! Only the enrichment join is bounded, by `max_search_duration`. Hits whose
//! enrichment is still running at the deadline are dropped and counted as
//! lost. A failing provider contributes nothing; a failing enrichment keeps
//! the unenriched hit.

use std::fmt;
use std::sync::Arc;

use crate::config::SearchConfig;
use crate::engine::{search_or_empty, SearchProvider};
use crate::engines::{BingProvider, DiffbotProvider, DuckDuckGoProvider, GoogleProvider};
use crate::enrich::{enrich_or_fallback, HttpPageEnricher, PageEnricher};
use crate::error::SearchError;
use crate::job::{self, JobLimiter};
use crate::qualify::Qualifier;
use crate::types::{PrimaryEngine, StructuredDocument};

/// The provider set an aggregator dispatches to.
#[derive(Clone)]
pub struct Providers {
    pub duckduckgo: Arc<dyn SearchProvider>,
    pub google: Arc<dyn SearchProvider>,
    pub bing: Arc<dyn SearchProvider>,
    pub diffbot: Arc<dyn SearchProvider>,
}

impl Providers {
    /// The HTTP providers, all sharing one qualifier.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] if an HTTP client cannot be built.
    pub fn from_config(config: &SearchConfig) -> Result<Self, SearchError> {
        let qualifier = Qualifier::from_config(config);
        Ok(Self {
            duckduckgo: Arc::new(DuckDuckGoProvider::new(config)?),
            google: Arc::new(GoogleProvider::new(config, qualifier.clone())?),
            bing: Arc::new(BingProvider::new(config, qualifier)?),
            diffbot: Arc::new(DiffbotProvider::new(config)?),
        })
    }

    fn primary(&self, engine: PrimaryEngine) -> Arc<dyn SearchProvider> {
        match engine {
            PrimaryEngine::Bing => Arc::clone(&self.bing),
            PrimaryEngine::Google => Arc::clone(&self.google),
        }
    }
}

/// Multi-provider search aggregator.
///
/// Cheap to clone; clones share providers, the enricher, and the
/// enrichment concurrency cap.
#[derive(Clone)]
pub struct SearchAggregator {
    config: Arc<SearchConfig>,
    providers: Providers,
    enricher: Arc<dyn PageEnricher>,
    limiter: JobLimiter,
}

impl SearchAggregator {
    pub fn new(config: SearchConfig, providers: Providers, enricher: Arc<dyn PageEnricher>) -> Self {
        let limiter = JobLimiter::new(config.max_concurrent_enrichments);
        Self {
            config: Arc::new(config),
            providers,
            enricher,
            limiter,
        }
    }

    /// Build an aggregator backed by the real HTTP providers and enricher.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if `config` fails validation, or
    /// [`SearchError::Http`] if an HTTP client cannot be built.
    pub fn from_config(config: SearchConfig) -> Result<Self, SearchError> {
        config.validate()?;
        let providers = Providers::from_config(&config)?;
        let enricher = Arc::new(HttpPageEnricher::new(&config)?);
        Ok(Self::new(config, providers, enricher))
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Aggregate DuckDuckGo and primary-engine results for `term`.
    ///
    /// Never fails. An empty term or an unsupported engine yields an empty
    /// list.
    pub async fn search_all(&self, term: &str) -> Vec<StructuredDocument> {
        let term = term.trim();
        if term.is_empty() {
            tracing::error!("refusing to search for an empty term");
            return Vec::new();
        }

        let engine = match self.config.primary_engine() {
            Ok(engine) => engine,
            Err(err) => {
                tracing::error!(error = %err, "no valid search engine configured");
                return Vec::new();
            }
        };
        let primary = self.providers.primary(engine);

        let duckduckgo = Arc::clone(&self.providers.duckduckgo);
        let ddg_term = term.to_owned();
        let ddg_job =
            job::schedule(async move { search_or_empty(duckduckgo.as_ref(), &ddg_term).await });

        let this = self.clone();
        let primary_term = term.to_owned();
        let primary_job =
            job::schedule(async move { this.search_and_parse(primary, &primary_term).await });

        let results: Vec<StructuredDocument> = job::join_all(vec![ddg_job, primary_job])
            .await
            .into_iter()
            .flatten()
            .flatten()
            .filter(|doc| !doc.url().is_empty())
            .collect();

        tracing::info!(
            term,
            engine = %engine.provider(),
            count = results.len(),
            "search aggregated results"
        );
        results
    }

    /// Query `provider`, then enrich every hit concurrently under
    /// `max_search_duration`.
    ///
    /// Returns completed documents in provider order. Hits that already
    /// carry page text pass through without another fetch.
    pub async fn search_and_parse(
        &self,
        provider: Arc<dyn SearchProvider>,
        term: &str,
    ) -> Vec<StructuredDocument> {
        let raw = search_or_empty(provider.as_ref(), term).await;

        let jobs = raw
            .into_iter()
            .map(|document| {
                if document.is_enriched() {
                    return job::schedule(async move { document });
                }
                let enricher = Arc::clone(&self.enricher);
                let term = term.to_owned();
                self.limiter.schedule(async move {
                    enrich_or_fallback(enricher.as_ref(), document.candidate, &term).await
                })
            })
            .collect();

        let outcome = job::join_until(jobs, self.config.max_search_duration()).await;
        tracing::info!(
            term,
            provider = %provider.provider(),
            "parsing URLs yielded {} results, {} urls lost",
            outcome.completed.len(),
            outcome.abandoned
        );
        outcome.completed
    }

    /// Query Diffbot's global index alone. Never fails.
    pub async fn search_cache(&self, term: &str) -> Vec<StructuredDocument> {
        let term = term.trim();
        if term.is_empty() {
            tracing::error!("refusing to search the cache for an empty term");
            return Vec::new();
        }

        let mut results = search_or_empty(self.providers.diffbot.as_ref(), term).await;
        results.retain(|doc| !doc.url().is_empty());
        tracing::info!(term, count = results.len(), "cache search returned results");
        results
    }
}

impl fmt::Debug for SearchAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchAggregator")
            .field("config", &self.config)
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}
