//! # serapis-search
//!
//! Concurrent multi-provider search aggregation for serapis.
//!
//! Given a term, this crate queries the DuckDuckGo instant-answer API and one
//! primary engine (Google Custom Search or Bing) at the same time, fetches
//! and structures the pages behind the primary engine's hits, and returns
//! everything as a flat list of [`StructuredDocument`]s.
//!
//! ## Design
//!
//! - Fork-join over tokio tasks ([`job`]) with write-once results, deadline
//!   joins, and cancellation of abandoned work
//! - Page enrichment runs under a hard deadline; hits still being fetched
//!   when it passes are dropped and counted as lost
//! - Graceful degradation: a failing provider contributes nothing, a failing
//!   page fetch keeps the unenriched hit, and aggregation itself never fails
//! - Google and Bing hits are filtered by [`qualify`] before enrichment
//! - Diffbot is available separately as a cache of already-extracted pages
//!
//! Search terms are logged at info level in count lines only; request
//! detail is logged at trace.

pub mod config;
pub mod content;
pub mod engine;
pub mod engines;
pub mod enrich;
pub mod error;
pub mod http;
pub mod job;
pub mod orchestrator;
pub mod qualify;
pub mod text;
pub mod types;

pub use config::{Credentials, Endpoints, SearchConfig};
pub use engine::SearchProvider;
pub use enrich::{HttpPageEnricher, PageEnricher};
pub use error::{Result, SearchError};
pub use orchestrator::{Providers, SearchAggregator};
pub use qualify::{qualify_search_result, LanguageDetector, Qualifier, StopwordDetector};
pub use types::{CandidateResult, PrimaryEngine, Provider, Sentence, StructuredDocument};

/// Aggregate results for `term` with the real HTTP providers.
///
/// Convenience wrapper that builds a [`SearchAggregator`] for a single call.
///
/// # Errors
///
/// Returns [`SearchError::Config`] if `config` is invalid, or
/// [`SearchError::Http`] if an HTTP client cannot be built. Provider and
/// enrichment failures never surface here.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> serapis_search::Result<()> {
/// let config = serapis_search::SearchConfig::default();
/// let results = serapis_search::search_all("procrastinate", config).await?;
/// for result in &results {
///     println!("{}: {}", result.candidate.title, result.url());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn search_all(term: &str, config: SearchConfig) -> Result<Vec<StructuredDocument>> {
    let aggregator = SearchAggregator::from_config(config)?;
    Ok(aggregator.search_all(term).await)
}
