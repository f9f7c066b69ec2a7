//! Trait definition for pluggable search providers.
//!
//! Each provider (DuckDuckGo, Google, Bing, Diffbot) implements
//! [`SearchProvider`]. Providers report failure through their `Result`;
//! [`search_or_empty`] is the boundary where a failure becomes "this
//! provider contributed nothing".

use async_trait::async_trait;

use crate::error::SearchError;
use crate::types::{Provider, StructuredDocument};

/// A search backend queried once per term.
///
/// Implementations perform exactly one outbound call with their own
/// authentication and query encoding, and map the provider's response shape
/// into documents. Providers whose API returns page text (DuckDuckGo instant
/// answers, Diffbot) return enriched documents; the others return
/// unenriched candidates.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Query the provider for `term`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] if the request fails, the response cannot be
    /// parsed, or the provider reports an error.
    async fn search(&self, term: &str) -> Result<Vec<StructuredDocument>, SearchError>;

    /// Which provider this implementation talks to.
    fn provider(&self) -> Provider;
}

/// Query `provider`, logging and swallowing any failure.
pub async fn search_or_empty(provider: &dyn SearchProvider, term: &str) -> Vec<StructuredDocument> {
    match provider.search(term).await {
        Ok(results) => results,
        Err(err) => {
            tracing::error!(
                provider = %provider.provider(),
                term,
                error = %err,
                "provider search failed"
            );
            Vec::new()
        }
    }
}
