//! Page enrichment: turn a candidate hit into a structured document.
//!
//! [`PageEnricher`] is the seam to whatever fetches and structures page
//! content. [`enrich_or_fallback`] is the job body used by the aggregator:
//! it never fails, substituting the unenriched candidate on any error.

use async_trait::async_trait;

use crate::config::SearchConfig;
use crate::content;
use crate::error::SearchError;
use crate::http;
use crate::text;
use crate::types::{CandidateResult, StructuredDocument};

/// Fetches and structures the page behind a candidate hit.
#[async_trait]
pub trait PageEnricher: Send + Sync {
    /// Produce the enriched document for `candidate`.
    ///
    /// # Errors
    ///
    /// Any fetch or extraction failure. Callers substitute the candidate.
    async fn enrich(
        &self,
        candidate: &CandidateResult,
        term: &str,
    ) -> Result<StructuredDocument, SearchError>;
}

/// Enrich `candidate`, falling back to it unmodified on failure.
pub async fn enrich_or_fallback(
    enricher: &dyn PageEnricher,
    candidate: CandidateResult,
    term: &str,
) -> StructuredDocument {
    match enricher.enrich(&candidate, term).await {
        Ok(document) => document,
        Err(err) => {
            tracing::error!(url = %candidate.url, error = %err, "failed to get page");
            StructuredDocument::unenriched(candidate)
        }
    }
}

/// Default enricher: HTTP GET, boilerplate stripping, sentence extraction.
pub struct HttpPageEnricher {
    client: reqwest::Client,
    max_chars: usize,
}

impl HttpPageEnricher {
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        Ok(Self {
            client: http::build_client(config)?,
            max_chars: content::DEFAULT_MAX_CHARS,
        })
    }

    /// Cap the characters of page text kept per document.
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    async fn fetch(&self, url: &str) -> Result<String, SearchError> {
        let response = self
            .client
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml")
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| http::request_error("page", &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Http(format!("page returned HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| SearchError::Http(format!("page read failed: {e}")))
    }
}

#[async_trait]
impl PageEnricher for HttpPageEnricher {
    async fn enrich(
        &self,
        candidate: &CandidateResult,
        term: &str,
    ) -> Result<StructuredDocument, SearchError> {
        tracing::trace!(url = %candidate.url, "fetching page");
        let html = self.fetch(&candidate.url).await?;
        let page = content::extract_page_with_limit(&html, self.max_chars)?;
        let extracted = text::extract(&page.text, term);

        let mut enriched = candidate.clone();
        if enriched.author.is_none() {
            enriched.author = page.author;
        }
        if enriched.title.trim().is_empty() && !page.title.is_empty() {
            enriched.title = page.title;
        }

        tracing::debug!(
            url = %candidate.url,
            words = page.word_count,
            sentences = extracted.sentences.len(),
            "page enriched"
        );
        Ok(StructuredDocument::enriched(
            enriched,
            page.text,
            extracted.sentences,
            extracted.variants,
        ))
    }
}
