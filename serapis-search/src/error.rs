//! Error types for the serapis-search crate.
//!
//! None of these ever escape [`crate::SearchAggregator`]: provider and
//! enrichment failures are logged at their call site and replaced with a
//! fallback value. They exist so each boundary returns an explicit result.
//! No credentials appear in error messages.

/// Errors that can occur while querying providers or enriching pages.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// An HTTP request to a provider or page failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A provider response or page body could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid search configuration.
    #[error("config error: {0}")]
    Config(String),

    /// A provider rejected the request or reported an error in its payload.
    #[error("provider error: {0}")]
    Provider(String),

    /// A bounded operation did not finish before its deadline.
    #[error("timed out: {0}")]
    Timeout(String),
}

/// Convenience type alias for serapis-search results.
pub type Result<T> = std::result::Result<T, SearchError>;
