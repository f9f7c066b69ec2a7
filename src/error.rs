//! Error types for the serapis pipeline.

/// Top-level error type for configuration, storage, and pipeline stages.
#[derive(Debug, thiserror::Error)]
pub enum SerapisError {
    /// Configuration file could not be parsed, serialized, or validated.
    #[error("config error: {0}")]
    Config(String),

    /// A message store rejected a read or write.
    #[error("storage error: {0}")]
    Storage(String),

    /// A message could not be processed by a pipeline stage.
    #[error("pipeline error: {0}")]
    Pipeline(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Message (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Search aggregation setup error.
    #[error("search error: {0}")]
    Search(#[from] serapis_search::SearchError),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, SerapisError>;
