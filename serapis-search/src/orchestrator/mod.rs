//! Search aggregation: concurrent provider fan-out and bounded enrichment.
//!
//! The aggregator queries DuckDuckGo and the configured primary engine
//! concurrently, enriches the primary engine's hits under a deadline, and
//! concatenates the two result lists. No deduplication, no ranking.

pub mod search;

pub use search::{Providers, SearchAggregator};
