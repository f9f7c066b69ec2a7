//! Search provider implementations.
//!
//! Each module provides a struct implementing [`crate::engine::SearchProvider`]
//! against one provider's JSON API. Endpoints come from
//! [`crate::config::Endpoints`] so tests can point them at a mock server.

pub mod bing;
pub mod diffbot;
pub mod duckduckgo;
pub mod google;

pub use bing::BingProvider;
pub use diffbot::DiffbotProvider;
pub use duckduckgo::DuckDuckGoProvider;
pub use google::GoogleProvider;
