//! Serapis: search aggregation feeding a staged definition-mining pipeline.
//!
//! A term travels through four stages, each persisting its output before
//! the next one picks it up:
//!
//! search → detect → rate → save
//!
//! # Architecture
//!
//! - **Search**: aggregates DuckDuckGo and a primary engine via `serapis-search`
//! - **Detect**: segments page text, scores sentences, tags lexical patterns
//! - **Rate**: assigns a rating to each sentence
//! - **Save**: hands the final record to the result archive
//!
//! Messages are stored under `"<stage>:<hashslug>"` in a [`store::MessageStore`],
//! either a local directory or an HTTP object store.

pub mod annotate;
pub mod config;
pub mod error;
pub mod message;
pub mod store;
pub mod tasks;

pub use config::SerapisConfig;
pub use error::{Result, SerapisError};
pub use message::{Message, Stage, hashslug};
pub use tasks::{TaskPipeline, TermSearch};
