//! Configuration types for serapis.
//!
//! All sections use `#[serde(default)]`, so a config file only needs to
//! name the values it changes. The file is TOML:
//!
//! ```toml
//! [search]
//! search_engine = "google"
//! max_search_duration = 10.0
//!
//! [search.credentials]
//! google = "..."
//!
//! [storage]
//! save_messages = false
//! local_s3 = "local_s3"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use serapis_search::SearchConfig;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SerapisConfig {
    /// Search aggregation settings, including provider credentials.
    pub search: SearchConfig,
    /// Where stage messages and final results are written.
    pub storage: StorageConfig,
    /// Detect-stage annotation settings.
    pub annotate: AnnotateConfig,
}

/// Message storage configuration.
///
/// With `save_messages` off (the default) messages go to files under
/// `local_s3`; with it on they are `PUT` to an object store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Write messages to the remote object store instead of `local_s3`.
    pub save_messages: bool,
    /// Bucket for stage messages.
    pub bucket: String,
    /// Bucket for final results written by the save stage.
    pub result_bucket: String,
    /// Directory standing in for the object store when `save_messages` is off.
    pub local_s3: PathBuf,
    /// Object store base URL, e.g. `https://s3.example.com`.
    pub endpoint: String,
    /// Optional bearer token sent with every object-store request.
    pub token: Option<String>,
    /// Per-request timeout for the object store, in seconds.
    pub timeout_seconds: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            save_messages: false,
            bucket: "serapis-messages".to_owned(),
            result_bucket: "serapis-results".to_owned(),
            local_s3: PathBuf::from("local_s3"),
            endpoint: String::new(),
            token: None,
            timeout_seconds: 30,
        }
    }
}

/// A named lexical rule matched against cleaned sentences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRule {
    pub name: String,
    /// Regular expression, matched case-insensitively.
    pub pattern: String,
}

impl PatternRule {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
        }
    }
}

/// Detect-stage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotateConfig {
    /// Lexical rules tagged onto each sentence, in match order.
    pub patterns: Vec<PatternRule>,
}

impl Default for AnnotateConfig {
    fn default() -> Self {
        Self {
            patterns: vec![
                PatternRule::new("is_a", r"\b(?:is|are|was|were)\s+(?:a|an|the)\b"),
                PatternRule::new("means", r"\bmeans?\b"),
                PatternRule::new("refers_to", r"\brefers?\s+to\b"),
                PatternRule::new("defined_as", r"\b(?:is|are)\s+defined\s+as\b|\bdefinition\s+of\b"),
                PatternRule::new("synonym", r"\b(?:synonym(?:ous)?\s+(?:of|with|for)|also\s+(?:called|known\s+as))\b"),
            ],
        }
    }
}

impl SerapisConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::SerapisError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::SerapisError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check values that would make every run fail.
    ///
    /// The search engine name is not checked here; an unsupported engine
    /// degrades to empty search results at run time.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::SerapisError::Config`] describing the first
    /// invalid value.
    pub fn validate(&self) -> crate::error::Result<()> {
        self.search
            .validate()
            .map_err(|e| crate::error::SerapisError::Config(e.to_string()))?;
        if self.storage.save_messages && self.storage.endpoint.trim().is_empty() {
            return Err(crate::error::SerapisError::Config(
                "storage.endpoint is required when save_messages is enabled".into(),
            ));
        }
        if self.storage.bucket.trim().is_empty() {
            return Err(crate::error::SerapisError::Config(
                "storage.bucket must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Returns the default config file path: `~/.config/serapis/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("serapis").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("serapis")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/serapis-config/config.toml")
        }
    }
}
