//! Pipeline messages, stage names, and the hashslug identifier.
//!
//! A message is the JSON record handed from stage to stage. It is stored
//! under `"<stage>:<hashslug>"`, where `<stage>` names the stage that will
//! consume it next. Stages only ever add fields.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use serapis_search::StructuredDocument;
use serapis_search::types::null_as_default;

use crate::error::SerapisError;

/// Number of hex digits of the term digest kept in a hashslug.
const HASH_LEN: usize = 6;

/// Derive the stable identifier for `term`.
///
/// The slug is the term lowercased with punctuation removed and whitespace
/// runs joined by `-`; the suffix is the first six hex digits of the BLAKE3
/// digest of the trimmed term. `"l'esprit de l'escalier"` becomes
/// `lesprit-de-lescalier:` followed by six hex digits.
pub fn hashslug(term: &str) -> String {
    let term = term.trim();
    let lowered = term.to_lowercase();
    let slug = lowered
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .map(|word| word.chars().filter(|c| c.is_alphanumeric()).collect::<String>())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    let digest = blake3::hash(term.as_bytes()).to_hex();
    format!("{slug}:{}", &digest[..HASH_LEN])
}

/// The four pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Search,
    Detect,
    Rate,
    Save,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 4] = [Stage::Search, Stage::Detect, Stage::Rate, Stage::Save];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Detect => "detect",
            Self::Rate => "rate",
            Self::Save => "save",
        }
    }

    /// The stage that consumes this stage's output. `None` for save.
    pub fn next(&self) -> Option<Stage> {
        match self {
            Self::Search => Some(Self::Detect),
            Self::Detect => Some(Self::Rate),
            Self::Rate => Some(Self::Save),
            Self::Save => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = SerapisError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.name().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| {
                SerapisError::Pipeline(format!(
                    "unknown stage '{value}' (expected search, detect, rate or save)"
                ))
            })
    }
}

/// A pipeline message.
///
/// Fields this crate does not know about are kept in `extra` and written
/// back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The term being researched.
    #[serde(deserialize_with = "null_as_default")]
    pub word: String,
    /// Correlation id shared by every message about `word`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub hashslug: String,
    /// Aggregated search results, attached by the search stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urls: Option<Vec<StructuredDocument>>,
    /// When the search stage ran, RFC 3339 UTC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crawl_date: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    /// A seed message for `word` with its hashslug derived.
    pub fn new(word: impl Into<String>) -> Self {
        let word = word.into();
        Self {
            hashslug: hashslug(&word),
            word,
            urls: None,
            crawl_date: None,
            extra: Map::new(),
        }
    }

    /// Parse a message from JSON, deriving the hashslug if it is missing.
    ///
    /// # Errors
    ///
    /// Returns [`SerapisError::Json`] if `json` is not a message object.
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        let mut message: Message = serde_json::from_str(json)?;
        message.ensure_hashslug();
        Ok(message)
    }

    /// Derive the hashslug from `word` unless one is already set.
    pub fn ensure_hashslug(&mut self) {
        if self.hashslug.trim().is_empty() {
            self.hashslug = hashslug(&self.word);
        }
    }

    /// Storage key for this message as input to `stage`.
    pub fn key(&self, stage: Stage) -> String {
        format!("{stage}:{}", self.hashslug)
    }

    /// Iterate the url entries, if any.
    pub fn documents_mut(&mut self) -> impl Iterator<Item = &mut StructuredDocument> {
        self.urls.iter_mut().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hashslug_format() {
        let slug = hashslug("l'esprit de l'escalier");
        let (name, hash) = slug.split_once(':').expect("separator");
        assert_eq!(name, "lesprit-de-lescalier");
        assert_eq!(hash.len(), 6);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hashslug_is_deterministic_and_trims() {
        assert_eq!(hashslug("Procrastinate"), hashslug("  Procrastinate "));
        assert_ne!(hashslug("Procrastinate"), hashslug("procrastinate"));
        assert!(hashslug("Procrastinate").starts_with("procrastinate:"));
    }

    #[test]
    fn hashslug_collapses_whitespace_runs() {
        assert!(hashslug("ad   hoc\tquery").starts_with("ad-hoc-query:"));
        assert!(hashslug("well-being").starts_with("well-being:"));
    }

    #[test]
    fn stage_order_and_names() {
        assert_eq!(Stage::Search.next(), Some(Stage::Detect));
        assert_eq!(Stage::Detect.next(), Some(Stage::Rate));
        assert_eq!(Stage::Rate.next(), Some(Stage::Save));
        assert_eq!(Stage::Save.next(), None);
        assert_eq!("Detect".parse::<Stage>().expect("parse"), Stage::Detect);
        assert!("crawl".parse::<Stage>().is_err());
    }

    #[test]
    fn key_format() {
        let mut message = Message::new("dither");
        message.hashslug = "dither:abc123".into();
        assert_eq!(message.key(Stage::Rate), "rate:dither:abc123");
    }

    #[test]
    fn seed_hashslug_is_respected() {
        let message = Message::from_json(r#"{"word": "dither", "hashslug": "custom:000000"}"#)
            .expect("parse");
        assert_eq!(message.hashslug, "custom:000000");
    }

    #[test]
    fn missing_hashslug_is_derived() {
        let message = Message::from_json(r#"{"word": "dither"}"#).expect("parse");
        assert_eq!(message.hashslug, hashslug("dither"));
    }

    #[test]
    fn unknown_fields_survive_roundtrip() {
        let message = Message::from_json(
            r#"{"word": "dither", "hashslug": "dither:111111", "requested_by": "lexicographer", "priority": 3}"#,
        )
        .expect("parse");
        let value = serde_json::to_value(&message).expect("serialize");
        assert_eq!(
            value,
            json!({
                "word": "dither",
                "hashslug": "dither:111111",
                "requested_by": "lexicographer",
                "priority": 3
            })
        );
    }

    #[test]
    fn null_fields_are_accepted() {
        let message = Message::from_json(
            r#"{"word": "dither", "hashslug": null, "crawl_date": null,
                "urls": [{"url": "https://a.example/", "title": null,
                          "search_provider": "diffbot", "author": null, "doc": null}]}"#,
        )
        .expect("parse");
        assert_eq!(message.hashslug, hashslug("dither"));
        let urls = message.urls.expect("urls");
        assert_eq!(urls[0].candidate.title, "");
        assert!(urls[0].candidate.author.is_none());
        assert!(urls[0].doc.is_none());
    }

    #[test]
    fn nested_unknown_fields_survive_roundtrip() {
        let input = json!({
            "word": "dither",
            "hashslug": "dither:222222",
            "urls": [{
                "url": "https://a.example/",
                "title": "A",
                "search_provider": "google",
                "features": {"pos": "verb"},
                "sentences": [{"s": "To dither.", "s_clean": "To dither.", "tag": "x"}]
            }]
        });
        let message = Message::from_json(&input.to_string()).expect("parse");
        assert_eq!(serde_json::to_value(&message).expect("serialize"), input);
    }

    #[test]
    fn non_object_is_json_error() {
        assert!(matches!(
            Message::from_json("[1, 2]"),
            Err(SerapisError::Json(_))
        ));
    }
}
