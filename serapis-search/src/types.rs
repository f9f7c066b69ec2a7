//! Core types for provider hits, enriched documents, and engine selection.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::SearchError;

/// The external search providers serapis knows how to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// DuckDuckGo instant-answer API.
    DuckDuckGo,
    /// Google Custom Search JSON API.
    Google,
    /// Bing search API (Azure datamarket).
    Bing,
    /// Diffbot global index, used as a cache of already-extracted pages.
    Diffbot,
}

impl Provider {
    /// Returns the stable lowercase name written into `search_provider`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::DuckDuckGo => "duckduckgo",
            Self::Google => "google",
            Self::Bing => "bing",
            Self::Diffbot => "diffbot",
        }
    }

    /// Returns the human-readable label used in log lines.
    pub fn label(&self) -> &'static str {
        match self {
            Self::DuckDuckGo => "DuckDuckGo",
            Self::Google => "Google",
            Self::Bing => "Bing",
            Self::Diffbot => "Diffbot",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The engines that may be configured as the primary (enriched) source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimaryEngine {
    /// Bing search API.
    Bing,
    /// Google Custom Search.
    Google,
}

impl PrimaryEngine {
    /// The provider backing this engine.
    pub fn provider(&self) -> Provider {
        match self {
            Self::Bing => Provider::Bing,
            Self::Google => Provider::Google,
        }
    }
}

impl FromStr for PrimaryEngine {
    type Err = SearchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bing" => Ok(Self::Bing),
            "google" => Ok(Self::Google),
            _ => Err(SearchError::Config(format!(
                "invalid search engine '{value}' (expected 'bing' or 'google')"
            ))),
        }
    }
}

/// Deserialize a field, reading an explicit `null` as the type's default.
///
/// Upstream payloads and stored messages write `null` for text they do not
/// have; `#[serde(default)]` alone only covers a missing key.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A raw hit as returned by a provider, before any page enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    /// Address of the hit.
    #[serde(deserialize_with = "null_as_default")]
    pub url: String,
    /// Title reported by the provider.
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    /// Which provider produced the hit.
    pub search_provider: Provider,
    /// Provider-supplied preview text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Publication date, RFC 3339 when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Upstream source name (DuckDuckGo instant answers only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl CandidateResult {
    /// Create a hit with only the mandatory fields set.
    pub fn new(url: impl Into<String>, title: impl Into<String>, provider: Provider) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            search_provider: provider,
            summary: None,
            author: None,
            date: None,
            source: None,
        }
    }

    /// Set the preview text.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }
}

/// One sentence of a document.
///
/// `s` and `s_clean` are set at extraction time; the remaining fields are
/// attached by later pipeline stages and stay absent until then.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentence {
    /// Sentence text as it appeared in the document.
    #[serde(deserialize_with = "null_as_default")]
    pub s: String,
    /// Normalised text used for classification and rule matching.
    #[serde(default, deserialize_with = "null_as_default")]
    pub s_clean: String,
    /// Probability-like score that the sentence is a definition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frd: Option<f64>,
    /// Names of the lexical rules matched by `s_clean`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patterns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<i32>,
    /// Fields attached by other producers, written back unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Sentence {
    /// Build a sentence from raw text, deriving its cleaned form.
    pub fn new(raw: impl Into<String>) -> Self {
        let s = raw.into();
        let s_clean = crate::text::clean_sentence(&s);
        Self {
            s,
            s_clean,
            frd: None,
            patterns: None,
            rating: None,
            extra: Map::new(),
        }
    }
}

/// A [`CandidateResult`] plus the structured page content, when enrichment
/// succeeded.
///
/// Serialises as a single flat object; enrichment fields are omitted when
/// absent, so an unenriched document is indistinguishable from its candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredDocument {
    #[serde(flatten)]
    pub candidate: CandidateResult,
    /// Full extracted text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    /// Sentences of `doc`, in document order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentences: Option<Vec<Sentence>>,
    /// Inflected forms of the search term found in `doc`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variants: Option<Vec<String>>,
    /// Readability score, attached by the detect stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readability: Option<f64>,
    /// Fields attached by other producers, written back unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StructuredDocument {
    /// Wrap a candidate without adding any enrichment fields.
    pub fn unenriched(candidate: CandidateResult) -> Self {
        Self {
            candidate,
            doc: None,
            sentences: None,
            variants: None,
            readability: None,
            extra: Map::new(),
        }
    }

    /// Attach extracted text, sentences, and variants to a candidate.
    pub fn enriched(
        candidate: CandidateResult,
        doc: String,
        sentences: Vec<Sentence>,
        variants: Vec<String>,
    ) -> Self {
        Self {
            candidate,
            doc: Some(doc),
            sentences: Some(sentences),
            variants: Some(variants),
            readability: None,
            extra: Map::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.candidate.url
    }

    /// Whether page content was attached.
    pub fn is_enriched(&self) -> bool {
        self.doc.is_some()
    }
}

impl From<CandidateResult> for StructuredDocument {
    fn from(candidate: CandidateResult) -> Self {
        Self::unenriched(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_names_are_lowercase() {
        assert_eq!(Provider::DuckDuckGo.name(), "duckduckgo");
        assert_eq!(Provider::Google.name(), "google");
        assert_eq!(Provider::Bing.name(), "bing");
        assert_eq!(Provider::Diffbot.name(), "diffbot");
    }

    #[test]
    fn provider_display_uses_label() {
        assert_eq!(Provider::DuckDuckGo.to_string(), "DuckDuckGo");
        assert_eq!(Provider::Diffbot.to_string(), "Diffbot");
    }

    #[test]
    fn provider_serialises_as_name() {
        let json = serde_json::to_string(&Provider::DuckDuckGo).expect("serialize");
        assert_eq!(json, "\"duckduckgo\"");
    }

    #[test]
    fn primary_engine_parses_case_insensitively() {
        assert_eq!("google".parse::<PrimaryEngine>().ok(), Some(PrimaryEngine::Google));
        assert_eq!(" Bing ".parse::<PrimaryEngine>().ok(), Some(PrimaryEngine::Bing));
    }

    #[test]
    fn primary_engine_rejects_unknown_values() {
        let err = "duckduckgo".parse::<PrimaryEngine>().unwrap_err();
        assert!(err.to_string().contains("duckduckgo"));
        assert!("".parse::<PrimaryEngine>().is_err());
    }

    #[test]
    fn unenriched_document_serialises_like_candidate() {
        let candidate = CandidateResult::new("https://a.com", "A", Provider::Google)
            .with_summary("preview");
        let from_candidate = serde_json::to_value(&candidate).expect("serialize");
        let from_document =
            serde_json::to_value(StructuredDocument::unenriched(candidate)).expect("serialize");
        assert_eq!(from_candidate, from_document);
        assert!(from_document.get("doc").is_none());
        assert!(from_document.get("date").is_none());
    }

    #[test]
    fn enriched_document_is_flat() {
        let doc = StructuredDocument::enriched(
            CandidateResult::new("https://a.com", "A", Provider::Bing),
            "Full text.".into(),
            vec![Sentence::new("Full text.")],
            vec!["text".into()],
        );
        let value = serde_json::to_value(&doc).expect("serialize");
        assert_eq!(value["url"], "https://a.com");
        assert_eq!(value["search_provider"], "bing");
        assert_eq!(value["doc"], "Full text.");
        assert_eq!(value["sentences"][0]["s"], "Full text.");
        assert!(value["sentences"][0].get("frd").is_none());

        let decoded: StructuredDocument = serde_json::from_value(value).expect("deserialize");
        assert_eq!(decoded, doc);
    }

    #[test]
    fn unknown_fields_survive_a_round_trip() {
        let input = serde_json::json!({
            "url": "https://a.com",
            "title": "A",
            "search_provider": "google",
            "features": {"pos": "verb"},
            "sentences": [{"s": "A verb.", "s_clean": "A verb.", "tag": "x"}]
        });
        let doc: StructuredDocument = serde_json::from_value(input.clone()).expect("deserialize");
        assert_eq!(doc.extra.get("features"), Some(&serde_json::json!({"pos": "verb"})));
        assert!(doc.candidate.summary.is_none());
        let sentence = &doc.sentences.as_ref().expect("sentences")[0];
        assert_eq!(sentence.extra.get("tag"), Some(&serde_json::json!("x")));
        assert_eq!(serde_json::to_value(&doc).expect("serialize"), input);
    }

    #[test]
    fn null_text_fields_read_as_empty() {
        let doc: StructuredDocument = serde_json::from_str(
            r#"{"url": "https://a.com", "title": null, "search_provider": "bing",
                "summary": null, "sentences": [{"s": "Hi.", "s_clean": null}]}"#,
        )
        .expect("deserialize");
        assert_eq!(doc.candidate.title, "");
        assert!(doc.candidate.summary.is_none());
        assert_eq!(doc.sentences.expect("sentences")[0].s_clean, "");
    }

    #[test]
    fn sentence_new_derives_clean_text() {
        let sentence = Sentence::new("  A   spaced   sentence. ");
        assert_eq!(sentence.s_clean, "A spaced sentence.");
        assert!(sentence.rating.is_none());
    }
}
