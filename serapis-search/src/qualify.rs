//! Heuristic filter deciding whether a provider hit is worth enriching.
//!
//! Only the Google and Bing adapters apply it. DuckDuckGo and Diffbot hits
//! pass through unfiltered.

use std::sync::Arc;

use crate::config::SearchConfig;

/// Decides whether a piece of text is written in English.
pub trait LanguageDetector: Send + Sync {
    fn is_english(&self, text: &str) -> bool;
}

/// Frequent English function words.
const ENGLISH_STOPWORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be", "been",
    "but", "by", "can", "could", "do", "does", "for", "from", "had", "has", "have", "he", "her",
    "his", "how", "if", "in", "into", "is", "it", "its", "may", "more", "most", "not", "of",
    "on", "one", "or", "other", "our", "out", "she", "so", "some", "such", "than", "that",
    "the", "their", "them", "then", "there", "these", "they", "this", "to", "up", "was", "we",
    "were", "what", "when", "which", "who", "will", "with", "would", "you", "your",
];

/// Texts with fewer words than this are too short to judge and pass.
const MIN_WORDS_TO_JUDGE: usize = 3;

/// Minimum share of stop words for a text to count as English.
const MIN_STOPWORD_RATIO: f64 = 0.1;

/// Maximum share of non-ASCII letters for a text to count as English.
const MAX_NON_ASCII_RATIO: f64 = 0.2;

/// Stop-word ratio heuristic. Cheap and dependency-free; good enough to
/// reject obviously foreign snippets.
#[derive(Debug, Clone, Copy, Default)]
pub struct StopwordDetector;

impl LanguageDetector for StopwordDetector {
    fn is_english(&self, text: &str) -> bool {
        let letters: Vec<char> = text.chars().filter(|c| c.is_alphabetic()).collect();
        if letters.is_empty() {
            return true;
        }
        let non_ascii = letters.iter().filter(|c| !c.is_ascii()).count();
        if non_ascii as f64 / letters.len() as f64 > MAX_NON_ASCII_RATIO {
            return false;
        }

        let words: Vec<String> = text
            .split(|c: char| !c.is_alphabetic() && c != '\'')
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();
        if words.len() < MIN_WORDS_TO_JUDGE {
            return true;
        }

        let stopwords = words
            .iter()
            .filter(|w| ENGLISH_STOPWORDS.contains(&w.as_str()))
            .count();
        stopwords as f64 / words.len() as f64 >= MIN_STOPWORD_RATIO
    }
}

/// Heuristically determine whether a hit is worth enriching.
///
/// Returns `false` if the URL contains an excluded domain, if `text` is
/// non-empty and not English, or if the URL path ends in `.pdf`. The date is
/// accepted for future recency rules and does not affect the outcome.
pub fn qualify_search_result(
    url: &str,
    text: &str,
    _date: Option<&str>,
    exclude_domains: &[String],
    detector: &dyn LanguageDetector,
) -> bool {
    if exclude_domains
        .iter()
        .any(|domain| !domain.is_empty() && url.contains(domain.as_str()))
    {
        return false;
    }
    if !text.is_empty() && !detector.is_english(text) {
        tracing::info!(text, "excluded non-English result");
        return false;
    }
    !url_path(url).ends_with(".pdf")
}

/// The path component of `url`, without query or fragment.
fn url_path(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_owned(),
        Err(_) => {
            let end = url.find(['?', '#']).unwrap_or(url.len());
            url[..end].to_owned()
        }
    }
}

/// A [`qualify_search_result`] bound to a configuration.
#[derive(Clone)]
pub struct Qualifier {
    exclude_domains: Vec<String>,
    detector: Arc<dyn LanguageDetector>,
}

impl Qualifier {
    pub fn new(exclude_domains: Vec<String>, detector: Arc<dyn LanguageDetector>) -> Self {
        Self {
            exclude_domains,
            detector,
        }
    }

    /// Qualifier using the configured excluded domains and [`StopwordDetector`].
    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(config.exclude_domains.clone(), Arc::new(StopwordDetector))
    }

    pub fn qualify(&self, url: &str, text: &str, date: Option<&str>) -> bool {
        qualify_search_result(
            url,
            text,
            date,
            &self.exclude_domains,
            self.detector.as_ref(),
        )
    }
}

impl std::fmt::Debug for Qualifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Qualifier")
            .field("exclude_domains", &self.exclude_domains)
            .finish_non_exhaustive()
    }
}
