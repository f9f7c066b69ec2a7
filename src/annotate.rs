//! Sentence annotators used by the detect stage.
//!
//! Each concern sits behind a small trait so a trained model can replace the
//! heuristic default:
//!
//! - [`SentenceClassifier`] scores how likely a sentence is to define the term
//! - [`ReadabilityScorer`] scores a whole document
//! - [`PatternMatcher`] tags a cleaned sentence with lexical rule names

use regex::{Regex, RegexBuilder};

use serapis_search::Sentence;

use crate::config::PatternRule;
use crate::error::{Result, SerapisError};

/// Scores a sentence's likelihood of being a definition of `term`.
pub trait SentenceClassifier: Send + Sync {
    /// Returns a probability-like score in `[0, 1]`.
    fn classify(&self, sentence: &Sentence, term: &str, variants: &[String]) -> f64;
}

/// Scores the readability of a document's text.
pub trait ReadabilityScorer: Send + Sync {
    fn score(&self, text: &str) -> f64;
}

/// Matches named lexical rules against a cleaned sentence.
pub trait PatternMatcher: Send + Sync {
    /// Names of the matching rules, in rule order.
    fn matches(&self, sentence: &str) -> Vec<String>;
}

/// Phrases that typically introduce a definition.
const DEFINITION_CUES: &[&str] = &[
    " is a ",
    " is an ",
    " is the ",
    " are ",
    " means ",
    " mean ",
    " refers to ",
    " defined as ",
    " is used to ",
    " describes ",
    " synonym ",
    " also known as ",
];

/// Heuristic classifier: mentions of the term plus definitional cues.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefinitionCueClassifier;

impl SentenceClassifier for DefinitionCueClassifier {
    fn classify(&self, sentence: &Sentence, term: &str, variants: &[String]) -> f64 {
        let lowered = format!(" {} ", sentence.s_clean.to_lowercase());
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric() && c != '\'' && c != '-')
            .filter(|w| !w.is_empty())
            .collect();
        if words.is_empty() {
            return 0.0;
        }

        let term = term.trim().to_lowercase();
        let forms: Vec<String> = std::iter::once(term.clone())
            .chain(variants.iter().map(|v| v.to_lowercase()))
            .filter(|form| !form.is_empty())
            .collect();

        let mentions = forms.iter().any(|form| {
            if form.contains(' ') {
                lowered.contains(form.as_str())
            } else {
                words.contains(&form.as_str())
            }
        });
        let leads = forms.iter().any(|form| {
            lowered
                .trim_start()
                .trim_start_matches(|c: char| !c.is_alphanumeric())
                .starts_with(form.as_str())
        });
        let cue = DEFINITION_CUES.iter().any(|cue| lowered.contains(cue));

        let mut score = 0.0;
        if mentions {
            score += 0.4;
        }
        if cue {
            score += 0.4;
        }
        if mentions && leads {
            score += 0.2;
        }
        if words.len() < 4 {
            score *= 0.5;
        }
        f64::clamp(score, 0.0, 1.0)
    }
}

/// Flesch reading ease with a vowel-group syllable estimate.
#[derive(Debug, Clone, Copy, Default)]
pub struct FleschScorer;

impl ReadabilityScorer for FleschScorer {
    fn score(&self, text: &str) -> f64 {
        let words: Vec<&str> = text
            .split_whitespace()
            .filter(|w| w.chars().any(char::is_alphabetic))
            .collect();
        if words.is_empty() {
            return 0.0;
        }

        let sentences = text
            .split(['.', '!', '?'])
            .filter(|s| s.chars().any(char::is_alphabetic))
            .count()
            .max(1);
        let syllables: usize = words.iter().map(|w| count_syllables(w)).sum();

        let words_per_sentence = words.len() as f64 / sentences as f64;
        let syllables_per_word = syllables as f64 / words.len() as f64;
        206.835 - 1.015 * words_per_sentence - 84.6 * syllables_per_word
    }
}

fn count_syllables(word: &str) -> usize {
    let word: Vec<char> = word
        .chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_lowercase)
        .collect();
    let is_vowel = |c: char| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');

    let mut count = 0;
    let mut previous_vowel = false;
    for &c in &word {
        let vowel = is_vowel(c);
        if vowel && !previous_vowel {
            count += 1;
        }
        previous_vowel = vowel;
    }
    // Silent final e, as in "make".
    if count > 1 && word.last() == Some(&'e') && !word.ends_with(&['l', 'e']) {
        count -= 1;
    }
    count.max(1)
}

/// Case-insensitive regular-expression rules.
#[derive(Debug, Clone)]
pub struct RuleMatcher {
    rules: Vec<(String, Regex)>,
}

impl RuleMatcher {
    /// Compile `rules`.
    ///
    /// # Errors
    ///
    /// Returns [`SerapisError::Config`] naming the first rule whose pattern
    /// does not compile.
    pub fn new(rules: &[PatternRule]) -> Result<Self> {
        let rules = rules
            .iter()
            .map(|rule| {
                RegexBuilder::new(&rule.pattern)
                    .case_insensitive(true)
                    .build()
                    .map(|regex| (rule.name.clone(), regex))
                    .map_err(|e| {
                        SerapisError::Config(format!("invalid pattern rule '{}': {e}", rule.name))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }
}

impl PatternMatcher for RuleMatcher {
    fn matches(&self, sentence: &str) -> Vec<String> {
        self.rules
            .iter()
            .filter(|(_, regex)| regex.is_match(sentence))
            .map(|(name, _)| name.clone())
            .collect()
    }
}
