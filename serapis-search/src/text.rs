//! Sentence segmentation, sentence cleaning, and term-variant discovery.
//!
//! Used by the providers that return text inline (DuckDuckGo, Diffbot), by
//! the page enricher, and by the detect stage for unenriched hits.

use std::collections::BTreeSet;

use crate::types::Sentence;

/// Words that end in a period without ending the sentence.
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "st", "jr", "sr", "vs", "etc", "e.g", "i.e", "no", "fig",
    "cf", "approx",
];

/// Longest suffix accepted on top of the term stem when collecting variants.
const MAX_VARIANT_SUFFIX: usize = 5;

/// Sentences and term variants extracted from one text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedText {
    pub sentences: Vec<Sentence>,
    pub variants: Vec<String>,
}

/// Segment `text` into sentences and collect the variants of `term` it uses.
pub fn extract(text: &str, term: &str) -> ExtractedText {
    ExtractedText {
        sentences: split_sentences(text).into_iter().map(Sentence::new).collect(),
        variants: find_variants(term, text),
    }
}

/// Split text into sentences, preserving their order.
///
/// Blank lines always end a sentence. Within a paragraph a sentence ends at
/// `.`, `!` or `?` followed by whitespace and then something that can open
/// a sentence (uppercase letter, digit, quote, or bracket), unless the
/// period closes a known abbreviation or a single initial.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();

    for paragraph in paragraphs(text) {
        let chars: Vec<(usize, char)> = paragraph.char_indices().collect();
        let mut start = 0;

        for (i, &(pos, ch)) in chars.iter().enumerate() {
            if !matches!(ch, '.' | '!' | '?') {
                continue;
            }
            match chars.get(i + 1) {
                Some(&(_, next)) if next.is_whitespace() => {}
                _ => continue,
            }
            let opener = chars[i + 1..]
                .iter()
                .map(|&(_, c)| c)
                .find(|c| !c.is_whitespace());
            let opens_sentence = opener.is_some_and(|c| {
                c.is_uppercase() || c.is_ascii_digit() || matches!(c, '"' | '\'' | '“' | '(' | '[')
            });
            if !opens_sentence || (ch == '.' && ends_with_abbreviation(&paragraph[start..pos])) {
                continue;
            }

            let end = pos + ch.len_utf8();
            push_trimmed(&mut sentences, &paragraph[start..end]);
            start = end;
        }

        push_trimmed(&mut sentences, &paragraph[start..]);
    }

    sentences
}

/// Normalise a sentence for matching: collapse whitespace, drop citation
/// markers such as `[1]` or `[citation needed]`, strip enclosing quotes.
pub fn clean_sentence(sentence: &str) -> String {
    let without_citations = strip_citations(sentence);
    let collapsed = without_citations
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace(" .", ".")
        .replace(" ,", ",");

    let quotes: &[char] = &['"', '“', '”'];
    let trimmed = collapsed.trim();
    match (trimmed.strip_prefix(quotes), trimmed.strip_suffix(quotes)) {
        (Some(_), Some(_)) if trimmed.chars().count() >= 2 => {
            trimmed.trim_matches(quotes).trim().to_owned()
        }
        _ => trimmed.to_owned(),
    }
}

/// Distinct lowercase words in `text` that are inflections of `term`.
///
/// Single words match on a stem (the term without a trailing `e` or `y` for
/// terms longer than three characters). Multi-word terms only match as a
/// whole phrase. Returned sorted.
pub fn find_variants(term: &str, text: &str) -> Vec<String> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return Vec::new();
    }
    let lower = text.to_lowercase();

    if term.contains(char::is_whitespace) {
        return if lower.contains(&term) { vec![term] } else { Vec::new() };
    }

    let stem = variant_stem(&term);
    let stem_len = stem.chars().count();
    let variants: BTreeSet<String> = lower
        .split(|c: char| !c.is_alphanumeric() && c != '-')
        .filter(|word| word.starts_with(stem))
        .filter(|word| word.chars().count() <= stem_len + MAX_VARIANT_SUFFIX)
        .map(str::to_owned)
        .collect();

    variants.into_iter().collect()
}

fn variant_stem(term: &str) -> &str {
    if term.chars().count() > 3 {
        if let Some(stem) = term.strip_suffix(['e', 'y']) {
            return stem;
        }
    }
    term
}

/// Group lines into paragraphs separated by blank lines.
fn paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n"));
    }

    paragraphs
}

fn ends_with_abbreviation(prefix: &str) -> bool {
    let Some(word) = prefix.split_whitespace().last() else {
        return false;
    };
    let word = word.trim_start_matches(['(', '"', '\'']);
    let mut chars = word.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return c.is_uppercase();
    }
    ABBREVIATIONS.contains(&word.to_lowercase().as_str())
}

fn strip_citations(sentence: &str) -> String {
    let mut result = String::with_capacity(sentence.len());
    let mut rest = sentence;

    while let Some(open) = rest.find('[') {
        let Some(close) = rest[open..].find(']').map(|offset| open + offset) else {
            break;
        };
        let inner = rest[open + 1..close].trim();
        let is_citation = (!inner.is_empty() && inner.chars().all(|c| c.is_ascii_digit()))
            || inner.eq_ignore_ascii_case("citation needed");
        result.push_str(&rest[..open]);
        if !is_citation {
            result.push_str(&rest[open..=close]);
        }
        rest = &rest[close + 1..];
    }
    result.push_str(rest);
    result
}

fn push_trimmed(sentences: &mut Vec<String>, candidate: &str) {
    let trimmed = candidate.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_owned());
    }
}
