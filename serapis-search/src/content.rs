//! HTML to readable text: strips boilerplate and keeps the main content.
//!
//! This is the default extraction behind [`crate::enrich::HttpPageEnricher`].
//! Pages with no extractable text surface as a parse error and the enricher
//! falls back to the unenriched hit.

use crate::error::{Result, SearchError};
use scraper::{Html, Selector};

/// Maximum characters of page text kept per document.
pub const DEFAULT_MAX_CHARS: usize = 100_000;

/// Elements removed together with everything inside them.
const BOILERPLATE_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "aside", "noscript", "svg", "iframe",
];

/// Candidate content roots, most specific first.
const CONTENT_ROOTS: &[&str] = &["article", "main", "[role=\"main\"]", "body"];

/// Readable text and metadata pulled out of one HTML page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    pub title: String,
    /// Main content with whitespace normalised; paragraphs separated by
    /// blank lines.
    pub text: String,
    /// Value of `<meta name="author">`, if present and non-empty.
    pub author: Option<String>,
    pub word_count: usize,
}

/// Extract readable text from raw HTML.
///
/// # Errors
///
/// Returns [`SearchError::Parse`] if no text remains once boilerplate is
/// removed.
pub fn extract_page(html: &str) -> Result<PageText> {
    extract_page_with_limit(html, DEFAULT_MAX_CHARS)
}

/// Same as [`extract_page`] with a custom character limit.
///
/// # Errors
///
/// Returns [`SearchError::Parse`] if no text remains once boilerplate is
/// removed.
pub fn extract_page_with_limit(html: &str, max_chars: usize) -> Result<PageText> {
    let document = Html::parse_document(&strip_boilerplate(html));

    let text = normalise_whitespace(&main_text(&document));
    if text.is_empty() {
        return Err(SearchError::Parse("no extractable content found".into()));
    }
    let text = truncate_chars(&text, max_chars);

    Ok(PageText {
        title: first_text(&document, "title"),
        author: meta_content(&document, "author"),
        word_count: text.split_whitespace().count(),
        text,
    })
}

fn first_text(document: &Html, selector: &str) -> String {
    let Ok(selector) = Selector::parse(selector) else {
        return String::new();
    };
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_owned())
        .unwrap_or_default()
}

fn meta_content(document: &Html, name: &str) -> Option<String> {
    let selector = Selector::parse(&format!("meta[name=\"{name}\"]")).ok()?;
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("content"))
        .map(str::trim)
        .find(|content| !content.is_empty())
        .map(str::to_owned)
}

/// Text of the first non-empty content root.
fn main_text(document: &Html) -> String {
    CONTENT_ROOTS
        .iter()
        .filter_map(|root| Selector::parse(root).ok())
        .find_map(|selector| {
            let element = document.select(&selector).next()?;
            let text = element.text().collect::<Vec<_>>().join(" ");
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_owned())
        })
        .unwrap_or_default()
}

fn strip_boilerplate(html: &str) -> String {
    BOILERPLATE_TAGS
        .iter()
        .fold(html.to_owned(), |acc, tag| strip_element(&acc, tag))
}

/// Remove every `<tag ...>...</tag>` span, matching the tag name
/// case-insensitively and only as a whole name (`<nav>` but not `<navbar>`).
fn strip_element(html: &str, tag: &str) -> String {
    // ASCII lowering keeps byte offsets aligned with `html`.
    let lower = html.to_ascii_lowercase();
    let open = format!("<{tag}");
    let close = format!("</{tag}>");

    let mut out = String::with_capacity(html.len());
    let mut pos = 0;

    while let Some(offset) = lower[pos..].find(&open) {
        let start = pos + offset;
        let name_end = start + open.len();
        let whole_name = lower
            .as_bytes()
            .get(name_end)
            .map_or(true, |&b| b == b'>' || b == b'/' || b.is_ascii_whitespace());
        if !whole_name {
            out.push_str(&html[pos..name_end]);
            pos = name_end;
            continue;
        }

        out.push_str(&html[pos..start]);
        pos = match lower[start..].find(&close) {
            Some(offset) => start + offset + close.len(),
            None => lower[start..]
                .find('>')
                .map_or(html.len(), |offset| start + offset + 1),
        };
    }

    out.push_str(&html[pos..]);
    out
}

/// Collapse runs of spaces to one and runs of blank lines to a single blank
/// line; trim every line.
fn normalise_whitespace(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut blank_run = false;

    for line in text.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            if !blank_run && !lines.is_empty() {
                lines.push(String::new());
            }
            blank_run = true;
        } else {
            lines.push(collapsed);
            blank_run = false;
        }
    }

    lines.join("\n").trim().to_owned()
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => text[..cut].trim_end().to_owned(),
        None => text.to_owned(),
    }
}
