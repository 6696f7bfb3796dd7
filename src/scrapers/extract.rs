//! Text-matching primitives for loosely structured press-release HTML.
//!
//! CDPH releases state their numbers in prose whose markup changes from one
//! release to the next: numbers wrapped in `<strong>` or `<span>`, lines
//! separated by `<br>`, non-breaking spaces between words. These helpers
//! reduce every text-bearing element to a single normalized line so that
//! plain regexes can be run against it.
//!
//! # Composition
//!
//! An element's composed text is built from its children:
//!
//! - `<span>` is transparent; its children count as the parent's own
//! - text nodes contribute their text
//! - a child element contributes its text only when it wraps exactly one
//!   string (`<strong>1,234</strong>`), `<br>` contributes a space, anything
//!   else contributes nothing
//!
//! The result is NFKD-normalized and its whitespace collapsed to single
//! spaces.

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node};
use unicode_normalization::UnicodeNormalization;

static NUMBER_NOISE: Lazy<Regex> = Lazy::new(|| pattern("[+*,]"));

/// Compile a hard-coded pattern.
///
/// # Panics
///
/// Panics if `source` is not a valid regex; only call it with literals.
pub fn pattern(source: &str) -> Regex {
    Regex::new(source).unwrap_or_else(|e| panic!("invalid built-in pattern {source:?}: {e}"))
}

/// Build a search pattern from a phrase, allowing any run of whitespace
/// between its words.
///
/// ```ignore
/// assert_eq!(phrase_pattern("confirmed cases"), r"confirmed[\s]+cases");
/// ```
pub fn phrase_pattern(phrase: &str) -> String {
    phrase.split(' ').join(r"[\s]+")
}

/// [`phrase_pattern`] compiled with [`pattern`].
pub fn phrase_regex(phrase: &str) -> Regex {
    pattern(&phrase_pattern(phrase))
}

/// Collapse Unicode compatibility forms and whitespace runs.
pub fn normalize(text: &str) -> String {
    text.nfkd().collect::<String>().split_whitespace().join(" ")
}

/// Composed, normalized text of every element matching `search`, in
/// document order.
pub fn find_strings(document: &Html, search: &Regex) -> Vec<String> {
    text_containers(document)
        .into_iter()
        .map(|element| normalize(&compose(element)))
        .filter(|text| search.is_match(text))
        .collect()
}

/// Integer at the start of the first match of `pattern` in the first string.
///
/// Thousands separators and the `+`/`*` footnote markers CDPH appends to some
/// counts are dropped before parsing. Returns `None` when there are no
/// strings, the first string does not match, or the match does not begin
/// with a number.
pub fn leading_number(strings: &[String], pattern: &Regex) -> Option<u64> {
    let first = strings.first()?;
    let found = pattern.find(first)?;
    let cleaned = NUMBER_NOISE.replace_all(found.as_str(), "");
    cleaned.split(' ').next()?.parse().ok()
}

enum Piece<'a> {
    Text(&'a str),
    Element(ElementRef<'a>),
}

fn is_span(element: ElementRef<'_>) -> bool {
    element.value().name() == "span"
}

/// Nearest non-span ancestor of each non-blank text node, deduplicated.
fn text_containers(document: &Html) -> Vec<ElementRef<'_>> {
    document
        .root_element()
        .descendants()
        .filter(|node| {
            node.value()
                .as_text()
                .is_some_and(|text| !text.text.trim().is_empty())
        })
        .filter_map(|node| {
            node.ancestors()
                .filter_map(ElementRef::wrap)
                .find(|element| !is_span(*element))
        })
        .filter(|element| !matches!(element.value().name(), "script" | "style"))
        .unique_by(|element| element.id())
        .collect()
}

fn flatten_children<'a>(element: ElementRef<'a>, out: &mut Vec<Piece<'a>>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push(Piece::Text(&text.text)),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    if is_span(child) {
                        flatten_children(child, out);
                    } else {
                        out.push(Piece::Element(child));
                    }
                }
            }
            _ => {}
        }
    }
}

/// The one string an element wraps, looking through nested single children.
fn single_string(element: ElementRef<'_>) -> Option<&str> {
    let mut pieces = Vec::new();
    flatten_children(element, &mut pieces);
    match pieces.as_slice() {
        [Piece::Text(text)] => Some(*text),
        [Piece::Element(inner)] => single_string(*inner),
        _ => None,
    }
}

fn compose(element: ElementRef<'_>) -> String {
    let mut pieces = Vec::new();
    flatten_children(element, &mut pieces);

    let mut out = String::new();
    for piece in pieces {
        match piece {
            Piece::Text(text) => out.push_str(text),
            Piece::Element(child) => {
                if let Some(text) = single_string(child) {
                    out.push_str(text);
                } else if child.value().name() == "br" {
                    out.push(' ');
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(body: &str) -> Html {
        Html::parse_document(&format!("<html><body>{body}</body></html>"))
    }

    #[test]
    fn test_phrase_pattern_joins_words_with_whitespace_class() {
        assert_eq!(phrase_pattern("confirmed cases"), r"confirmed[\s]+cases");
        assert_eq!(phrase_pattern("[0-9,]+...Death"), "[0-9,]+...Death");
    }

    #[test]
    fn test_normalize_collapses_nbsp_and_newlines() {
        assert_eq!(normalize("  8,155\u{a0}confirmed\n\tcases "), "8,155 confirmed cases");
    }

    #[test]
    fn test_find_strings_treats_spans_as_transparent() {
        let html = doc("<p><span>8,155</span> <span>confirmed</span> cases and 171 deaths.</p>");
        let strings = find_strings(&html, &phrase_regex("confirmed cases"));
        assert_eq!(strings, vec!["8,155 confirmed cases and 171 deaths.".to_string()]);
    }

    #[test]
    fn test_find_strings_includes_single_string_children_and_breaks() {
        let html = doc("<p><strong>1,234</strong> – Positive cases<br>56 – Deaths</p>");
        let strings = find_strings(&html, &phrase_regex("Positive cases"));
        assert_eq!(strings, vec!["1,234 – Positive cases 56 – Deaths".to_string()]);
    }

    #[test]
    fn test_find_strings_skips_multi_child_elements() {
        let html = doc("<p>Total: <em>a <b>b</b></em> confirmed cases</p>");
        let strings = find_strings(&html, &phrase_regex("confirmed cases"));
        assert_eq!(strings, vec!["Total: confirmed cases".to_string()]);
    }

    #[test]
    fn test_find_strings_preserves_document_order() {
        let html = doc("<p>10 confirmed cases</p><div><p>20 confirmed cases</p></div>");
        let strings = find_strings(&html, &phrase_regex("confirmed cases"));
        assert_eq!(strings, vec!["10 confirmed cases", "20 confirmed cases"]);
    }

    #[test]
    fn test_find_strings_no_match() {
        let html = doc("<p>Nothing to see here.</p>");
        assert!(find_strings(&html, &phrase_regex("confirmed cases")).is_empty());
    }

    #[test]
    fn test_leading_number_strips_separators_and_markers() {
        let strings = vec!["As of today 25,200+ tests had been conducted.".to_string()];
        let found = leading_number(&strings, &pattern("[0-9,+*]+ tests had been conducted"));
        assert_eq!(found, Some(25200));
    }

    #[test]
    fn test_leading_number_uses_first_string_only() {
        let strings = vec!["no numbers".to_string(), "12 deaths".to_string()];
        assert_eq!(leading_number(&strings, &pattern("[0-9,]+ deaths")), None);
    }

    #[test]
    fn test_leading_number_with_dash_separator() {
        let strings = vec!["1,234 – Positive cases".to_string()];
        assert_eq!(
            leading_number(&strings, &pattern("[0-9,]+...Positive cases")),
            Some(1234)
        );
    }

    #[test]
    fn test_leading_number_rejects_bare_separator() {
        let strings = vec![", deaths".to_string()];
        assert_eq!(leading_number(&strings, &pattern("[0-9,]+ deaths")), None);
        assert_eq!(leading_number(&[], &pattern("[0-9,]+ deaths")), None);
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let html = doc("<p>There are 8,155 confirmed cases and 171 deaths.</p>");
        let search = phrase_regex("confirmed cases");
        let cases = pattern("[0-9,]+ confirmed cases.");
        let first = leading_number(&find_strings(&html, &search), &cases);
        let second = leading_number(&find_strings(&html, &search), &cases);
        assert_eq!(first, Some(8155));
        assert_eq!(first, second);
    }
}
