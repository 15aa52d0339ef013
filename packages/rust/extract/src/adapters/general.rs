//! General (fallback) extractor.
//!
//! Used for any host without a registered extractor. Two heuristics run on
//! every page and their results are unioned:
//! - structural: side-effect headings followed by paragraphs and lists
//! - pattern: phrases such as "may cause ..." matched against the raw markup

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use super::{SideEffectExtractor, element_text, list_items, section_blocks, trigger_headings};

static HEADING_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, h4").expect("valid selector"));

const TRIGGERS: &[&str] = &["side effects", "adverse reactions", "side-effects"];

/// Paragraph fragments longer than this many words are treated as prose.
const MAX_PHRASE_WORDS: usize = 6;

static PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?is)common side effects include[:\-]?\s*(.*?)(?:\.|\n)",
        r"(?is)side effects may include[:\-]?\s*(.*?)(?:\.|\n)",
        r"(?is)may cause[:\-]?\s*(.*?)(?:\.|\n)",
    ]
    .into_iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

static SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[;,]").expect("valid regex"));

/// Heuristic extractor that works on arbitrary HTML pages.
pub struct GeneralExtractor;

impl SideEffectExtractor for GeneralExtractor {
    fn extract(&self, doc: &Html, raw: &str) -> BTreeSet<String> {
        let mut results = structural_phrases(doc);
        results.extend(pattern_phrases(raw));
        results
    }

    fn name(&self) -> &str {
        "general"
    }
}

/// Lists under side-effect headings verbatim, paragraphs as short phrases.
fn structural_phrases(doc: &Html) -> BTreeSet<String> {
    let mut results = BTreeSet::new();

    for heading in trigger_headings(doc, &HEADING_SEL, TRIGGERS) {
        for block in section_blocks(heading) {
            if block.value().name() == "p" {
                results.extend(short_phrases(&element_text(block)));
            } else {
                results.extend(list_items(block));
            }
        }
    }

    results
}

/// Spans captured by the fixed phrase patterns, split on commas/semicolons.
fn pattern_phrases(raw: &str) -> BTreeSet<String> {
    let mut results = BTreeSet::new();

    for pattern in PATTERNS.iter() {
        for caps in pattern.captures_iter(raw) {
            let Some(span) = caps.get(1) else { continue };
            results.extend(
                SPLIT_RE
                    .split(span.as_str())
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(String::from),
            );
        }
    }

    results
}

/// Split on commas/semicolons, keeping fragments of 1 to 6 words.
pub(crate) fn short_phrases(text: &str) -> Vec<String> {
    SPLIT_RE
        .split(text)
        .map(str::trim)
        .filter(|part| {
            let words = part.split_whitespace().count();
            words > 0 && words <= MAX_PHRASE_WORDS
        })
        .map(String::from)
        .collect()
}
