//! FDA drug label extractor.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use scraper::{Html, Selector};

use super::{SideEffectExtractor, element_text, list_items, section_blocks, trigger_headings};

static HEADING_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h2, h3").expect("valid selector"));

const TRIGGERS: &[&str] = &["adverse reactions"];

/// Reads the "Adverse Reactions" section of FDA label pages.
///
/// Walks the `<p>`/`<ul>`/`<ol>` siblings right after the heading; list items
/// and whole paragraphs become entries.
pub struct FdaLabelExtractor;

impl SideEffectExtractor for FdaLabelExtractor {
    fn extract(&self, doc: &Html, _raw: &str) -> BTreeSet<String> {
        let mut results = BTreeSet::new();

        for heading in trigger_headings(doc, &HEADING_SEL, TRIGGERS) {
            for block in section_blocks(heading) {
                if block.value().name() == "p" {
                    let text = element_text(block);
                    if !text.is_empty() {
                        results.insert(text);
                    }
                } else {
                    results.extend(list_items(block));
                }
            }
        }

        results
    }

    fn name(&self) -> &str {
        "fda"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_paragraphs_and_lists_until_other_element() {
        let html = r#"<html><body>
            <h2>6 ADVERSE REACTIONS</h2>
            <p>The most common adverse reactions are listed below.</p>
            <ul><li>Headache</li><li>Fatigue</li></ul>
            <ol><li>Constipation</li></ol>
            <div><ul><li>Not collected</li></ul></div>
            <ul><li>Also not collected</li></ul>
        </body></html>"#;

        let doc = Html::parse_document(html);
        let phrases = FdaLabelExtractor.extract(&doc, html);

        let expected: BTreeSet<String> = [
            "Constipation",
            "Fatigue",
            "Headache",
            "The most common adverse reactions are listed below.",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        assert_eq!(phrases, expected);
    }

    #[test]
    fn accepts_h3_and_ignores_h4() {
        let html = r#"<h3>Adverse Reactions in Trials</h3><ul><li>Dizziness</li></ul>
            <h4>Adverse reactions (postmarketing)</h4><ul><li>Rash</li></ul>"#;
        let doc = Html::parse_document(html);
        let phrases = FdaLabelExtractor.extract(&doc, html);
        assert_eq!(phrases.into_iter().collect::<Vec<_>>(), vec!["Dizziness"]);
    }

    #[test]
    fn missing_section_is_empty() {
        let html = "<h2>Dosage and Administration</h2><ul><li>4 mg</li></ul>";
        let doc = Html::parse_document(html);
        assert!(FdaLabelExtractor.extract(&doc, html).is_empty());
    }
}
