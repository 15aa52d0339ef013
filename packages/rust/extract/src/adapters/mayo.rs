//! Mayo Clinic extractor.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use scraper::{Html, Selector};

use super::{SideEffectExtractor, elements_after, list_items, trigger_headings};

static HEADING_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h2").expect("valid selector"));

const TRIGGERS: &[&str] = &["side effects"];

/// Reads Mayo Clinic "Side effects" pages: all list items of the first
/// `<div>` following the heading, wherever it sits in the document.
pub struct MayoClinicExtractor;

impl SideEffectExtractor for MayoClinicExtractor {
    fn extract(&self, doc: &Html, _raw: &str) -> BTreeSet<String> {
        let mut results = BTreeSet::new();

        for heading in trigger_headings(doc, &HEADING_SEL, TRIGGERS) {
            if let Some(container) =
                elements_after(doc, heading).find(|el| el.value().name() == "div")
            {
                results.extend(list_items(container));
            }
        }

        results
    }

    fn name(&self) -> &str {
        "mayoclinic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_items_from_next_div_outside_heading_parent() {
        let html = r#"<html><body>
            <section><h2>Side Effects</h2><p>Check with your doctor.</p></section>
            <div class="content">
                <h3>More common</h3>
                <ul><li>Blurred vision</li><li>dry mouth</li></ul>
                <h3>Rare</h3>
                <ul><li>Fainting</li></ul>
            </div>
            <div><ul><li>Second div is ignored</li></ul></div>
        </body></html>"#;

        let doc = Html::parse_document(html);
        let phrases: Vec<_> = MayoClinicExtractor.extract(&doc, html).into_iter().collect();
        assert_eq!(phrases, vec!["Blurred vision", "Fainting", "dry mouth"]);
    }

    #[test]
    fn no_div_after_heading_is_empty() {
        let html = "<div><ul><li>Before</li></ul></div><h2>Side effects</h2><ul><li>x</li></ul>";
        let doc = Html::parse_document(html);
        assert!(MayoClinicExtractor.extract(&doc, html).is_empty());
    }
}
