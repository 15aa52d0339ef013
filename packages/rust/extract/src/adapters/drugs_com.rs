//! Drugs.com extractor.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use scraper::{Html, Selector};

use super::{SideEffectExtractor, elements_after, list_items, trigger_headings};

static HEADING_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h2").expect("valid selector"));

const TRIGGERS: &[&str] = &["side effects"];

/// Reads Drugs.com pages: only the first `<ul>` after each "Side effects"
/// heading is collected.
pub struct DrugsComExtractor;

impl SideEffectExtractor for DrugsComExtractor {
    fn extract(&self, doc: &Html, _raw: &str) -> BTreeSet<String> {
        let mut results = BTreeSet::new();

        for heading in trigger_headings(doc, &HEADING_SEL, TRIGGERS) {
            if let Some(list) = elements_after(doc, heading).find(|el| el.value().name() == "ul") {
                results.extend(list_items(list));
            }
        }

        results
    }

    fn name(&self) -> &str {
        "drugs.com"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_only_first_following_list() {
        let html = r#"<html><body>
            <h2>Ondansetron side effects</h2>
            <p>Get emergency medical help if you have:</p>
            <div class="ddc-list"><ul><li>hives</li><li> difficult breathing </li></ul></div>
            <ul><li>Not part of the first list</li></ul>
        </body></html>"#;

        let doc = Html::parse_document(html);
        let phrases: Vec<_> = DrugsComExtractor.extract(&doc, html).into_iter().collect();
        assert_eq!(phrases, vec!["difficult breathing", "hives"]);
    }

    #[test]
    fn ordered_lists_are_not_considered() {
        let html = "<h2>Side effects</h2><ol><li>skipped</li></ol>";
        let doc = Html::parse_document(html);
        assert!(DrugsComExtractor.extract(&doc, html).is_empty());
    }
}
