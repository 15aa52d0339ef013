//! MedlinePlus extractor.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use scraper::{Html, Selector};

use super::{SideEffectExtractor, elements_after, list_items, trigger_headings};

static HEADING_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h2").expect("valid selector"));

const TRIGGERS: &[&str] = &["side effects"];

/// Class of the container MedlinePlus wraps section content in.
const SECTION_BODY_CLASS: &str = "section-body";

/// Reads MedlinePlus drug pages: list items of the next
/// `div.section-body` after each "Side effects" heading.
pub struct MedlinePlusExtractor;

impl SideEffectExtractor for MedlinePlusExtractor {
    fn extract(&self, doc: &Html, _raw: &str) -> BTreeSet<String> {
        let mut results = BTreeSet::new();

        for heading in trigger_headings(doc, &HEADING_SEL, TRIGGERS) {
            let section = elements_after(doc, heading).find(|el| {
                el.value().name() == "div"
                    && el.value().classes().any(|class| class == SECTION_BODY_CLASS)
            });
            if let Some(section) = section {
                results.extend(list_items(section));
            }
        }

        results
    }

    fn name(&self) -> &str {
        "medlineplus"
    }
}
