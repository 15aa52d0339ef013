//! Side-effect extractor trait, built-in extractors, and the domain router.
//!
//! Each site-specific extractor knows where one publisher puts its side-effect
//! section. Pages from any other host go to [`GeneralExtractor`].

mod drugs_com;
mod fda;
mod general;
mod mayo;
mod medlineplus;

use std::collections::BTreeSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

pub use drugs_com::DrugsComExtractor;
pub use fda::FdaLabelExtractor;
pub use general::GeneralExtractor;
pub use mayo::MayoClinicExtractor;
pub use medlineplus::MedlinePlusExtractor;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Turns one page layout into a set of side-effect phrases.
///
/// Implementations never fail: a page without a recognizable section yields
/// an empty set.
pub trait SideEffectExtractor: Send + Sync {
    /// Extract trimmed phrases from the parsed page. `raw` is the unparsed
    /// markup for extractors that pattern-match on source text.
    fn extract(&self, doc: &Html, raw: &str) -> BTreeSet<String>;

    /// Human-readable extractor name for tracing.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Maps registered host domains to extractors, with a general fallback.
pub struct ExtractorRegistry {
    domains: Vec<(String, Box<dyn SideEffectExtractor>)>,
    fallback: Box<dyn SideEffectExtractor>,
}

impl ExtractorRegistry {
    /// Create a registry with the four built-in publishers and the general fallback.
    pub fn new() -> Self {
        let mut registry = Self::with_fallback(GeneralExtractor);
        registry.register("fda.gov", FdaLabelExtractor);
        registry.register("mayoclinic.org", MayoClinicExtractor);
        registry.register("drugs.com", DrugsComExtractor);
        registry.register("medlineplus.gov", MedlinePlusExtractor);
        registry
    }

    /// Create a registry with no domain extractors.
    pub fn with_fallback(fallback: impl SideEffectExtractor + 'static) -> Self {
        Self {
            domains: Vec::new(),
            fallback: Box::new(fallback),
        }
    }

    /// Register an extractor for a host domain and all of its subdomains.
    pub fn register(&mut self, domain: &str, extractor: impl SideEffectExtractor + 'static) {
        self.domains
            .push((domain.trim().to_lowercase(), Box::new(extractor)));
    }

    /// Pick the extractor for `url`. Always returns an extractor.
    pub fn detect(&self, url: &str) -> &dyn SideEffectExtractor {
        let host = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase))
            .unwrap_or_default();

        self.domains
            .iter()
            .find(|(domain, _)| host_matches(&host, domain))
            .map(|(_, extractor)| extractor.as_ref())
            .unwrap_or(self.fallback.as_ref())
    }

    /// Route `html` to the right extractor and return its phrases sorted.
    pub fn extract_side_effects(&self, url: &str, html: &str) -> Vec<String> {
        let extractor = self.detect(url);
        let doc = Html::parse_document(html);
        let phrases: Vec<String> = extractor.extract(&doc, html).into_iter().collect();

        debug!(url, extractor = extractor.name(), count = phrases.len(), "extracted side effects");
        phrases
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn host_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

// ---------------------------------------------------------------------------
// Shared DOM helpers
// ---------------------------------------------------------------------------

static LI_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li").expect("valid selector"));

/// Visible text of an element: stripped text runs joined by single spaces.
pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Headings matched by `selector` whose text contains any trigger phrase.
pub(crate) fn trigger_headings<'a>(
    doc: &'a Html,
    selector: &'a Selector,
    triggers: &'a [&'a str],
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    doc.select(selector).filter(move |heading| {
        let text = element_text(*heading).to_lowercase();
        triggers.iter().any(|t| text.contains(t))
    })
}

/// Text of every `<li>` inside `container`, skipping empty items.
pub(crate) fn list_items(container: ElementRef<'_>) -> impl Iterator<Item = String> + '_ {
    container
        .select(&LI_SEL)
        .map(element_text)
        .filter(|s| !s.is_empty())
}

/// Sibling elements right after `heading` while they are `<p>`, `<ul>` or `<ol>`.
pub(crate) fn section_blocks(heading: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    heading
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .take_while(|el| matches!(el.value().name(), "p" | "ul" | "ol"))
}

/// Every element after `anchor` in document order.
pub(crate) fn elements_after<'a>(
    doc: &'a Html,
    anchor: ElementRef<'a>,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    let anchor_id = anchor.id();
    doc.root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .skip_while(move |el| el.id() != anchor_id)
        .skip(1)
}
