//! Page fetching and side-effect extraction.
//!
//! This crate provides:
//! - [`adapters`]: Publisher-specific extractors (FDA, Mayo Clinic, Drugs.com, MedlinePlus)
//!   and the [`GeneralExtractor`] fallback
//! - [`ExtractorRegistry`]: Routes a page to its extractor by URL host
//! - [`engine`]: Bounded-concurrency fetcher producing [`ScrapedDocument`]s
//!
//! [`ScrapedDocument`]: medsource_shared::ScrapedDocument

pub mod adapters;
pub mod engine;

pub use adapters::{
    DrugsComExtractor, ExtractorRegistry, FdaLabelExtractor, GeneralExtractor,
    MayoClinicExtractor, MedlinePlusExtractor, SideEffectExtractor,
};
pub use engine::Fetcher;

#[cfg(test)]
mod tests {
    use super::*;

    fn load_fixture(name: &str) -> String {
        let path = format!("../../../fixtures/html/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    fn extract(url: &str, fixture: &str) -> Vec<String> {
        let registry = ExtractorRegistry::new();
        registry.extract_side_effects(url, &load_fixture(fixture))
    }

    // -----------------------------------------------------------------------
    // Routing tests
    // -----------------------------------------------------------------------

    #[test]
    fn route_fda_label() {
        let registry = ExtractorRegistry::new();
        let extractor = registry.detect("https://www.accessdata.fda.gov/label/020103s035.htm");
        assert_eq!(extractor.name(), "fda");
    }

    #[test]
    fn route_unregistered_domain_to_general() {
        let registry = ExtractorRegistry::new();
        let extractor = registry.detect("https://library.example-health.org/ondansetron");
        assert_eq!(extractor.name(), "general");
    }

    // -----------------------------------------------------------------------
    // Extraction tests
    // -----------------------------------------------------------------------

    #[test]
    fn fda_extracts_adverse_reactions_section() {
        let phrases = extract("https://www.accessdata.fda.gov/label/zofran.htm", "fda_label.html");
        assert_eq!(
            phrases,
            vec![
                "Constipation",
                "Diarrhea",
                "Headache",
                "Malaise/fatigue",
                "The following adverse reactions were reported in adult patients.",
            ]
        );
        // The table ends the section walk.
        assert!(!phrases.iter().any(|p| p.contains("Not part")));
    }

    #[test]
    fn mayo_extracts_next_container() {
        let phrases = extract(
            "https://www.mayoclinic.org/drugs-supplements/ondansetron/side-effects",
            "mayoclinic.html",
        );
        assert_eq!(phrases, vec!["Blurred vision", "Fainting", "chest pain", "fever"]);
    }

    #[test]
    fn drugs_com_extracts_first_list_only() {
        let phrases = extract(
            "https://www.drugs.com/sfx/ondansetron-side-effects.html",
            "drugs_com.html",
        );
        assert_eq!(
            phrases,
            vec![
                "difficult breathing",
                "hives",
                "swelling of your face, lips, tongue, or throat",
            ]
        );
    }

    #[test]
    fn medlineplus_extracts_section_body() {
        let phrases = extract(
            "https://medlineplus.gov/druginfo/meds/a601209.html",
            "medlineplus.html",
        );
        assert_eq!(phrases, vec!["constipation", "feeling tired", "headache"]);
    }

    #[test]
    fn general_fallback_unions_both_heuristics() {
        let phrases = extract(
            "https://library.example-health.org/ondansetron",
            "general.html",
        );
        assert_eq!(
            phrases,
            vec![
                // structural: list items
                "Dizziness",
                "Warm or flushed feeling",
                // pattern: "common side effects include: ..."
                "constipation",
                // structural: short paragraph phrases
                "drowsiness",
                "dry mouth",
                "headache",
                "tiredness",
            ]
        );
    }

    #[test]
    fn known_domain_does_not_run_general_heuristics() {
        // The general fixture has a "common side effects include" sentence but
        // no MedlinePlus section body.
        let phrases = extract("https://medlineplus.gov/x.html", "general.html");
        assert!(phrases.is_empty());
    }
}
