//! Source attribution: which origins reported each side-effect phrase.

use indexmap::IndexMap;
use serde::Serialize;

use medsource_shared::{STRUCTURED_SOURCE_TAG, ScrapedDocument, SideEffectRecord, normalize_phrase};

/// Normalized phrase → sources that reported it, in first-seen order.
///
/// Source lists are not deduplicated: each structured row contributes one
/// entry, and so does each document that lists the phrase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SourceMap(IndexMap<String, Vec<String>>);

impl SourceMap {
    /// Append `source` to the entry for `phrase`, creating it if needed.
    fn push(&mut self, phrase: &str, source: &str) {
        self.0
            .entry(normalize_phrase(phrase))
            .or_default()
            .push(source.to_string());
    }

    /// Sources recorded for an already-normalized phrase.
    pub fn get(&self, phrase: &str) -> Option<&[String]> {
        self.0.get(phrase).map(Vec::as_slice)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Merge structured rows and scraped documents into a [`SourceMap`].
///
/// Rows come first in table order, tagged [`STRUCTURED_SOURCE_TAG`]; then
/// each document's phrases in list order, tagged with the document's host.
pub fn build_source_map(rows: &[SideEffectRecord], docs: &[ScrapedDocument]) -> SourceMap {
    let mut map = SourceMap::default();

    for row in rows {
        map.push(row.side_effect(), STRUCTURED_SOURCE_TAG);
    }

    for doc in docs {
        let source = doc.source_id();
        for phrase in doc.side_effects() {
            map.push(phrase, source);
        }
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(med: &str, effect: &str) -> SideEffectRecord {
        SideEffectRecord::new(med, effect).unwrap()
    }

    fn doc(url: &str, phrases: &[&str]) -> ScrapedDocument {
        ScrapedDocument::extracted(url, "", phrases.iter().map(|p| p.to_string()).collect())
    }

    #[test]
    fn keys_are_normalized() {
        let map = build_source_map(
            &[row("ondansetron", " Nausea ")],
            &[doc("https://www.drugs.com/a", &["nausea", "  NAUSEA"])],
        );

        assert_eq!(map.len(), 1);
        assert_eq!(
            map.get("nausea").unwrap(),
            [STRUCTURED_SOURCE_TAG, "www.drugs.com", "www.drugs.com"]
        );
    }

    #[test]
    fn sources_accumulate_in_first_seen_order() {
        let map = build_source_map(
            &[row("ondansetron", "nausea"), row("ondansetron", "Nausea")],
            &[doc("https://medlineplus.gov/druginfo/meds/a601209.html", &["nausea"])],
        );

        assert_eq!(
            map.get("nausea").unwrap(),
            [STRUCTURED_SOURCE_TAG, STRUCTURED_SOURCE_TAG, "medlineplus.gov"]
        );
    }

    #[test]
    fn keys_keep_insertion_order() {
        let map = build_source_map(
            &[row("x", "Rash"), row("x", "Headache")],
            &[doc("https://www.mayoclinic.org/a", &["fever", "rash"])],
        );

        let keys: Vec<&str> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["rash", "headache", "fever"]);
        assert_eq!(map.get("rash").unwrap(), [STRUCTURED_SOURCE_TAG, "www.mayoclinic.org"]);
    }

    #[test]
    fn failed_documents_contribute_nothing() {
        let map = build_source_map(&[], &[ScrapedDocument::failed("https://x.org/a", "timeout")]);
        assert!(map.is_empty());
    }

    #[test]
    fn building_twice_is_identical() {
        let rows = vec![row("x", "Dizziness"), row("x", "rash")];
        let docs = vec![doc("https://www.drugs.com/a", &["Dizziness", "hives"])];

        assert_eq!(build_source_map(&rows, &docs), build_source_map(&rows, &docs));
    }

    #[test]
    fn serializes_as_ordered_object() {
        let map = build_source_map(&[row("x", "Rash")], &[doc("https://a.org/p", &["itch"])]);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"rash":["FDA Data from SQLite"],"itch":["a.org"]}"#);
    }
}
