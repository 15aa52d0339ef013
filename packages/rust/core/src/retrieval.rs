//! Keyword retrieval over structured rows and scraped documents.
//!
//! Used on the fallback path when no generated query could be run.

use medsource_shared::{ScrapedDocument, SideEffectRecord, normalize_phrase};

/// Row columns searched for the query keyword.
const SEARCH_COLUMNS: &[&str] = &["side_effect", "notes", "outcome"];

/// Bonus added to a document's score when any extracted phrase matches.
const PHRASE_MATCH_BONUS: usize = 2;

/// Keep rows whose medication contains `name` (trimmed, case-insensitive).
///
/// `None` or a blank name returns every row.
pub fn filter_by_medication(rows: &[SideEffectRecord], name: Option<&str>) -> Vec<SideEffectRecord> {
    let target = name.map(normalize_phrase).unwrap_or_default();
    if target.is_empty() {
        return rows.to_vec();
    }

    rows.iter()
        .filter(|row| row.medication().contains(&target))
        .cloned()
        .collect()
}

/// Rows whose side effect, notes, or outcome contains `query`, capped at `top_k`.
pub fn search_rows(rows: &[SideEffectRecord], query: &str, top_k: usize) -> Vec<SideEffectRecord> {
    let q = normalize_phrase(query);
    if q.is_empty() {
        return rows.iter().take(top_k).cloned().collect();
    }

    let hits: Vec<SideEffectRecord> = rows
        .iter()
        .filter(|row| {
            SEARCH_COLUMNS
                .iter()
                .filter_map(|col| row.get(col))
                .any(|value| value.to_lowercase().contains(&q))
        })
        .take(top_k)
        .cloned()
        .collect();

    never_empty(hits, rows, top_k)
}

/// Documents ranked by keyword score, capped at `top_k`.
///
/// Score is the number of occurrences of `query` in the text, plus a fixed
/// bonus when any extracted phrase contains it. Zero-score documents are
/// dropped; ties keep input order.
pub fn search_documents(
    docs: &[ScrapedDocument],
    query: &str,
    top_k: usize,
) -> Vec<ScrapedDocument> {
    let q = normalize_phrase(query);
    if q.is_empty() {
        return docs.iter().take(top_k).cloned().collect();
    }

    let mut scored: Vec<(usize, &ScrapedDocument)> = docs
        .iter()
        .map(|doc| (score_document(doc, &q), doc))
        .filter(|(score, _)| *score > 0)
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    let hits = scored
        .into_iter()
        .take(top_k)
        .map(|(_, doc)| doc.clone())
        .collect();

    never_empty(hits, docs, top_k)
}

fn score_document(doc: &ScrapedDocument, q: &str) -> usize {
    let occurrences = doc.text().to_lowercase().matches(q).count();
    let phrase_hit = doc
        .side_effects()
        .iter()
        .any(|phrase| phrase.to_lowercase().contains(q));

    occurrences + if phrase_hit { PHRASE_MATCH_BONUS } else { 0 }
}

/// Keyword search never comes back empty-handed: with no hits, the leading
/// `top_k` candidates are returned unranked so the answer still has evidence.
fn never_empty<T: Clone>(hits: Vec<T>, candidates: &[T], top_k: usize) -> Vec<T> {
    if hits.is_empty() {
        candidates.iter().take(top_k).cloned().collect()
    } else {
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(med: &str, effect: &str) -> SideEffectRecord {
        SideEffectRecord::new(med, effect).unwrap()
    }

    fn doc(url: &str, text: &str, phrases: &[&str]) -> ScrapedDocument {
        ScrapedDocument::extracted(url, text, phrases.iter().map(|p| p.to_string()).collect())
    }

    #[test]
    fn filter_matches_normalized_name() {
        let rows = vec![row("ondansetron", "Headache"), row("ibuprofen", "Dyspepsia")];

        let filtered = filter_by_medication(&rows, Some("  OnDansetron "));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].side_effect(), "Headache");
    }

    #[test]
    fn filter_matches_substring() {
        let rows = vec![
            row("ondansetron hydrochloride", "Headache"),
            row("ondansetron", "Constipation"),
            row("ibuprofen", "Dyspepsia"),
        ];

        let filtered = filter_by_medication(&rows, Some("Ondansetron"));
        let effects: Vec<&str> = filtered.iter().map(|r| r.side_effect()).collect();
        assert_eq!(effects, vec!["Headache", "Constipation"]);
    }

    #[test]
    fn filter_without_name_is_identity() {
        let rows = vec![row("a", "x"), row("b", "y")];
        assert_eq!(filter_by_medication(&rows, None), rows);
        assert_eq!(filter_by_medication(&rows, Some("   ")), rows);
    }

    #[test]
    fn filter_unknown_name_is_empty() {
        let rows = vec![row("a", "x")];
        assert!(filter_by_medication(&rows, Some("zzz")).is_empty());
    }

    #[test]
    fn search_rows_matches_side_effect_notes_and_outcome() {
        let rows = vec![
            row("a", "Severe headache"),
            row("a", "Rash").with_column("notes", Some("with HEADACHE")),
            row("a", "Nausea").with_column("outcome", Some("headache resolved")),
            row("a", "Fatigue").with_column("drug_manufacturer", Some("headache inc")),
        ];

        let hits = search_rows(&rows, "Headache", 10);
        let effects: Vec<&str> = hits.iter().map(|r| r.side_effect()).collect();
        assert_eq!(effects, vec!["Severe headache", "Rash", "Nausea"]);
    }

    #[test]
    fn search_rows_respects_top_k() {
        let rows: Vec<_> = (0..5).map(|i| row("a", &format!("rash {i}"))).collect();
        assert_eq!(search_rows(&rows, "rash", 2).len(), 2);
    }

    #[test]
    fn search_rows_without_hits_returns_leading_rows() {
        let rows = vec![row("a", "x"), row("a", "y"), row("a", "z")];
        let hits = search_rows(&rows, "unrelated question", 2);
        assert_eq!(hits, rows[..2].to_vec());
    }

    #[test]
    fn search_rows_empty_input() {
        assert!(search_rows(&[], "rash", 5).is_empty());
    }

    #[test]
    fn search_documents_ranks_by_score() {
        let docs = vec![
            doc("https://a.org/1", "rash once", &[]),
            doc("https://a.org/2", "rash rash rash", &[]),
            doc("https://a.org/3", "nothing", &["Skin rash"]),
            doc("https://a.org/4", "nothing", &[]),
        ];

        let ranked = search_documents(&docs, "RASH", 10);
        let urls: Vec<&str> = ranked.iter().map(|d| d.url()).collect();
        assert_eq!(urls, vec!["https://a.org/2", "https://a.org/3", "https://a.org/1"]);
    }

    #[test]
    fn search_documents_ties_keep_input_order() {
        let docs = vec![
            doc("https://a.org/1", "rash", &[]),
            doc("https://a.org/2", "rash", &[]),
        ];
        let ranked = search_documents(&docs, "rash", 10);
        assert_eq!(ranked[0].url(), "https://a.org/1");
        assert_eq!(ranked[1].url(), "https://a.org/2");
    }

    #[test]
    fn search_documents_without_hits_returns_leading_docs() {
        let docs = vec![
            doc("https://a.org/1", "alpha", &[]),
            doc("https://a.org/2", "beta", &[]),
            ScrapedDocument::failed("https://a.org/3", "timeout"),
        ];

        let ranked = search_documents(&docs, "What are the side effects of ondansetron?", 2);
        let urls: Vec<&str> = ranked.iter().map(|d| d.url()).collect();
        assert_eq!(urls, vec!["https://a.org/1", "https://a.org/2"]);
    }

    #[test]
    fn failed_documents_never_score() {
        let docs = vec![ScrapedDocument::failed("https://rash.org/x", "rash")];
        assert_eq!(score_document(&docs[0], "rash"), 0);
    }
}
