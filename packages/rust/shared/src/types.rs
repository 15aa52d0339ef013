//! Core domain types: structured side-effect rows and scraped documents.

use chrono::{DateTime, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Column that names the medication in the structured table.
pub const MEDICATION_COLUMN: &str = "medication";

/// Column that names the reported side effect in the structured table.
pub const SIDE_EFFECT_COLUMN: &str = "side_effect";

/// Source identifier attached to every phrase contributed by a structured row.
pub const STRUCTURED_SOURCE_TAG: &str = "FDA Data from SQLite";

/// Maximum number of characters of page text kept on a [`ScrapedDocument`].
pub const DOCUMENT_TEXT_CAP: usize = 4000;

/// Optional columns whose values are trimmed on load.
const TRIMMED_COLUMNS: &[&str] = &["drug_manufacturer", "drug_suspicion", "outcome"];

/// Normalize a side-effect phrase for keying: trimmed and lower-cased.
pub fn normalize_phrase(phrase: &str) -> String {
    phrase.trim().to_lowercase()
}

/// Return the first `max_chars` characters of `s` (never splits a code point).
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ---------------------------------------------------------------------------
// SideEffectRecord
// ---------------------------------------------------------------------------

/// One row of the structured side-effect table.
///
/// Columns keep the table's natural order. `medication` (trimmed,
/// lower-cased) and `side_effect` (trimmed) are always present and non-empty;
/// rows that cannot satisfy this are rejected at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideEffectRecord {
    columns: Vec<(String, Option<String>)>,
    medication_idx: usize,
    side_effect_idx: usize,
}

impl SideEffectRecord {
    /// Build a record from `(column, value)` pairs in table order.
    ///
    /// Column names are trimmed and lower-cased. Returns `None` when the
    /// medication or side effect is missing or blank.
    pub fn from_columns<I, K>(columns: I) -> Option<Self>
    where
        I: IntoIterator<Item = (K, Option<String>)>,
        K: AsRef<str>,
    {
        let columns: Vec<(String, Option<String>)> = columns
            .into_iter()
            .map(|(name, value)| {
                let name = name.as_ref().trim().to_lowercase();
                let value = value.map(|v| normalize_value(&name, v));
                (name, value)
            })
            .collect();

        let medication_idx = present_index(&columns, MEDICATION_COLUMN)?;
        let side_effect_idx = present_index(&columns, SIDE_EFFECT_COLUMN)?;

        Some(Self {
            columns,
            medication_idx,
            side_effect_idx,
        })
    }

    /// Build a record holding only the two required columns.
    pub fn new(medication: &str, side_effect: &str) -> Option<Self> {
        Self::from_columns([
            (MEDICATION_COLUMN, Some(medication.to_string())),
            (SIDE_EFFECT_COLUMN, Some(side_effect.to_string())),
        ])
    }

    /// Append (or replace) an optional column.
    ///
    /// The required columns cannot be replaced through this method.
    pub fn with_column(mut self, name: &str, value: Option<&str>) -> Self {
        let name = name.trim().to_lowercase();
        if name == MEDICATION_COLUMN || name == SIDE_EFFECT_COLUMN {
            return self;
        }
        let value = value.map(|v| normalize_value(&name, v.to_string()));
        match self.columns.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.columns.push((name, value)),
        }
        self
    }

    /// Normalized medication name.
    pub fn medication(&self) -> &str {
        self.columns[self.medication_idx].1.as_deref().unwrap_or_default()
    }

    /// Trimmed side-effect text as stored (case preserved).
    pub fn side_effect(&self) -> &str {
        self.columns[self.side_effect_idx].1.as_deref().unwrap_or_default()
    }

    /// Value of a column, if the column exists and is not NULL.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .and_then(|(_, value)| value.as_deref())
    }

    /// Columns whose value is present and not blank, in natural order.
    pub fn present_columns(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns.iter().filter_map(|(name, value)| {
            value
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .map(|v| (name.as_str(), v))
        })
    }
}

impl Serialize for SideEffectRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

fn normalize_value(column: &str, value: String) -> String {
    if column == MEDICATION_COLUMN {
        value.trim().to_lowercase()
    } else if column == SIDE_EFFECT_COLUMN || TRIMMED_COLUMNS.contains(&column) {
        value.trim().to_string()
    } else {
        value
    }
}

fn present_index(columns: &[(String, Option<String>)], column: &str) -> Option<usize> {
    columns
        .iter()
        .position(|(name, value)| name == column && value.as_deref().is_some_and(|v| !v.is_empty()))
}

// ---------------------------------------------------------------------------
// ScrapedDocument
// ---------------------------------------------------------------------------

/// The outcome of fetching and extracting one web page.
///
/// A failed document carries an error and never any text or phrases.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ScrapedDocument {
    url: String,
    text: String,
    side_effects: Vec<String>,
    error: Option<String>,
    fetched_at: DateTime<Utc>,
}

impl ScrapedDocument {
    /// A successfully fetched page.
    ///
    /// Carriage returns and newlines in `html` become spaces and the text is
    /// capped at [`DOCUMENT_TEXT_CAP`] characters.
    pub fn extracted(url: impl Into<String>, html: &str, side_effects: Vec<String>) -> Self {
        let flattened = html.replace(['\r', '\n'], " ");
        Self {
            url: url.into(),
            text: truncate_chars(&flattened, DOCUMENT_TEXT_CAP).to_string(),
            side_effects,
            error: None,
            fetched_at: Utc::now(),
        }
    }

    /// A page whose fetch failed.
    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            text: String::new(),
            side_effects: Vec::new(),
            error: Some(error.into()),
            fetched_at: Utc::now(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Extracted side-effect phrases, sorted and deduplicated by the extractor.
    pub fn side_effects(&self) -> &[String] {
        &self.side_effects
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Source identifier used in the source map.
    ///
    /// The network location for URLs with a scheme (third `/` segment),
    /// otherwise the URL verbatim.
    pub fn source_id(&self) -> &str {
        if self.url.contains("://") {
            self.url.split('/').nth(2).unwrap_or_default()
        } else {
            &self.url
        }
    }
}
