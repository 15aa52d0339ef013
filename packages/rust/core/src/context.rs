//! Evidence context handed to the answer generator.
//!
//! The context is a fixed, plain-text layout with three sections:
//!
//! ```text
//! SOURCE MAP:
//! - <phrase>: <source>, <source>
//!
//! STRUCTURED DATA (FDA Data from SQLite):
//! - <col>: <value> | <col>: <value>
//!
//! SCRAPED WEB DOCUMENTS:
//!
//! Source: <url>
//! Extracted side effects: <a>, <b>
//! Excerpt: <first 600 chars>
//! ```

use std::fmt;

use medsource_shared::{STRUCTURED_SOURCE_TAG, ScrapedDocument, SideEffectRecord, truncate_chars};

use crate::source_map::SourceMap;

/// Maximum characters of document text shown in an excerpt.
pub const EXCERPT_CAP: usize = 600;

const NO_STRUCTURED_DATA: &str = "No structured data found for this medication.";
const NO_DOCUMENTS: &str = "No scraped documents available.";

/// Rendered evidence text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceContext(String);

impl EvidenceContext {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EvidenceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Render rows, documents, and their source map into the evidence layout.
pub fn build_context(
    rows: &[SideEffectRecord],
    docs: &[ScrapedDocument],
    source_map: &SourceMap,
) -> EvidenceContext {
    let mut lines: Vec<String> = Vec::new();

    lines.push("SOURCE MAP:".to_string());
    for (phrase, sources) in source_map.iter() {
        lines.push(format!("- {phrase}: {}", sources.join(", ")));
    }

    lines.push(format!("\nSTRUCTURED DATA ({STRUCTURED_SOURCE_TAG}):"));
    if rows.is_empty() {
        lines.push(NO_STRUCTURED_DATA.to_string());
    } else {
        for row in rows {
            let fields: Vec<String> = row
                .present_columns()
                .map(|(name, value)| format!("{name}: {value}"))
                .collect();
            lines.push(format!("- {}", fields.join(" | ")));
        }
    }

    lines.push("\nSCRAPED WEB DOCUMENTS:".to_string());
    if docs.is_empty() {
        lines.push(NO_DOCUMENTS.to_string());
    } else {
        for doc in docs {
            lines.push(format!("\nSource: {}", doc.url()));
            if !doc.side_effects().is_empty() {
                lines.push(format!(
                    "Extracted side effects: {}",
                    doc.side_effects().join(", ")
                ));
            }
            lines.push(format!("Excerpt: {}", excerpt(doc.text())));
        }
    }

    EvidenceContext(lines.join("\n"))
}

/// First [`EXCERPT_CAP`] characters, flattened to a single line.
fn excerpt(text: &str) -> String {
    truncate_chars(text, EXCERPT_CAP).replace(['\r', '\n'], " ")
}
