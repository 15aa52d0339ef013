//! FAERS code legend for the `outcome` and `drug_suspicion` columns.

/// Outcome codes with their meaning.
pub const OUTCOME_CODES: &[(&str, &str)] = &[
    ("DE", "Death"),
    ("LT", "Life-Threatening"),
    ("HO", "Hospitalization - Initial or Prolonged"),
    ("DS", "Disability"),
    ("CA", "Congenital Anomaly"),
    ("RI", "Required Intervention to Prevent Permanent Impairment/Damage"),
    ("OT", "Other Serious (Important Medical Event)"),
];

/// Drug suspicion (role) codes with their meaning.
pub const SUSPICION_CODES: &[(&str, &str)] = &[
    ("PS", "Primary Suspect Drug"),
    ("SS", "Secondary Suspect Drug"),
    ("C", "Concomitant"),
    ("I", "Interacting"),
    ("DN", "Drug Not Administered"),
];

/// Label for an outcome code, case-insensitive.
pub fn outcome_label(code: &str) -> Option<&'static str> {
    lookup(OUTCOME_CODES, code)
}

/// Label for a drug suspicion code, case-insensitive.
pub fn suspicion_label(code: &str) -> Option<&'static str> {
    lookup(SUSPICION_CODES, code)
}

fn lookup(table: &'static [(&'static str, &'static str)], code: &str) -> Option<&'static str> {
    let code = code.trim();
    table
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, label)| *label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_resolve_case_insensitively() {
        assert_eq!(outcome_label("ho"), Some("Hospitalization - Initial or Prolonged"));
        assert_eq!(suspicion_label(" PS "), Some("Primary Suspect Drug"));
        assert_eq!(outcome_label("ZZ"), None);
    }
}
