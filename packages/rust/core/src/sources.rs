//! Default web sources for a medication.

/// Publisher pages that usually carry a side-effect section for `medication`.
///
/// The name is trimmed, lower-cased, and spaces become hyphens. Order is
/// drugs.com, Mayo Clinic, MedlinePlus. A blank name yields no URLs.
pub fn medication_urls(medication: &str) -> Vec<String> {
    let slug = medication
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase();

    if slug.is_empty() {
        return Vec::new();
    }

    vec![
        format!("https://www.drugs.com/sfx/{slug}-side-effects.html"),
        format!("https://www.mayoclinic.org/drugs-supplements/{slug}/side-effects"),
        format!("https://medlineplus.gov/druginfo/meds/{slug}.html"),
    ]
}
