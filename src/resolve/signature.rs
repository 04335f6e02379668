//! Project signatures: the stable keys procedures are matched on.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::classify::normalize;

static PLAN_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"b(?:ebauungs)?-?plan\s*(?:nr\.?|nummer)?\s*([a-z0-9\-/]+)").expect("pattern")
});
static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[„\"']([^„\"']{5,50})[“\"']").expect("pattern"));
static GEMARKUNG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"gemarkung\s*:?\s*([a-z][a-z \-]{1,40})").expect("pattern"));
static FLUR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"flur\s*:?\s*(\d{1,4})").expect("pattern"));
static FLURSTUECK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"flurstueck\s*:?\s*(\d{1,5}(?:/\d{1,4})?[a-z]?)").expect("pattern"));
static LEGAL_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s+)(?:gmbh & co\. kg|gmbh|ag|ug|kg|gbr|ohg|e\.v\.|e\.k\.)\s*$")
        .expect("pattern")
});
static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-z]{4,}").expect("pattern"));

/// Phrases that carry procedure state, not project identity.
const STOP_PHRASES: &[&str] = &[
    "oeffentliche auslegung",
    "fruehzeitige beteiligung",
    "aufstellungsbeschluss",
    "satzungsbeschluss",
    "bekanntmachung",
    "tagesordnung",
    "beschluss",
    "verfahren",
    "sitzung",
];

/// Tokens too generic to identify a project.
const STOPWORDS: &[&str] = &[
    "ueber", "einer", "eines", "gemaess", "nach", "zur", "zum", "baugb", "gemeinde", "stadt",
    "errichtung", "antrag",
];

/// The matching key of one procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSignature {
    pub plan_token: Option<String>,
    pub parcel_token: Option<String>,
    pub developer_norm: Option<String>,
    pub title_signature: BTreeSet<String>,
}

impl ProjectSignature {
    /// Space-joined signature tokens, for persistence.
    pub fn title_signature_string(&self) -> String {
        self.title_signature
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn title_signature_from_string(s: &str) -> BTreeSet<String> {
        s.split_whitespace().map(|t| t.to_string()).collect()
    }
}

/// Compute the signature from title, evidence text, location and developer.
pub fn compute_signature(
    title: &str,
    evidence_text: &str,
    site_location_raw: Option<&str>,
    developer_company: Option<&str>,
) -> ProjectSignature {
    ProjectSignature {
        plan_token: extract_plan_token(title, evidence_text),
        parcel_token: site_location_raw.and_then(extract_parcel_token),
        developer_norm: developer_company.and_then(normalize_company_name),
        title_signature: extract_title_signature(title),
    }
}

/// Plan token: a B-Plan number, else the largest quoted string in the title.
pub fn extract_plan_token(title: &str, text: &str) -> Option<String> {
    let combined = normalize(&format!("{} {}", title, text)).text;
    if let Some(caps) = PLAN_NUMBER.captures(&combined) {
        return Some(caps[1].trim_matches('-').to_string());
    }

    let title_norm = normalize(title).text;
    QUOTED
        .captures_iter(&title_norm)
        .map(|caps| caps[1].trim().to_string())
        .max_by_key(|s| s.len())
}

/// Parcel token: normalized (gemarkung, flur, flurstueck) triple.
pub fn extract_parcel_token(site_location_raw: &str) -> Option<String> {
    let lowered = normalize(site_location_raw).text;
    let mut parts = Vec::new();

    if let Some(caps) = GEMARKUNG.captures(&lowered) {
        parts.push(format!("gemarkung={}", caps[1].trim()));
    }
    if let Some(caps) = FLUR.captures(&lowered) {
        parts.push(format!("flur={}", &caps[1]));
    }
    if let Some(caps) = FLURSTUECK.captures(&lowered) {
        parts.push(format!("flurstueck={}", &caps[1]));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(";"))
    }
}

/// Company name with legal suffixes stripped, lowercased.
pub fn normalize_company_name(company: &str) -> Option<String> {
    let lowered = normalize(company).text;
    let stripped = LEGAL_SUFFIX.replace(&lowered, "");
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Content tokens of the title: length >= 4, procedural wording removed.
pub fn extract_title_signature(title: &str) -> BTreeSet<String> {
    let mut text = normalize(title).text;
    for phrase in STOP_PHRASES {
        text = text.replace(phrase, " ");
    }
    WORD.find_iter(&text)
        .map(|m| m.as_str().to_string())
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .take(10)
        .collect()
}

/// Jaccard similarity of two token sets.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    intersection / union
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_number_extraction() {
        assert_eq!(
            extract_plan_token("Aufstellungsbeschluss für Bebauungsplan Nr. 5", ""),
            Some("5".to_string())
        );
        assert_eq!(
            extract_plan_token("B-Plan Nr. 12/2024 Batteriespeicheranlage", ""),
            Some("12/2024".to_string())
        );
    }

    #[test]
    fn quoted_plan_name_fallback() {
        let token = extract_plan_token("Satzungsbeschluss „Energiepark Metzdorf Sued“", "");
        assert_eq!(token, Some("energiepark metzdorf sued".to_string()));
    }

    #[test]
    fn parcel_token_triple() {
        let token =
            extract_parcel_token("Gemarkung: Musterstadt; Flur: 3; Flurstück: 12/4").unwrap();
        assert!(token.contains("gemarkung=musterstadt"));
        assert!(token.contains("flur=3"));
        assert!(token.contains("flurstueck=12/4"));
    }

    #[test]
    fn company_normalization_strips_suffixes() {
        assert_eq!(
            normalize_company_name("Beispiel Energie GmbH"),
            Some("beispiel energie".to_string())
        );
        assert_eq!(normalize_company_name("Test AG"), Some("test".to_string()));
        assert_eq!(normalize_company_name("  GmbH "), None);
    }

    #[test]
    fn title_signature_drops_procedural_wording() {
        let sig = extract_title_signature(
            "Aufstellungsbeschluss zur öffentlichen Auslegung für Bebauungsplan Batteriespeicher",
        );
        assert!(sig.contains("bebauungsplan"));
        assert!(sig.contains("batteriespeicher"));
        assert!(!sig.contains("aufstellungsbeschluss"));
    }

    #[test]
    fn jaccard_bounds() {
        let a: BTreeSet<String> = ["speicher", "metzdorf"].iter().map(|s| s.to_string()).collect();
        let b: BTreeSet<String> = ["speicher", "metzdorf"].iter().map(|s| s.to_string()).collect();
        let c: BTreeSet<String> = ["windpark"].iter().map(|s| s.to_string()).collect();
        assert_eq!(jaccard(&a, &b), 1.0);
        assert_eq!(jaccard(&a, &c), 0.0);
    }
}
