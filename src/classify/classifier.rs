//! Deterministic relevance classifier.
//!
//! `classify` is a pure function over the raw text, title, date and
//! discovery source: identical inputs produce identical results. The
//! keyword lattice in [`super::keywords`] is its only ground truth.

use chrono::NaiveDate;

use crate::models::{DiscoverySource, LegalBasis, ProcedureType, ProjectComponents};

use super::keywords::{
    TermSet, BESS_CONTAINER_GRID, BESS_EXPLICIT, BESS_MEDIUM, ENERGY_CONTEXT, GRID_MEDIUM,
    GRID_STRONG, LEGAL_PARA_34, LEGAL_PARA_35, LEGAL_PARA_36, NEGATIVE_STORAGE, PERMIT_STRONG,
    PLANNING_STEPS, PLANNING_STRONG,
};
use super::normalize::normalize;

/// Maximum number of evidence snippets per classification.
const MAX_EVIDENCE_SNIPPETS: usize = 6;
/// Evidence window, in bytes, on each side of the matched term.
const EVIDENCE_MARGIN: usize = 80;

/// Rule R2 only accepts titles dated on or after this day.
fn r2_cutoff() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).expect("valid cutoff date")
}

/// Result of classifying one item.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierResult {
    /// Whether the item carries any BESS signal at all.
    pub is_candidate: bool,
    pub is_relevant: bool,
    pub procedure_type: ProcedureType,
    pub legal_basis: LegalBasis,
    pub project_components: ProjectComponents,
    pub confidence: f64,
    pub bess_score: f64,
    pub grid_score: f64,
    pub ambiguity_flag: bool,
    pub review_recommended: bool,
    pub evidence_snippets: Vec<String>,
}

impl ClassifierResult {
    fn irrelevant(is_candidate: bool) -> Self {
        Self {
            is_candidate,
            is_relevant: false,
            procedure_type: ProcedureType::Unknown,
            legal_basis: LegalBasis::Unknown,
            project_components: ProjectComponents::OtherUnclear,
            confidence: 0.0,
            bess_score: 0.0,
            grid_score: 0.0,
            ambiguity_flag: false,
            review_recommended: false,
            evidence_snippets: Vec::new(),
        }
    }
}

/// Classify one item. Pure and deterministic.
pub fn classify(
    text_raw: &str,
    title_raw: &str,
    date: Option<NaiveDate>,
    _source: DiscoverySource,
) -> ClassifierResult {
    let text = normalize(text_raw);
    let title = normalize(title_raw);
    let combined = format!("{} {}", text.text, title.text);

    let has_explicit = BESS_EXPLICIT.matches(&combined);
    let has_medium = BESS_MEDIUM.matches(&combined);
    let has_negative = NEGATIVE_STORAGE.matches(&combined);
    let is_candidate = has_explicit || BESS_CONTAINER_GRID.matches(&combined);

    // Negative storage wording without an explicit battery term is a hard
    // reject regardless of anything else.
    if has_negative && !has_explicit {
        return ClassifierResult::irrelevant(is_candidate);
    }

    let has_procedure = PLANNING_STEPS.matches(&combined)
        || PLANNING_STRONG.matches(&combined)
        || PERMIT_STRONG.matches(&combined);

    // R1: explicit BESS term plus any procedure language.
    let r1 = has_explicit && has_procedure;

    // R2: explicit BESS term in the title, recent or undated.
    let r2 = BESS_EXPLICIT.matches(&title.text)
        && date.map(|d| d >= r2_cutoff()).unwrap_or(true);

    // R3: generic "speicher" backed by at least two grid/container terms and
    // procedure language. Ambiguous by construction.
    let grid_term_count = BESS_CONTAINER_GRID.count_distinct(&combined)
        + GRID_STRONG.count_distinct(&combined)
        + GRID_MEDIUM.count_distinct(&combined);
    let r3 = (combined.contains("speicher") || has_medium)
        && grid_term_count >= 2
        && has_procedure
        && !has_negative;

    let is_relevant = r1 || r2 || r3;
    if !is_relevant {
        return ClassifierResult::irrelevant(is_candidate);
    }

    let mut ambiguity_flag = r3 && !(r1 || r2);
    // Storage wording without a single explicit battery term stays flagged.
    if !has_explicit {
        ambiguity_flag = true;
    }

    let procedure_type = tag_procedure_type(&combined);
    let legal_basis = tag_legal_basis(&combined);
    let project_components = tag_project_components(&combined);

    let confidence = score_confidence(
        &combined,
        has_explicit,
        has_medium,
        has_negative,
        ambiguity_flag,
        date,
    );

    let review_recommended =
        procedure_type == ProcedureType::Unknown || (0.35..=0.65).contains(&confidence);

    let evidence_snippets = collect_evidence(text_raw, &text);

    ClassifierResult {
        is_candidate,
        is_relevant,
        procedure_type,
        legal_basis,
        project_components,
        confidence,
        bess_score: bess_score(&combined),
        grid_score: grid_score(&combined),
        ambiguity_flag,
        review_recommended,
        evidence_snippets,
    }
}

/// First matching procedure type, checked in fixed order.
fn tag_procedure_type(text: &str) -> ProcedureType {
    if text.contains("aufstellungsbeschluss") || text.contains("beschluss zur aufstellung") {
        ProcedureType::BplanAufstellung
    } else if text.contains("fruehzeitige beteiligung") || text.contains("§ 3 abs. 1 baugb") {
        ProcedureType::BplanFruehzeitig31
    } else if text.contains("oeffentliche auslegung")
        || text.contains("auslegung der unterlagen")
        || text.contains("§ 3 abs. 2 baugb")
    {
        ProcedureType::BplanAuslegung32
    } else if text.contains("satzungsbeschluss") || text.contains("als satzung beschlossen") {
        ProcedureType::BplanSatzung
    } else if PLANNING_STRONG.matches(text) {
        ProcedureType::BplanOther
    } else if text.contains("bauvorbescheid") || text.contains("vorbescheid") {
        ProcedureType::PermitBauvorbescheid
    } else if text.contains("baugenehmigung") {
        ProcedureType::PermitBaugenehmigung
    } else if text.contains("einvernehmen") && (text.contains("§36") || text.contains("§ 36")) {
        ProcedureType::Permit36Einvernehmen
    } else if text.contains("bauantrag")
        || text.contains("bauvoranfrage")
        || text.contains("bauvorantrag")
        || text.contains("antrag auf errichtung")
        || (text.contains("kenntnisnahme") && text.contains("vorhaben"))
    {
        ProcedureType::PermitOther
    } else {
        ProcedureType::Unknown
    }
}

/// Legal basis tag. Tolerates the broken whitespace RIS PDFs produce.
fn tag_legal_basis(text: &str) -> LegalBasis {
    if LEGAL_PARA_35.matches(text) {
        LegalBasis::Para35
    } else if LEGAL_PARA_34.matches(text) {
        LegalBasis::Para34
    } else if LEGAL_PARA_36.matches(text) {
        LegalBasis::Para36
    } else {
        LegalBasis::Unknown
    }
}

/// Component tag: what the project consists of.
fn tag_project_components(text: &str) -> ProjectComponents {
    let has_pv = text.contains("photovoltaik") || text.contains("solarpark") || text.contains("pv");
    let has_wind = text.contains("windenergie") || text.contains("windpark");
    let mut has_bess = BESS_EXPLICIT.matches(text) || text.contains("speicher");
    // A container installation next to grid gear is a storage site.
    if text.contains("containeranlage") && (GRID_STRONG.matches(text) || GRID_MEDIUM.matches(text))
    {
        has_bess = true;
    }
    if text.contains("anlage zur energiespeicherung") {
        has_bess = true;
    }

    if has_pv && has_bess {
        ProjectComponents::PvBess
    } else if has_wind && has_bess {
        ProjectComponents::WindBess
    } else if has_bess {
        ProjectComponents::BessOnly
    } else {
        ProjectComponents::OtherUnclear
    }
}

/// Confidence in [0, 1].
fn score_confidence(
    text: &str,
    has_explicit: bool,
    has_medium: bool,
    has_negative: bool,
    ambiguity_flag: bool,
    date: Option<NaiveDate>,
) -> f64 {
    if has_negative && !has_explicit {
        return 0.0;
    }

    let mut score: f64 = 0.0;
    if has_explicit {
        score += 0.55;
    } else if has_medium {
        score += 0.35;
    } else if text.contains("speicher") && ENERGY_CONTEXT.matches(text) {
        score += 0.15;
    }

    if PLANNING_STEPS.matches(text) || PERMIT_STRONG.matches(text) {
        score += 0.25;
    }
    if GRID_STRONG.matches(text) {
        score += 0.10;
    }
    if has_negative && !has_explicit {
        score -= 0.60;
    }
    if ambiguity_flag {
        score -= 0.25;
    }
    if date.is_none() {
        score -= 0.15;
    }

    score.clamp(0.0, 1.0)
}

/// Weighted BESS vocabulary score, used as a diagnostic alongside the
/// confidence value.
fn bess_score(text: &str) -> f64 {
    const WEIGHTS: &[(&str, f64)] = &[
        ("batteriespeicher", 10.0),
        ("bess", 10.0),
        ("stromspeicher", 6.0),
        ("energiespeicher", 5.0),
        ("speichercontainer", 4.0),
        ("speicheranlage", 4.0),
        ("lithium", 4.0),
        ("containeranlage", 3.0),
        ("speicher", 1.0),
    ];
    WEIGHTS
        .iter()
        .filter(|(term, _)| text.contains(term))
        .map(|(_, w)| w)
        .sum()
}

/// Weighted grid-infrastructure score.
fn grid_score(text: &str) -> f64 {
    const WEIGHTS: &[(&str, f64)] = &[
        ("umspannwerk", 5.0),
        ("110 kv", 5.0),
        ("220 kv", 5.0),
        ("380 kv", 5.0),
        ("hochspannung", 4.0),
        ("hoechstspannung", 4.0),
        ("mittelspannung", 3.0),
        ("20 kv", 3.0),
        ("30 kv", 3.0),
        ("schaltanlage", 2.0),
        ("netzanschluss", 2.0),
        ("trafostation", 1.0),
    ];
    let mut total: f64 = WEIGHTS
        .iter()
        .filter(|(term, _)| text.contains(term))
        .map(|(_, w)| w)
        .sum();
    // Substation next to an explicit voltage level is a strong combination.
    if (text.contains("umspannwerk") || text.contains("schaltanlage"))
        && ["110", "220", "380"].iter().any(|v| text.contains(v))
    {
        total += 2.0;
    }
    total
}

/// Windows of original text around the earliest occurrence of each matched
/// strong term. At most [`MAX_EVIDENCE_SNIPPETS`].
fn collect_evidence(text_raw: &str, text: &super::normalize::Normalized) -> Vec<String> {
    let strong_sets: [&TermSet; 5] = [
        &BESS_EXPLICIT,
        &PLANNING_STEPS,
        &PLANNING_STRONG,
        &PERMIT_STRONG,
        &GRID_STRONG,
    ];

    let mut hits: Vec<(usize, usize)> = Vec::new();
    for set in strong_sets {
        for (_, start, end) in set.find_all(&text.text) {
            hits.push((start, end));
        }
    }
    hits.sort_unstable();
    hits.dedup();

    let mut snippets = Vec::new();
    let mut last_end = 0usize;
    for (start, end) in hits {
        if snippets.len() >= MAX_EVIDENCE_SNIPPETS {
            break;
        }
        // Skip hits whose window would repeat the previous snippet.
        if start < last_end {
            continue;
        }
        let window = text.original_window(text_raw, start, end, EVIDENCE_MARGIN);
        let trimmed = window.trim();
        if !trimmed.is_empty() {
            snippets.push(trimmed.to_string());
            last_end = end + EVIDENCE_MARGIN;
        }
    }
    snippets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn aufstellung_with_explicit_bess_is_relevant() {
        let text = "Die Gemeindevertretung hat den Aufstellungsbeschluss für den \
                    Bebauungsplan \"Batteriespeicheranlage Metzdorf\" gefasst.";
        let result = classify(
            text,
            "Aufstellungsbeschluss Bebauungsplan Nr. 12/2024 Batteriespeicheranlage Metzdorf",
            date(2024, 3, 1),
            DiscoverySource::Ris,
        );
        assert!(result.is_relevant);
        assert_eq!(result.procedure_type, ProcedureType::BplanAufstellung);
        assert_eq!(result.legal_basis, LegalBasis::Unknown);
        assert_eq!(result.project_components, ProjectComponents::BessOnly);
        assert!((result.confidence - 0.80).abs() < 1e-9);
        assert!(!result.review_recommended);
        assert!(!result.evidence_snippets.is_empty());
    }

    #[test]
    fn r2_fires_on_title_only_for_recent_dates() {
        let result = classify(
            "Tagesordnungspunkt 7, Anlagen siehe Sitzungsmappe.",
            "Batteriespeicher Gewerbegebiet Ost",
            date(2024, 6, 1),
            DiscoverySource::Ris,
        );
        assert!(result.is_relevant);

        let old = classify(
            "Tagesordnungspunkt 7, Anlagen siehe Sitzungsmappe.",
            "Batteriespeicher Gewerbegebiet Ost",
            date(2021, 6, 1),
            DiscoverySource::Ris,
        );
        assert!(!old.is_relevant);

        let undated = classify(
            "Tagesordnungspunkt 7, Anlagen siehe Sitzungsmappe.",
            "Batteriespeicher Gewerbegebiet Ost",
            None,
            DiscoverySource::Ris,
        );
        assert!(undated.is_relevant);
    }

    #[test]
    fn r3_ambiguous_with_grid_sets_flag() {
        let result = classify(
            "Bauleitplanung Sondergebiet Photovoltaik mit Speicheranlage, \
             Umspannwerk Anschluss 110 kV",
            "Bauleitplanung Sondergebiet Photovoltaik",
            None,
            DiscoverySource::MunicipalWebsite,
        );
        assert!(result.is_relevant);
        assert!(result.ambiguity_flag);
        assert_eq!(result.project_components, ProjectComponents::PvBess);
        assert!(!result.review_recommended);
    }

    #[test]
    fn negative_storage_without_explicit_bess_rejects() {
        let result = classify(
            "Satzung über die öffentliche Bekanntmachung. Der Wärmespeicher der \
             Stadtwerke wird erweitert.",
            "Satzung über die öffentliche Bekanntmachung — Wärmespeicher Stadtwerke",
            date(2024, 2, 1),
            DiscoverySource::Amtsblatt,
        );
        assert!(!result.is_relevant);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn einvernehmen_36_tagged_with_legal_basis() {
        let result = classify(
            "Einvernehmen gemäß § 36 BauGB — Errichtung einer Batteriespeicheranlage \
             auf Flurstück 123/4 der Gemarkung Metzdorf.",
            "Einvernehmen gemäß §36 BauGB — Errichtung einer Batteriespeicheranlage",
            date(2024, 4, 2),
            DiscoverySource::Ris,
        );
        assert!(result.is_relevant);
        assert_eq!(result.procedure_type, ProcedureType::Permit36Einvernehmen);
        assert_eq!(result.legal_basis, LegalBasis::Para36);
    }

    #[test]
    fn classifier_is_deterministic() {
        let args = (
            "Öffentliche Auslegung des Bebauungsplans, Energiespeicher 30 MW",
            "Öffentliche Auslegung Energiespeicher",
            date(2024, 1, 1),
        );
        let a = classify(args.0, args.1, args.2, DiscoverySource::Amtsblatt);
        let b = classify(args.0, args.1, args.2, DiscoverySource::Amtsblatt);
        assert_eq!(a, b);
    }

    #[test]
    fn broken_whitespace_still_tags_legal_basis() {
        let result = classify(
            "Antrag auf Bauvorbescheid, privilegiertes Vorhaben im Au ßenbereich, \
             Batterie speicher mit Netzanschluss",
            "Bauvorbescheid Batteriespeicher",
            date(2024, 7, 1),
            DiscoverySource::Ris,
        );
        assert!(result.is_relevant);
        assert_eq!(result.procedure_type, ProcedureType::PermitBauvorbescheid);
        assert_eq!(result.legal_basis, LegalBasis::Para35);
    }

    #[test]
    fn evidence_snippets_come_from_original_text() {
        let text = "Vorlage 2024/17: Die Gemeinde beschließt die Aufstellung des \
                    Bebauungsplans „Energiespeicher Süd“. Der Batteriespeicher wird \
                    über ein Umspannwerk angeschlossen.";
        let result = classify(text, "Vorlage 2024/17", date(2024, 5, 5), DiscoverySource::Ris);
        assert!(result.evidence_snippets.len() <= 6);
        assert!(result
            .evidence_snippets
            .iter()
            .any(|s| s.contains("Batteriespeicher") || s.contains("Energiespeicher")));
    }
}
