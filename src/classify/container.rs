//! Container detection: gazette issues and bulletin wrappers are audit
//! records, not procedures.

use crate::models::DiscoverySource;

use super::classifier::ClassifierResult;
use super::keywords::{BESS_CONTAINER_GRID, BESS_EXPLICIT, BESS_MEDIUM, RIS_PRIVILEGED};

/// Why an item was not persisted as a procedure. The `as_str` values are
/// stable log tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Container,
    NoProcedureSignal,
    LowConfidenceNoSignal,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Container => "SKIP_CONTAINER",
            Self::NoProcedureSignal => "SKIP_NO_PROCEDURE_SIGNAL",
            Self::LowConfidenceNoSignal => "SKIP_LOW_CONFIDENCE_NO_SIGNAL",
        }
    }
}

const CONTAINER_KEYWORDS: &[&str] = &[
    "amtsblatt",
    "sonderamtsblatt",
    "bekanntmachungsblatt",
    "ausgabe",
    "jahrgang",
];

const PROCEDURE_KEYWORDS: &[&str] = &[
    "bebauungsplan",
    "b-plan",
    "bauleitplanung",
    "aufstellungsbeschluss",
    "satzungsbeschluss",
    "auslegung",
    "bauvorbescheid",
    "baugenehmigung",
    "einvernehmen",
    "§ 35",
    "§ 34",
    "§ 36",
    "batteriespeicher",
    "energiespeicher",
];

/// True when title or URL mark the item as a wrapper issue rather than a
/// single procedure.
pub fn is_container(title_norm: &str, url: &str) -> bool {
    let combined = format!("{} {}", title_norm, url.to_lowercase());
    let has_container = CONTAINER_KEYWORDS.iter().any(|k| combined.contains(k));
    let has_procedure = PROCEDURE_KEYWORDS.iter().any(|k| combined.contains(k));
    has_container && !has_procedure
}

/// Gate persisted procedures.
///
/// Containers are rejected unless the extracted content proves a relevant
/// BESS procedure, or the item comes from RIS with privileged project
/// language. Rejected items become audit-only sources.
pub fn is_valid_procedure(
    title_norm: &str,
    url: &str,
    source: DiscoverySource,
    result: &ClassifierResult,
    text_norm: &str,
) -> Result<(), SkipReason> {
    let combined = format!("{} {}", title_norm, text_norm);
    let has_bess_signal = BESS_EXPLICIT.matches(&combined)
        || BESS_MEDIUM.matches(&combined)
        || BESS_CONTAINER_GRID.matches(&combined);
    let ris_privileged = source == DiscoverySource::Ris && RIS_PRIVILEGED.matches(&combined);

    if is_container(title_norm, url) {
        if (result.is_relevant && has_bess_signal) || ris_privileged {
            return Ok(());
        }
        return Err(SkipReason::Container);
    }

    if result.is_relevant || (result.is_candidate && has_bess_signal) || ris_privileged {
        return Ok(());
    }

    let has_procedure_text = PROCEDURE_KEYWORDS.iter().any(|k| combined.contains(k));
    if !has_procedure_text {
        return Err(SkipReason::NoProcedureSignal);
    }
    if !has_bess_signal && result.confidence < 0.2 {
        return Err(SkipReason::LowConfidenceNoSignal);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::models::DiscoverySource;

    #[test]
    fn gazette_issue_is_container() {
        assert!(is_container(
            "amtsblatt nr. 07/2024 der stadt beispielstadt",
            "https://www.beispielstadt.de/amtsblatt/07.pdf"
        ));
        assert!(!is_container(
            "oeffentliche auslegung bebauungsplan nr. 5",
            "https://www.beispielstadt.de/bauleitplanung"
        ));
    }

    #[test]
    fn container_without_signal_is_rejected() {
        let title = "Amtsblatt Nr. 07/2024 der Stadt Beispielstadt";
        let text = "Inhalt: Hundesteuer, Friedhofsordnung, Jubiläen.";
        let result = classify(text, title, None, DiscoverySource::Amtsblatt);
        let verdict = is_valid_procedure(
            "amtsblatt nr. 07/2024 der stadt beispielstadt",
            "https://www.beispielstadt.de/amtsblatt/07.pdf",
            DiscoverySource::Amtsblatt,
            &result,
            "inhalt: hundesteuer, friedhofsordnung, jubilaeen.",
        );
        assert_eq!(verdict, Err(SkipReason::Container));
    }

    #[test]
    fn container_with_relevant_bess_content_is_kept() {
        let title = "Amtsblatt Nr. 03/2024";
        let text = "Öffentliche Auslegung des Bebauungsplans Batteriespeicher Süd \
                    gemäß § 3 Abs. 2 BauGB.";
        let result = classify(text, title, None, DiscoverySource::Amtsblatt);
        // Classifier sees the BESS procedure inside the issue body, so the
        // item survives despite its container title.
        let verdict = is_valid_procedure(
            "amtsblatt nr. 03/2024",
            "https://www.beispielstadt.de/amtsblatt/03.pdf",
            DiscoverySource::Amtsblatt,
            &result,
            "oeffentliche auslegung des bebauungsplans batteriespeicher sued gemaess § 3 abs. 2 baugb.",
        );
        assert_eq!(verdict, Ok(()));
    }

    #[test]
    fn ris_privileged_language_is_kept_even_untagged() {
        let title = "TOP 8: Stellungnahme der Gemeinde zum Vorhaben Flurstück 44";
        let text = "Die Gemeinde nimmt Stellung zum Bauantrag.";
        let result = classify(text, title, None, DiscoverySource::Ris);
        let verdict = is_valid_procedure(
            "top 8: stellungnahme der gemeinde zum vorhaben flurstueck 44",
            "https://ris.example.de/to0100.asp?id=8",
            DiscoverySource::Ris,
            &result,
            "die gemeinde nimmt stellung zum bauantrag.",
        );
        assert_eq!(verdict, Ok(()));
    }

    #[test]
    fn unrelated_item_has_no_procedure_signal() {
        let title = "Eröffnung des neuen Spielplatzes";
        let text = "Die Stadt lädt zur Eröffnung ein.";
        let result = classify(text, title, None, DiscoverySource::MunicipalWebsite);
        let verdict = is_valid_procedure(
            "eroeffnung des neuen spielplatzes",
            "https://www.beispielstadt.de/aktuelles",
            DiscoverySource::MunicipalWebsite,
            &result,
            "die stadt laedt zur eroeffnung ein.",
        );
        assert_eq!(verdict, Err(SkipReason::NoProcedureSignal));
    }
}
