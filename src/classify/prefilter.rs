//! Prefilter: fast scoring over title + URL that gates extraction.
//!
//! Discovery emits every listing item as a candidate; only candidates whose
//! score reaches the source-aware threshold are fetched and classified.

use crate::models::{CrawlMode, DiscoverySource};

use super::keywords::{BESS_EXPLICIT, PERMIT_STRONG, PLANNING_STEPS, PLANNING_STRONG};
use super::normalize::normalize;

/// Container-ish title fragments that usually wrap many unrelated notices.
const CONTAINER_TITLE_TERMS: &[&str] = &[
    "amtsblatt",
    "sonderamtsblatt",
    "bekanntmachungsblatt",
    "bekanntmachung der stadt",
    "ausgabe",
    "jahrgang",
];

/// URL fragments that indicate procedure-bearing pages.
const URL_PROCEDURE_TERMS: &[&str] = &[
    "bauleitplanung",
    "bebauungsplan",
    "amtsblatt",
    "ris",
    "sessionnet",
    "sitzung",
];

/// Score a discovery item without fetching anything. Result is in [-1, 1].
pub fn prefilter_score(title: &str, url: &str) -> f64 {
    let title_norm = normalize(title).text;
    let url_lower = url.to_lowercase();

    let mut score: f64 = 0.0;

    if BESS_EXPLICIT.matches(&title_norm) {
        score += 0.6;
    }

    let has_procedure_signal = PLANNING_STEPS.matches(&title_norm)
        || PLANNING_STRONG.matches(&title_norm)
        || PERMIT_STRONG.matches(&title_norm);
    if has_procedure_signal {
        score += 0.3;
    }

    if URL_PROCEDURE_TERMS.iter().any(|t| url_lower.contains(t)) {
        score += 0.2;
    }

    let is_container_title = CONTAINER_TITLE_TERMS.iter().any(|t| title_norm.contains(t));
    if is_container_title && !has_procedure_signal {
        score -= 0.7;
    }

    score.clamp(-1.0, 1.0)
}

/// Extraction threshold per (source, mode).
pub fn threshold(source: DiscoverySource, mode: CrawlMode) -> f64 {
    match (source, mode) {
        (DiscoverySource::Ris, CrawlMode::Fast) => 0.35,
        (DiscoverySource::Ris, CrawlMode::Deep) => 0.20,
        (DiscoverySource::Amtsblatt, CrawlMode::Fast) => 0.50,
        (DiscoverySource::Amtsblatt, CrawlMode::Deep) => 0.30,
        (DiscoverySource::MunicipalWebsite, CrawlMode::Fast) => 0.60,
        (DiscoverySource::MunicipalWebsite, CrawlMode::Deep) => 0.50,
        (_, CrawlMode::Fast) => 0.60,
        (_, CrawlMode::Deep) => 0.30,
    }
}

/// Whether a candidate with this score is eligible for extraction.
pub fn should_extract(score: f64, source: DiscoverySource, mode: CrawlMode) -> bool {
    score >= threshold(source, mode)
}
