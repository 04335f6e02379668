//! Frozen keyword lattice for BESS relevance decisions.
//!
//! These sets are the only ground truth for relevance. All matching runs
//! against normalized text (see [`super::normalize`]). Terms tolerate one
//! inserted whitespace between adjacent characters because PDF extraction
//! frequently splits words; short terms are matched verbatim so the
//! tolerance cannot bridge across word boundaries.

use std::sync::LazyLock;

use regex::Regex;

/// A keyword compiled into a whitespace-tolerant regex.
#[derive(Debug)]
pub struct FlexTerm {
    raw: &'static str,
    re: Regex,
}

/// Words shorter than this are matched verbatim instead of flexibly.
const FLEX_MIN_WORD_LEN: usize = 4;

impl FlexTerm {
    fn compile(term: &'static str) -> Self {
        let mut pattern = String::new();
        for (i, word) in term.split(' ').enumerate() {
            if i > 0 {
                pattern.push_str(r"\s");
            }
            let chars: Vec<char> = word.chars().collect();
            if chars.len() < FLEX_MIN_WORD_LEN {
                pattern.push_str(&regex::escape(word));
            } else {
                for (j, ch) in chars.iter().enumerate() {
                    if j > 0 {
                        pattern.push_str(r"\s?");
                    }
                    pattern.push_str(&regex::escape(&ch.to_string()));
                }
            }
        }
        Self {
            raw: term,
            re: Regex::new(&pattern).expect("keyword pattern must compile"),
        }
    }

    pub fn raw(&self) -> &'static str {
        self.raw
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.re.is_match(text)
    }

    /// Byte range of the earliest occurrence.
    pub fn find(&self, text: &str) -> Option<(usize, usize)> {
        self.re.find(text).map(|m| (m.start(), m.end()))
    }
}

/// A frozen group of keywords.
#[derive(Debug)]
pub struct TermSet {
    terms: Vec<FlexTerm>,
}

impl TermSet {
    fn new(terms: &[&'static str]) -> Self {
        Self {
            terms: terms.iter().map(|t| FlexTerm::compile(t)).collect(),
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        self.terms.iter().any(|t| t.is_match(text))
    }

    /// Number of distinct terms present.
    pub fn count_distinct(&self, text: &str) -> usize {
        self.terms.iter().filter(|t| t.is_match(text)).count()
    }

    /// All matched terms with the byte range of their earliest occurrence.
    pub fn find_all(&self, text: &str) -> Vec<(&'static str, usize, usize)> {
        self.terms
            .iter()
            .filter_map(|t| t.find(text).map(|(s, e)| (t.raw, s, e)))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlexTerm> {
        self.terms.iter()
    }
}

/// Unambiguous battery-storage language.
pub static BESS_EXPLICIT: LazyLock<TermSet> = LazyLock::new(|| {
    TermSet::new(&[
        "batteriespeicher",
        "energiespeicher",
        "stromspeicher",
        "battery energy storage",
        "bess",
    ])
});

/// Storage wording that needs context: plant-scale but not battery-explicit.
pub static BESS_MEDIUM: LazyLock<TermSet> = LazyLock::new(|| {
    TermSet::new(&[
        "speicheranlage",
        "speicherpark",
        "speicherkraftwerk",
        "grossspeicher",
    ])
});

/// Container/grid wording that, combined, points at a BESS.
pub static BESS_CONTAINER_GRID: LazyLock<TermSet> = LazyLock::new(|| {
    TermSet::new(&[
        "containeranlage",
        "anlage zur energiespeicherung",
        "lithium",
        "li-ion",
    ])
});

/// Binding land-use plan language.
pub static PLANNING_STRONG: LazyLock<TermSet> =
    LazyLock::new(|| TermSet::new(&["bebauungsplan", "b-plan", "bauleitplanung"]));

/// Procedural steps of a B-Plan.
pub static PLANNING_STEPS: LazyLock<TermSet> = LazyLock::new(|| {
    TermSet::new(&[
        "aufstellungsbeschluss",
        "fruehzeitige beteiligung",
        "auslegung",
        "satzungsbeschluss",
    ])
});

/// Permit-procedure language.
pub static PERMIT_STRONG: LazyLock<TermSet> = LazyLock::new(|| {
    TermSet::new(&[
        "bauvorbescheid",
        "bauvoranfrage",
        "bauvorantrag",
        "baugenehmigung",
        "kenntnisnahme",
        "antrag auf errichtung",
        "standortgemeinde",
        "einvernehmen",
        "§36",
        "§ 36",
    ])
});

/// High-voltage grid infrastructure.
pub static GRID_STRONG: LazyLock<TermSet> = LazyLock::new(|| {
    TermSet::new(&[
        "umspannwerk",
        "110 kv",
        "220 kv",
        "380 kv",
        "hoechstspannung",
        "hochspannung",
    ])
});

/// Medium-voltage grid infrastructure.
pub static GRID_MEDIUM: LazyLock<TermSet> = LazyLock::new(|| {
    TermSet::new(&[
        "mittelspannung",
        "20 kv",
        "30 kv",
        "schaltanlage",
        "trafostation",
        "netzanschluss",
    ])
});

/// Storage words that are not grid batteries.
pub static NEGATIVE_STORAGE: LazyLock<TermSet> = LazyLock::new(|| {
    TermSet::new(&[
        "waermespeicher",
        "wasserspeicher",
        "datenspeicher",
        "gasspeicher",
        "pufferspeicher",
        "eisspeicher",
    ])
});

/// Zoning designations that host energy projects.
pub static ZONING: LazyLock<TermSet> = LazyLock::new(|| {
    TermSet::new(&["sondergebiet", "industriegebiet", "gewerbegebiet"])
});

/// Renewable-energy context.
pub static ENERGY_CONTEXT: LazyLock<TermSet> = LazyLock::new(|| {
    TermSet::new(&["pv", "photovoltaik", "wind", "solarpark", "windenergie"])
});

/// §35 BauGB markers (outside settled areas).
pub static LEGAL_PARA_35: LazyLock<TermSet> =
    LazyLock::new(|| TermSet::new(&["§ 35 baugb", "§35 baugb", "aussenbereich"]));

/// §34 BauGB markers (inside settled areas).
pub static LEGAL_PARA_34: LazyLock<TermSet> =
    LazyLock::new(|| TermSet::new(&["§ 34 baugb", "§34 baugb", "innenbereich"]));

/// §36 BauGB markers (municipal consent).
pub static LEGAL_PARA_36: LazyLock<TermSet> =
    LazyLock::new(|| TermSet::new(&["§ 36 baugb", "§36 baugb", "§ 36", "§36"]));

/// Agenda wording that marks privileged §35 projects in RIS items.
pub static RIS_PRIVILEGED: LazyLock<TermSet> = LazyLock::new(|| {
    TermSet::new(&[
        "einvernehmen",
        "stellungnahme",
        "bauantrag",
        "bauvoranfrage",
        "vorhaben",
    ])
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_plain_terms() {
        assert!(BESS_EXPLICIT.matches("neubau einer batteriespeicheranlage"));
        assert!(!BESS_EXPLICIT.matches("neubau einer lagerhalle"));
    }

    #[test]
    fn tolerates_single_interior_whitespace() {
        // PDFs split words; one inserted space must still match.
        assert!(BESS_EXPLICIT.matches("batterie speicher"));
        assert!(BESS_EXPLICIT.matches("batteriespei cher"));
        assert!(PLANNING_STEPS.matches("aufstellungs beschluss"));
    }

    #[test]
    fn short_terms_do_not_bridge_words() {
        // "pv" may not match across a word boundary like "stop vehicle".
        assert!(!ENERGY_CONTEXT.iter().any(|t| t.raw() == "pv" && t.is_match("stop vehicle")));
        assert!(ENERGY_CONTEXT.matches("pv-anlage"));
    }

    #[test]
    fn paragraph_36_variants() {
        assert!(PERMIT_STRONG.matches("einvernehmen gemaess § 36 baugb"));
        assert!(PERMIT_STRONG.matches("einvernehmen nach §36"));
    }

    #[test]
    fn distinct_count_counts_terms_not_occurrences() {
        let text = "umspannwerk umspannwerk netzanschluss";
        assert_eq!(GRID_STRONG.count_distinct(text), 1);
        assert_eq!(GRID_MEDIUM.count_distinct(text), 1);
    }
}
