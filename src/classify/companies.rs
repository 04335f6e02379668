//! Detect developer company names by their legal-form suffix.

use std::sync::LazyLock;

use regex::Regex;

static COMPANY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-ZÄÖÜ][A-Za-zÄÖÜäöüß0-9&.\- ]{2,60}?(?:GmbH & Co\. KG|GmbH|AG|UG|KG))\b")
        .expect("company pattern must compile")
});

/// Company names found in text, in order of appearance, deduplicated.
pub fn find_companies(text: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for caps in COMPANY_PATTERN.captures_iter(text) {
        let name = caps[1].trim().to_string();
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_gmbh() {
        let companies = find_companies("Antragstellerin ist die Sonnenfeld Energie GmbH aus Potsdam.");
        assert_eq!(companies.len(), 1);
        assert!(companies[0].ends_with("GmbH"));
        assert!(companies[0].contains("Sonnenfeld"));
    }

    #[test]
    fn finds_gmbh_co_kg() {
        let companies = find_companies("Vorhabenträger: Windkraft Nord GmbH & Co. KG");
        assert_eq!(companies.len(), 1);
        assert!(companies[0].ends_with("GmbH & Co. KG"));
    }

    #[test]
    fn deduplicates() {
        let text = "Die Speicher Süd GmbH beantragt. Die Speicher Süd GmbH erklärt.";
        assert_eq!(find_companies(text).len(), 1);
    }

    #[test]
    fn empty_without_companies() {
        assert!(find_companies("Die Gemeinde berät über den Antrag.").is_empty());
    }
}
