//! Extract project area figures, normalized to hectares.

use std::sync::LazyLock;

use regex::Regex;

static AREA_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*(km²|quadratkilometer|m²|qm|quadratmeter|ha|hektar)\b")
        .expect("area pattern must compile")
});

/// All area figures in the text, converted to hectares.
pub fn extract_hectares(text: &str) -> Vec<f64> {
    let mut out = Vec::new();
    for caps in AREA_PATTERN.captures_iter(text) {
        let value: f64 = match caps[1].replace(',', ".").parse() {
            Ok(v) => v,
            Err(_) => continue,
        };
        let factor = match caps[2].to_lowercase().as_str() {
            "km²" | "quadratkilometer" => 100.0,
            "m²" | "qm" | "quadratmeter" => 0.0001,
            _ => 1.0,
        };
        out.push(value * factor);
    }
    out
}

/// Largest area mentioned; the plan area usually dominates.
pub fn find_largest_area(text: &str) -> Option<f64> {
    extract_hectares(text)
        .into_iter()
        .fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.max(v))))
}
