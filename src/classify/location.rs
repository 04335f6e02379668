//! Extract cadastral location strings (Gemarkung / Flur / Flurstück).

use std::sync::LazyLock;

use regex::Regex;

static GEMARKUNG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)gemarkung\s*:?\s*([a-zäöüß][a-zäöüß \-]{2,40})").expect("pattern")
});
static FLUR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)flur\s*:?\s*(\d{1,4})\b").expect("pattern"));
static FLURSTUECK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)flurst(?:ueck|ück)\s*:?\s*(\d{1,5}(?:/\d{1,4})?[a-z]?)").expect("pattern")
});
static STRASSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:strasse|straße|str\.)\s+([a-zäöüß][a-zäöüß \-]{2,40})").expect("pattern")
});

/// Free-text location string assembled from the cadastral fragments found.
pub fn extract_location(text: &str) -> Option<String> {
    let mut parts = Vec::new();

    if let Some(caps) = GEMARKUNG.captures(text) {
        parts.push(format!("Gemarkung: {}", caps[1].trim()));
    }
    if let Some(caps) = FLUR.captures(text) {
        parts.push(format!("Flur: {}", &caps[1]));
    }
    if let Some(caps) = FLURSTUECK.captures(text) {
        parts.push(format!("Flurstück: {}", &caps[1]));
    }
    if parts.is_empty() {
        if let Some(caps) = STRASSE.captures(text) {
            parts.push(format!("Straße: {}", caps[1].trim()));
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}
