//! Municipality seed entries.
//!
//! Seeds are immutable inputs loaded once per run; everything downstream
//! references them by `municipality_key` (AGS/ARS).

use serde::{Deserialize, Serialize};

/// A municipality to be crawled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MunicipalitySeed {
    /// Official municipality key (AGS/ARS).
    pub municipality_key: String,
    /// Display name, e.g. "Frankfurt (Oder)".
    pub name: String,
    /// County (Landkreis).
    pub county: String,
    /// Federal state code, e.g. "BB".
    pub state: String,
    /// Official website, if known. Discovery falls back to this URL.
    #[serde(default)]
    pub official_website_url: Option<String>,
}

impl MunicipalitySeed {
    /// Sanitize the municipality name for URL pattern guessing.
    ///
    /// Strips parenthesized parts, folds umlauts and joins words with dashes
    /// so "Frankfurt (Oder)" becomes "frankfurt" and "Märkische Heide"
    /// becomes "maerkische-heide".
    pub fn url_slug(&self) -> String {
        let mut out = String::new();
        let mut in_parens = false;
        for ch in self.name.to_lowercase().chars() {
            match ch {
                '(' => in_parens = true,
                ')' => in_parens = false,
                _ if in_parens => {}
                'ä' => out.push_str("ae"),
                'ö' => out.push_str("oe"),
                'ü' => out.push_str("ue"),
                'ß' => out.push_str("ss"),
                c if c.is_ascii_alphanumeric() => out.push(c),
                _ => out.push('-'),
            }
        }
        // Collapse dash runs and trim the edges.
        let mut slug = String::with_capacity(out.len());
        let mut prev_dash = true;
        for c in out.chars() {
            if c == '-' {
                if !prev_dash {
                    slug.push('-');
                }
                prev_dash = true;
            } else {
                slug.push(c);
                prev_dash = false;
            }
        }
        slug.trim_matches('-').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(name: &str) -> MunicipalitySeed {
        MunicipalitySeed {
            municipality_key: "12345678".into(),
            name: name.into(),
            county: "Oder-Spree".into(),
            state: "BB".into(),
            official_website_url: None,
        }
    }

    #[test]
    fn slug_strips_parentheses() {
        assert_eq!(seed("Frankfurt (Oder)").url_slug(), "frankfurt");
    }

    #[test]
    fn slug_folds_umlauts_and_spaces() {
        assert_eq!(seed("Märkische Heide").url_slug(), "maerkische-heide");
        assert_eq!(seed("Groß Köris").url_slug(), "gross-koeris");
    }
}
