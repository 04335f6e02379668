//! Discovery adapters: RIS, Amtsblatt and municipal website.
//!
//! Adapters emit lightweight items and structured diagnostics. They never
//! propagate transport errors — a failing source yields an empty item list
//! and a diagnostic trail, and the other sources proceed unaffected.

mod amtsblatt;
mod municipal;
mod ris;
mod site_links;

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

pub use amtsblatt::discover_amtsblatt;
pub use municipal::discover_municipal;
pub use ris::{discover_ris, fetch_agenda_attachments, has_privileged_agenda_term};
pub use site_links::{discover_site_links, SiteLinks};

/// One listing entry surfaced by an adapter, before prefiltering.
#[derive(Debug, Clone)]
pub struct DiscoveredItem {
    pub title: String,
    pub url: String,
    pub date: Option<NaiveDate>,
    pub doc_urls: Vec<String>,
    /// The listing page that produced this item.
    pub discovery_path: String,
}

static GERMAN_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2})\.(\d{1,2})\.(\d{4})").expect("date pattern must compile")
});

/// First German-format date in a string.
pub(crate) fn parse_date(text: &str) -> Option<NaiveDate> {
    let caps = GERMAN_DATE.captures(text)?;
    let day = caps[1].parse().ok()?;
    let month = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    if !(1990..=2100).contains(&year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_session_dates() {
        assert_eq!(
            parse_date("Sitzung des Bauausschusses am 14.03.2024"),
            NaiveDate::from_ymd_opt(2024, 3, 14)
        );
        assert_eq!(parse_date("Sitzung ohne Datum"), None);
        assert_eq!(parse_date("31.02.2024 kaputt"), None);
    }
}
