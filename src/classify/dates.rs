//! Extract decision dates from German procedure text.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2})\.\s*(\d{1,2})\.\s*(\d{4})").expect("date pattern must compile")
});

/// Wording near which a date is taken to be the decision date.
const DECISION_KEYWORDS: &[&str] = &[
    "aufstellungsbeschluss",
    "satzungsbeschluss",
    "beschlossen am",
    "beschluss vom",
    "beschlussfassung",
    "sitzung vom",
];

/// Dates older or newer than this window are treated as noise (page
/// footers, legal references).
const YEAR_MIN: i32 = 2020;
const YEAR_MAX: i32 = 2030;

/// All plausible dates with their byte position.
pub fn extract_dates(text: &str) -> Vec<(usize, NaiveDate)> {
    let mut out = Vec::new();
    for caps in DATE_PATTERN.captures_iter(text) {
        let (day, month, year) = (
            caps[1].parse::<u32>().ok(),
            caps[2].parse::<u32>().ok(),
            caps[3].parse::<i32>().ok(),
        );
        if let (Some(d), Some(m), Some(y)) = (day, month, year) {
            if (YEAR_MIN..=YEAR_MAX).contains(&y) {
                if let Some(date) = NaiveDate::from_ymd_opt(y, m, d) {
                    out.push((caps.get(0).map(|m| m.start()).unwrap_or(0), date));
                }
            }
        }
    }
    out
}

/// The decision date: the date closest to a decision keyword, else the
/// first plausible date.
pub fn find_decision_date(text: &str) -> Option<NaiveDate> {
    let lowered = text.to_lowercase();
    let dates = extract_dates(text);
    if dates.is_empty() {
        return None;
    }

    for keyword in DECISION_KEYWORDS {
        if let Some(kw_pos) = lowered.find(keyword) {
            if let Some((_, date)) = dates
                .iter()
                .filter(|(pos, _)| pos.abs_diff(kw_pos) < 200)
                .min_by_key(|(pos, _)| pos.abs_diff(kw_pos))
            {
                return Some(*date);
            }
        }
    }

    dates.first().map(|(_, d)| *d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_near_decision_keyword_wins() {
        let text = "Erstellt am 02.01.2024. Die Gemeindevertretung hat in ihrer \
                    Sitzung vom 15.03.2024 den Aufstellungsbeschluss gefasst.";
        assert_eq!(
            find_decision_date(text),
            NaiveDate::from_ymd_opt(2024, 3, 15)
        );
    }

    #[test]
    fn falls_back_to_first_date() {
        let text = "Veröffentlicht am 07.06.2024 im Amtsblatt.";
        assert_eq!(find_decision_date(text), NaiveDate::from_ymd_opt(2024, 6, 7));
    }

    #[test]
    fn implausible_years_are_ignored() {
        assert_eq!(find_decision_date("BauGB in der Fassung vom 03.11.2017"), None);
        assert_eq!(find_decision_date("Termin am 31.02.2024"), None);
    }
}
