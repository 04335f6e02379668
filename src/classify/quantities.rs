//! Extract MW/MWh capacity figures from text.

use std::sync::LazyLock;

use regex::Regex;

static MW_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*(?:mwh|megawattstunden|mw|megawatt|kwh|kilowattstunden|kw|kilowatt)\b")
        .expect("quantity pattern must compile")
});

/// Power or energy quantity found in text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Quantity {
    /// Megawatts.
    Mw(f64),
    /// Megawatt hours.
    Mwh(f64),
}

/// Extract all power/energy quantities. kW/kWh are converted to MW/MWh.
pub fn extract(text: &str) -> Vec<Quantity> {
    let mut out = Vec::new();
    for caps in MW_PATTERN.captures_iter(text) {
        let value: f64 = match caps[1].replace(',', ".").parse() {
            Ok(v) => v,
            Err(_) => continue,
        };
        let unit = caps[0][caps[1].len()..].trim().to_lowercase();
        let quantity = if unit.starts_with("mwh") || unit.starts_with("megawattstunden") {
            Quantity::Mwh(value)
        } else if unit.starts_with("mw") || unit.starts_with("megawatt") {
            Quantity::Mw(value)
        } else if unit.starts_with("kwh") || unit.starts_with("kilowattstunden") {
            Quantity::Mwh(value / 1000.0)
        } else {
            Quantity::Mw(value / 1000.0)
        };
        out.push(quantity);
    }
    out
}

/// Largest MW figure; a project's rated power usually dominates the text.
pub fn find_capacity_mw(text: &str) -> Option<f64> {
    extract(text)
        .into_iter()
        .filter_map(|q| match q {
            Quantity::Mw(v) => Some(v),
            _ => None,
        })
        .fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.max(v))))
}

/// Largest MWh figure.
pub fn find_capacity_mwh(text: &str) -> Option<f64> {
    extract(text)
        .into_iter()
        .filter_map(|q| match q {
            Quantity::Mwh(v) => Some(v),
            _ => None,
        })
        .fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.max(v))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_mw_and_mwh() {
        let text = "Die Anlage hat eine Leistung von 50 MW und eine Kapazität von 120 MWh.";
        assert_eq!(find_capacity_mw(text), Some(50.0));
        assert_eq!(find_capacity_mwh(text), Some(120.0));
    }

    #[test]
    fn german_decimal_comma() {
        assert_eq!(find_capacity_mw("Leistung: 12,5 MW"), Some(12.5));
    }

    #[test]
    fn kilowatt_is_converted() {
        assert_eq!(find_capacity_mw("500 kW Einspeiseleistung"), Some(0.5));
        assert_eq!(find_capacity_mwh("2000 kWh Speicher"), Some(2.0));
    }

    #[test]
    fn largest_value_wins() {
        let text = "Trafostation 0,63 MW, Gesamtleistung 25 MW";
        assert_eq!(find_capacity_mw(text), Some(25.0));
    }

    #[test]
    fn no_quantities() {
        assert_eq!(find_capacity_mw("Bebauungsplan ohne Zahlen"), None);
        assert_eq!(find_capacity_mwh("Bebauungsplan ohne Zahlen"), None);
    }
}
