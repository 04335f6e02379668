//! Municipal website spider.
//!
//! Follows same-host links from the homepage whose wording points at
//! planning or announcement sections, then lifts procedure links out of
//! those sections. Falls back to a small list of well-known paths when the
//! spider finds nothing.

use tracing::{debug, info};

use crate::models::DiscoveryMethod;
use crate::models::{DiscoveryDiagnostics, MunicipalitySeed, ReasonCode};
use crate::net::HttpClient;
use crate::parser::{extract_anchors, same_host};

use super::{parse_date, DiscoveredItem};

/// Anchor wording that marks a relevant section.
const SECTION_KEYWORDS: &[&str] = &[
    "bauen",
    "planung",
    "bebauungsplan",
    "bauleitplanung",
    "b-plan",
    "stadtplanung",
    "bekanntmachung",
    "satzung",
    "verordnung",
    "amtliche",
    "oeffentlich",
    "öffentlich",
    "verfahren",
    "beteiligung",
    "auslegung",
    "aufstellung",
    "bauvorbescheid",
    "baugenehmigung",
    "bauantrag",
    "bauausschuss",
    "planungsausschuss",
    "gemeindevertretung",
];

/// Wording that marks a procedure link inside a section.
const PROCEDURE_LINK_TERMS: &[&str] = &[
    "bebauungsplan",
    "b-plan",
    "bauleitplanung",
    "aufstellungsbeschluss",
    "auslegung",
    "satzung",
    "bauvorbescheid",
    "baugenehmigung",
    "einvernehmen",
    "verfahren",
    "beteiligung",
];

/// Paths probed when the spider finds no sections.
const FALLBACK_PATHS: &[&str] = &[
    "/bekanntmachungen",
    "/amtliche-bekanntmachungen",
    "/bauleitplanung",
    "/stadtplanung",
    "/bebauungsplaene",
    "/planung-und-bauen",
    "/bauen-und-wohnen",
];

const MAX_SECTIONS: usize = 12;

/// Discover procedure links from the municipality's own website.
pub async fn discover_municipal(
    client: &HttpClient,
    seed: &MunicipalitySeed,
    entrypoint: Option<&str>,
) -> (Vec<DiscoveredItem>, DiscoveryDiagnostics) {
    let mut diagnostics = DiscoveryDiagnostics::new(DiscoveryMethod::SiteDriven);

    let base_url = entrypoint
        .filter(|e| !e.trim().is_empty())
        .map(|e| e.to_string())
        .or_else(|| seed.official_website_url.clone())
        .or_else(|| {
            let slug = seed.url_slug();
            if slug.is_empty() {
                None
            } else {
                diagnostics.method = DiscoveryMethod::PatternGuessing;
                Some(format!("https://www.{}.de", slug))
            }
        });

    let Some(base_url) = base_url else {
        diagnostics.finish_failed();
        return (Vec::new(), diagnostics);
    };
    let base_url = base_url.trim_end_matches('/').to_string();

    // Spider pass: homepage links whose wording matches a section keyword.
    diagnostics.attempted_urls.push(base_url.clone());
    let mut sections = Vec::new();
    match client.get(&base_url).await {
        Ok(resp) => {
            for anchor in extract_anchors(&resp.text(), &base_url) {
                if !same_host(&anchor.url, &base_url) {
                    continue;
                }
                let combined = format!("{} {}", anchor.text, anchor.url).to_lowercase();
                if SECTION_KEYWORDS.iter().any(|k| combined.contains(k))
                    && !sections.contains(&anchor.url)
                {
                    sections.push(anchor.url);
                }
                if sections.len() >= MAX_SECTIONS {
                    break;
                }
            }
        }
        Err(e) => {
            diagnostics.failed_urls.insert(base_url.clone(), e.to_string());
            diagnostics.finish_failed();
            return (Vec::new(), diagnostics);
        }
    }

    // Fallback pass: well-known paths.
    if sections.is_empty() {
        debug!("spider found no sections for {}, probing fallback paths", seed.name);
        for path in FALLBACK_PATHS {
            sections.push(format!("{}{}", base_url, path));
        }
    }

    let mut items = Vec::new();
    for section_url in sections.iter().take(MAX_SECTIONS) {
        diagnostics.attempted_urls.push(section_url.clone());
        match client.get(section_url).await {
            Ok(resp) => collect_section_items(&resp.text(), section_url, &mut items),
            Err(e) => {
                diagnostics
                    .failed_urls
                    .insert(section_url.clone(), e.to_string());
            }
        }
    }

    if items.is_empty() {
        if diagnostics.failed_urls.len() == diagnostics.attempted_urls.len() {
            diagnostics.finish_failed();
        } else {
            diagnostics.reason_code = ReasonCode::FoundButEmpty;
        }
    } else {
        diagnostics.reason_code = ReasonCode::Found;
    }
    info!(
        "municipal discovery for {}: {} items from {} sections",
        seed.name,
        items.len(),
        sections.len()
    );
    (items, diagnostics)
}

/// Lift procedure links out of one section page.
fn collect_section_items(body: &str, section_url: &str, items: &mut Vec<DiscoveredItem>) {
    for anchor in extract_anchors(body, section_url) {
        let combined = format!("{} {}", anchor.text, anchor.url).to_lowercase();
        if !PROCEDURE_LINK_TERMS.iter().any(|t| combined.contains(t)) {
            continue;
        }
        let is_document = [".pdf", ".doc", ".docx"]
            .iter()
            .any(|ext| anchor.url.to_lowercase().ends_with(ext));
        items.push(DiscoveredItem {
            date: parse_date(&anchor.text),
            doc_urls: if is_document {
                vec![anchor.url.clone()]
            } else {
                Vec::new()
            },
            title: anchor.text,
            url: anchor.url,
            discovery_path: section_url.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_items_carry_documents() {
        let body = r#"
            <a href="/bauleitplanung/bplan-12-auslegung.pdf">Öffentliche Auslegung B-Plan Nr. 12 vom 15.03.2024</a>
            <a href="/aktuelles/sommerfest">Sommerfest</a>
        "#;
        let mut items = Vec::new();
        collect_section_items(body, "https://www.beispielstadt.de/bauleitplanung", &mut items);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].doc_urls.len(), 1);
        assert_eq!(
            items[0].date,
            chrono::NaiveDate::from_ymd_opt(2024, 3, 15)
        );
    }
}
