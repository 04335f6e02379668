//! Amtsblatt (official gazette) discovery.
//!
//! Locates the gazette section, lists issues and, where an issue has a
//! cheap HTML table of contents, emits one candidate per TOC entry instead
//! of one per issue.

use tracing::{debug, info};

use crate::models::DiscoveryMethod;
use crate::models::{DiscoveryDiagnostics, MunicipalitySeed, ReasonCode};
use crate::net::HttpClient;
use crate::parser::extract_anchors;

use super::site_links::discover_site_links;
use super::{parse_date, DiscoveredItem};

/// Markers that confirm a gazette listing page.
const AMTSBLATT_MARKERS: &[&str] = &["amtsblatt", "bekanntmachung", "veroeffentlichung", "veröffentlichung", "ausgabe"];

/// Anchor wording that identifies issue links.
const ISSUE_TERMS: &[&str] = &["ausgabe", "nummer", "nr.", "amtsblatt"];

/// Wording that identifies procedure entries inside a TOC.
const TOC_TERMS: &[&str] = &[
    "bebauungsplan",
    "b-plan",
    "bauleitplanung",
    "auslegung",
    "aufstellungsbeschluss",
    "satzung",
    "bauvorbescheid",
    "baugenehmigung",
    "einvernehmen",
    "speicher",
];

const MAX_ISSUES: usize = 30;
const MAX_PROBED_URLS: usize = 10;

/// Discover gazette issues and their procedure entries.
pub async fn discover_amtsblatt(
    client: &HttpClient,
    seed: &MunicipalitySeed,
    entrypoint: Option<&str>,
) -> (Vec<DiscoveredItem>, DiscoveryDiagnostics) {
    let (candidates, mut diagnostics) = candidate_urls(client, seed, entrypoint).await;

    let mut found: Option<(String, String)> = None;
    for url in candidates.iter().take(MAX_PROBED_URLS) {
        diagnostics.attempted_urls.push(url.clone());
        match client.get(url).await {
            Ok(resp) => {
                let body = resp.text();
                let lowered = body.to_lowercase();
                if AMTSBLATT_MARKERS.iter().any(|m| lowered.contains(m)) {
                    found = Some((url.clone(), body));
                    break;
                }
                diagnostics
                    .failed_urls
                    .insert(url.clone(), "no gazette markers".to_string());
            }
            Err(e) => {
                diagnostics.failed_urls.insert(url.clone(), e.to_string());
            }
        }
    }

    let Some((listing_url, listing_body)) = found else {
        diagnostics.finish_failed();
        debug!(
            "no Amtsblatt found for {} (reason: {})",
            seed.name,
            diagnostics.reason_code.as_str()
        );
        return (Vec::new(), diagnostics);
    };

    info!("found Amtsblatt for {} at {}", seed.name, listing_url);
    diagnostics.reason_code = ReasonCode::Found;

    let issues: Vec<_> = extract_anchors(&listing_body, &listing_url)
        .into_iter()
        .filter(|a| {
            let text = a.text.to_lowercase();
            ISSUE_TERMS.iter().any(|t| text.contains(t)) || a.url.to_lowercase().ends_with(".pdf")
        })
        .take(MAX_ISSUES)
        .collect();

    let mut items = Vec::new();
    for issue in issues {
        let date = parse_date(&issue.text);
        if issue.url.to_lowercase().ends_with(".pdf") {
            // PDF issue: one candidate per issue, the PDF is the document.
            items.push(DiscoveredItem {
                title: issue.text,
                url: issue.url.clone(),
                date,
                doc_urls: vec![issue.url],
                discovery_path: listing_url.clone(),
            });
            continue;
        }

        // HTML issue page: the TOC is cheap to read, emit per entry.
        match client.get(&issue.url).await {
            Ok(resp) => {
                let toc_items = toc_entries(&resp.text(), &issue.url);
                if toc_items.is_empty() {
                    items.push(DiscoveredItem {
                        title: issue.text,
                        url: issue.url.clone(),
                        date,
                        doc_urls: Vec::new(),
                        discovery_path: listing_url.clone(),
                    });
                } else {
                    for (title, url, doc_urls) in toc_items {
                        items.push(DiscoveredItem {
                            title,
                            url,
                            date,
                            doc_urls,
                            discovery_path: issue.url.clone(),
                        });
                    }
                }
            }
            Err(e) => {
                debug!("issue fetch failed for {}: {}", issue.url, e);
                items.push(DiscoveredItem {
                    title: issue.text,
                    url: issue.url.clone(),
                    date,
                    doc_urls: Vec::new(),
                    discovery_path: listing_url.clone(),
                });
            }
        }
    }

    if items.is_empty() {
        diagnostics.reason_code = ReasonCode::FoundButEmpty;
    }
    (items, diagnostics)
}

async fn candidate_urls(
    client: &HttpClient,
    seed: &MunicipalitySeed,
    entrypoint: Option<&str>,
) -> (Vec<String>, DiscoveryDiagnostics) {
    if let Some(entry) = entrypoint.filter(|e| !e.trim().is_empty()) {
        return (
            vec![entry.to_string()],
            DiscoveryDiagnostics::new(DiscoveryMethod::SiteDriven),
        );
    }

    if let Some(official) = &seed.official_website_url {
        let links = discover_site_links(client, official).await;
        if !links.amtsblatt_urls.is_empty() {
            return (
                links.amtsblatt_urls,
                DiscoveryDiagnostics::new(DiscoveryMethod::SiteDriven),
            );
        }
    }

    let slug = seed.url_slug();
    let diagnostics = DiscoveryDiagnostics::new(DiscoveryMethod::PatternGuessing);
    if slug.is_empty() {
        return (Vec::new(), diagnostics);
    }
    let mut guesses = Vec::new();
    for host in [format!("https://www.{}.de", slug), format!("https://{}.de", slug)] {
        for path in ["/amtsblatt", "/bekanntmachungen", "/amtliche-bekanntmachungen"] {
            guesses.push(format!("{}{}", host, path));
        }
    }
    (guesses, diagnostics)
}

/// Procedure-bearing entries of an issue TOC: (title, url, doc_urls).
fn toc_entries(body: &str, issue_url: &str) -> Vec<(String, String, Vec<String>)> {
    extract_anchors(body, issue_url)
        .into_iter()
        .filter(|a| {
            let text = a.text.to_lowercase();
            TOC_TERMS.iter().any(|t| text.contains(t))
        })
        .map(|a| {
            let doc_urls = if a.url.to_lowercase().ends_with(".pdf") {
                vec![a.url.clone()]
            } else {
                Vec::new()
            };
            (a.text, a.url, doc_urls)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toc_entries_pick_procedure_anchors() {
        let body = r#"
            <a href="/amtsblatt/07/auslegung-bplan-12.pdf">Öffentliche Auslegung Bebauungsplan Nr. 12</a>
            <a href="/amtsblatt/07/hundesteuer.pdf">Hundesteuersatzung</a>
        "#;
        let entries = toc_entries(body, "https://www.beispielstadt.de/amtsblatt/07/");
        // "Hundesteuersatzung" contains "satzung", so both match; the
        // B-Plan entry must be present with its PDF attached.
        assert!(entries
            .iter()
            .any(|(title, _, docs)| title.contains("Bebauungsplan") && docs.len() == 1));
    }
}
