//! RIS (council information system) discovery.
//!
//! Walks committees and sessions of a SessionNet/ALLRIS-style system.
//! Pagination is reverse-chronological but not strictly monotonic, so the
//! walk only stops after three consecutive sessions older than the cutoff.

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::models::{DiscoveryDiagnostics, MunicipalitySeed, ReasonCode};
use crate::models::DiscoveryMethod;
use crate::net::{is_ris_page, HttpClient};
use crate::parser::{extract_anchors, Anchor};

use super::{parse_date, DiscoveredItem};
use super::site_links::discover_site_links;

/// Committees that handle planning and permit procedures.
const COMMITTEE_ALLOWLIST: &[&str] = &[
    "bauausschuss",
    "hauptausschuss",
    "gemeindevertretung",
    "stadtverordnetenversammlung",
    "wirtschaftsausschuss",
    "umweltausschuss",
];

/// Agenda wording worth surfacing as a candidate.
const AGENDA_TERMS: &[&str] = &[
    "bebauungsplan",
    "b-plan",
    "bauleitplanung",
    "bauvorbescheid",
    "baugenehmigung",
    "einvernehmen",
    "§ 36",
    "§36",
    "§ 35",
    "§35",
    "bauantrag",
    "bauvoranfrage",
    "vorbescheid",
    "stellungnahme",
    "kenntnisnahme",
    "antrag auf errichtung",
    "batteriespeicher",
    "energiespeicher",
    "speicher",
    "photovoltaik",
    "umspannwerk",
    "energie",
];

/// Privileged wording: if present on an agenda item without attachments,
/// extraction follows the item page once to collect them.
const PRIVILEGED_AGENDA_TERMS: &[&str] = &[
    "einvernehmen",
    "bauantrag",
    "bauvorbescheid",
    "vorbescheid",
    "stellungnahme",
    "energie",
    "speicher",
    "photovoltaik",
    "umspannwerk",
];

/// Common RIS entry points probed on each base URL.
const ENTRY_POINTS: &[&str] = &["", "/si0100.asp", "/si0100.php", "/index.php"];

/// Sessions older than this end the walk once three in a row are seen.
fn session_cutoff() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).expect("valid cutoff")
}

const MAX_CONSECUTIVE_OLD: u32 = 3;
const MAX_COMMITTEES: usize = 6;
const MAX_SESSIONS_PER_COMMITTEE: usize = 24;
const MAX_PROBED_URLS: usize = 10;

/// Discover agenda items from the municipality's RIS.
pub async fn discover_ris(
    client: &HttpClient,
    seed: &MunicipalitySeed,
    entrypoint: Option<&str>,
) -> (Vec<DiscoveredItem>, DiscoveryDiagnostics) {
    let (candidates, mut diagnostics) = candidate_urls(client, seed, entrypoint).await;

    let mut found: Option<(String, String)> = None;
    'probe: for base in candidates.iter().take(MAX_PROBED_URLS) {
        for entry in ENTRY_POINTS {
            let url = format!("{}{}", base.trim_end_matches('/'), entry);
            diagnostics.attempted_urls.push(url.clone());
            match client.get_ris(&url).await {
                Ok(resp) if is_ris_page(&resp.text()) => {
                    found = Some((url, resp.text()));
                    break 'probe;
                }
                Ok(_) => {
                    diagnostics
                        .failed_urls
                        .insert(url, "no RIS markers".to_string());
                }
                Err(e) => {
                    diagnostics.failed_urls.insert(url, e.to_string());
                }
            }
        }
    }

    let Some((ris_url, entry_body)) = found else {
        diagnostics.finish_failed();
        debug!(
            "no RIS found for {} (reason: {})",
            seed.name,
            diagnostics.reason_code.as_str()
        );
        return (Vec::new(), diagnostics);
    };

    info!("found RIS for {} at {}", seed.name, ris_url);
    diagnostics.reason_code = ReasonCode::Found;

    // Committee pages from the entry page; the entry page itself is the
    // fallback when no committee matches the allowlist.
    let mut committees: Vec<Anchor> = extract_anchors(&entry_body, &ris_url)
        .into_iter()
        .filter(|a| {
            let text = a.text.to_lowercase();
            COMMITTEE_ALLOWLIST.iter().any(|c| text.contains(c))
        })
        .take(MAX_COMMITTEES)
        .collect();
    if committees.is_empty() {
        committees.push(Anchor {
            url: ris_url.clone(),
            text: seed.name.clone(),
        });
    }

    let mut items = Vec::new();
    for committee in &committees {
        walk_committee(client, committee, &mut items).await;
    }

    if items.is_empty() {
        diagnostics.reason_code = ReasonCode::FoundButEmpty;
    }
    (items, diagnostics)
}

/// Candidate base URLs: explicit entrypoint, then site-driven links, then
/// name-pattern guesses.
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
        if !links.ris_urls.is_empty() {
            return (
                links.ris_urls,
                DiscoveryDiagnostics::new(DiscoveryMethod::SiteDriven),
            );
        }
    }

    let slug = seed.url_slug();
    let diagnostics = DiscoveryDiagnostics::new(DiscoveryMethod::PatternGuessing);
    if slug.is_empty() {
        return (Vec::new(), diagnostics);
    }
    let guesses = vec![
        format!("https://{}.sessionnet.de", slug),
        format!("https://ris.{}.de", slug),
        format!("https://{}.allris.de", slug),
        format!("https://allris.{}.de", slug),
    ];
    (guesses, diagnostics)
}

/// Walk one committee's session list, newest first.
async fn walk_committee(client: &HttpClient, committee: &Anchor, items: &mut Vec<DiscoveredItem>) {
    let body = match client.get_ris(&committee.url).await {
        Ok(resp) => resp.text(),
        Err(e) => {
            debug!("committee fetch failed for {}: {}", committee.url, e);
            return;
        }
    };

    let sessions: Vec<Anchor> = extract_anchors(&body, &committee.url)
        .into_iter()
        .filter(|a| {
            let text = a.text.to_lowercase();
            text.contains("sitzung") || parse_date(&a.text).is_some()
        })
        .take(MAX_SESSIONS_PER_COMMITTEE)
        .collect();

    let cutoff = session_cutoff();
    let mut consecutive_old = 0u32;
    for session in sessions {
        let session_date = parse_date(&session.text);
        if let Some(date) = session_date {
            if date < cutoff {
                consecutive_old += 1;
                if consecutive_old >= MAX_CONSECUTIVE_OLD {
                    debug!(
                        "stopping committee {} after {} consecutive old sessions",
                        committee.url, consecutive_old
                    );
                    break;
                }
                continue;
            }
            consecutive_old = 0;
        }

        collect_session_items(client, &session.url, session_date, items).await;
    }
}

/// Emit agenda items of one session that carry relevant wording.
async fn collect_session_items(
    client: &HttpClient,
    session_url: &str,
    session_date: Option<NaiveDate>,
    items: &mut Vec<DiscoveredItem>,
) {
    let body = match client.get_ris(session_url).await {
        Ok(resp) => resp.text(),
        Err(e) => {
            debug!("session fetch failed for {}: {}", session_url, e);
            return;
        }
    };

    for anchor in extract_anchors(&body, session_url) {
        let text_lower = anchor.text.to_lowercase();
        if !AGENDA_TERMS.iter().any(|t| text_lower.contains(t)) {
            continue;
        }
        let doc_urls = if anchor.url.to_lowercase().ends_with(".pdf") {
            vec![anchor.url.clone()]
        } else {
            Vec::new()
        };
        items.push(DiscoveredItem {
            title: anchor.text,
            url: anchor.url,
            date: session_date,
            doc_urls,
            discovery_path: session_url.to_string(),
        });
    }
}

/// Whether an agenda title carries privileged project wording.
pub fn has_privileged_agenda_term(title: &str) -> bool {
    let lowered = title.to_lowercase();
    PRIVILEGED_AGENDA_TERMS.iter().any(|t| lowered.contains(t))
}

/// Follow an agenda item page once and collect its document attachments.
pub async fn fetch_agenda_attachments(client: &HttpClient, item_url: &str) -> Vec<String> {
    let body = match client.get_ris(item_url).await {
        Ok(resp) => resp.text(),
        Err(e) => {
            debug!("agenda item fetch failed for {}: {}", item_url, e);
            return Vec::new();
        }
    };
    extract_anchors(&body, item_url)
        .into_iter()
        .filter(|a| {
            let lowered = a.url.to_lowercase();
            lowered.ends_with(".pdf") || lowered.ends_with(".doc") || lowered.ends_with(".docx")
        })
        .map(|a| a.url)
        .collect()
}
