//! Site-driven link discovery.
//!
//! Instead of guessing RIS/Amtsblatt URLs, walk the municipality's official
//! website (homepage, sitemap, imprint; bounded pages and depth) and
//! classify outgoing links. Council systems commonly live on foreign
//! domains, so RIS links are accepted cross-domain; everything else stays
//! on the official host.

use std::collections::HashSet;

use tracing::{debug, info};
use url::Url;

use crate::net::HttpClient;
use crate::parser::{extract_anchors, same_host};

/// Crawl bounds for the discovery walk.
const MAX_PAGES: usize = 20;
const MAX_DEPTH: u32 = 2;

/// Seed paths checked in order.
const DISCOVERY_PAGES: &[&str] = &["", "/sitemap.xml", "/impressum", "/kontakt", "/startseite"];

/// Domain fragments that identify council information systems.
const RIS_DOMAIN_PATTERNS: &[&str] = &["allris", "sessionnet", "ratsinfo", "ris."];

/// Path fragments that identify council information systems.
const RIS_PATH_PATTERNS: &[&str] = &[
    "/ris",
    "/sessionnet",
    "/si0100",
    "/to0100",
    "/gremien",
    "/sitzung",
];

/// Path fragments that identify gazette / announcement pages.
const AMTSBLATT_PATH_PATTERNS: &[&str] = &[
    "/amtsblatt",
    "/bekanntmachung",
    "/veroeffentlichung",
    "/auslegung",
    "/bauleitplanung",
];

/// Ranked discovery result.
#[derive(Debug, Clone, Default)]
pub struct SiteLinks {
    pub ris_urls: Vec<String>,
    pub amtsblatt_urls: Vec<String>,
    /// Every page the walk fetched, for diagnostics.
    pub pages_fetched: Vec<String>,
}

/// Walk the official website and classify links.
pub async fn discover_site_links(client: &HttpClient, official_url: &str) -> SiteLinks {
    let mut result = SiteLinks::default();
    let Ok(base) = Url::parse(official_url) else {
        debug!("invalid official url: {}", official_url);
        return result;
    };
    let base_url = base.to_string().trim_end_matches('/').to_string();

    let mut queue: Vec<(String, u32)> = DISCOVERY_PAGES
        .iter()
        .map(|path| (format!("{}{}", base_url, path), 0))
        .collect();
    let mut visited: HashSet<String> = HashSet::new();
    let mut ris: HashSet<String> = HashSet::new();
    let mut amtsblatt: HashSet<String> = HashSet::new();

    while let Some((page_url, depth)) = queue.pop() {
        if result.pages_fetched.len() >= MAX_PAGES || depth > MAX_DEPTH {
            break;
        }
        if !visited.insert(page_url.clone()) {
            continue;
        }

        let body = match client.get(&page_url).await {
            Ok(resp) => resp.text(),
            Err(e) => {
                debug!("site discovery fetch failed for {}: {}", page_url, e);
                continue;
            }
        };
        result.pages_fetched.push(page_url.clone());

        if page_url.ends_with("sitemap.xml") {
            for loc in sitemap_locs(&body) {
                classify_link(&loc, "", &base_url, &mut ris, &mut amtsblatt);
            }
            continue;
        }

        for anchor in extract_anchors(&body, &page_url) {
            classify_link(&anchor.url, &anchor.text, &base_url, &mut ris, &mut amtsblatt);

            // Follow only navigation-ish internal pages.
            if depth < MAX_DEPTH && same_host(&anchor.url, &base_url) {
                let lowered = anchor.url.to_lowercase();
                if ["impressum", "kontakt", "sitemap", "startseite", "index"]
                    .iter()
                    .any(|t| lowered.contains(t))
                    && !visited.contains(&anchor.url)
                {
                    queue.push((anchor.url, depth + 1));
                }
            }
        }
    }

    result.ris_urls = ranked(ris, rank_ris);
    result.amtsblatt_urls = ranked(amtsblatt, rank_amtsblatt);
    info!(
        "site discovery for {}: {} RIS, {} Amtsblatt links ({} pages)",
        base_url,
        result.ris_urls.len(),
        result.amtsblatt_urls.len(),
        result.pages_fetched.len()
    );
    result
}

fn classify_link(
    url: &str,
    text: &str,
    base_url: &str,
    ris: &mut HashSet<String>,
    amtsblatt: &mut HashSet<String>,
) {
    let url_lower = url.to_lowercase();
    let text_lower = text.to_lowercase();

    let is_ris = RIS_DOMAIN_PATTERNS.iter().any(|p| url_lower.contains(p))
        || RIS_PATH_PATTERNS.iter().any(|p| url_lower.contains(p))
        || ["ratsinfo", "sessionnet", "allris", "sitzungsdienst"]
            .iter()
            .any(|p| text_lower.contains(p));
    if is_ris {
        ris.insert(url.to_string());
        return;
    }

    // Gazette pages must live on the official host.
    let is_amtsblatt = AMTSBLATT_PATH_PATTERNS.iter().any(|p| url_lower.contains(p))
        || text_lower.contains("amtsblatt")
        || text_lower.contains("amtliche bekanntmachung");
    if is_amtsblatt && same_host(url, base_url) {
        amtsblatt.insert(url.to_string());
    }
}

fn ranked(urls: HashSet<String>, score: fn(&str) -> i32) -> Vec<String> {
    let mut sorted: Vec<String> = urls.into_iter().collect();
    sorted.sort_by(|a, b| score(b).cmp(&score(a)).then_with(|| a.cmp(b)));
    sorted
}

fn rank_ris(url: &str) -> i32 {
    let lowered = url.to_lowercase();
    let mut score = 0;
    if lowered.contains("allris") || lowered.contains("sessionnet") {
        score += 10;
    }
    if lowered.contains("si0100") || lowered.contains("ris") {
        score += 5;
    }
    score
}

fn rank_amtsblatt(url: &str) -> i32 {
    let lowered = url.to_lowercase();
    let mut score = 0;
    if lowered.contains("amtsblatt") {
        score += 10;
    }
    if lowered.contains("bekanntmachung") {
        score += 5;
    }
    score
}

/// `<loc>` entries of a sitemap, with XML entities unescaped.
fn sitemap_locs(xml: &str) -> Vec<String> {
    let mut locs = Vec::new();
    let mut rest = xml;
    while let Some(start) = rest.find("<loc>") {
        let after = &rest[start + 5..];
        let Some(end) = after.find("</loc>") else {
            break;
        };
        let loc = after[..end]
            .trim()
            .replace("&amp;", "&")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&apos;", "'");
        locs.push(loc);
        rest = &after[end + 6..];
    }
    locs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_ris_links_cross_domain() {
        let mut ris = HashSet::new();
        let mut amtsblatt = HashSet::new();
        classify_link(
            "https://sessionnet.krz.de/beispielstadt/bi/si0100.asp",
            "Ratsinformationssystem",
            "https://www.beispielstadt.de",
            &mut ris,
            &mut amtsblatt,
        );
        assert_eq!(ris.len(), 1);
        assert!(amtsblatt.is_empty());
    }

    #[test]
    fn amtsblatt_links_must_stay_on_host() {
        let mut ris = HashSet::new();
        let mut amtsblatt = HashSet::new();
        classify_link(
            "https://www.beispielstadt.de/amtsblatt/2024",
            "Amtsblatt",
            "https://www.beispielstadt.de",
            &mut ris,
            &mut amtsblatt,
        );
        classify_link(
            "https://fremd.example.com/amtsblatt",
            "Amtsblatt",
            "https://www.beispielstadt.de",
            &mut ris,
            &mut amtsblatt,
        );
        assert_eq!(amtsblatt.len(), 1);
        assert!(amtsblatt.contains("https://www.beispielstadt.de/amtsblatt/2024"));
    }

    #[test]
    fn ris_urls_rank_by_signal() {
        let urls: HashSet<String> = [
            "https://www.beispielstadt.de/gremien".to_string(),
            "https://beispielstadt.sessionnet.de/si0100.asp".to_string(),
        ]
        .into_iter()
        .collect();
        let ranked = ranked(urls, rank_ris);
        assert!(ranked[0].contains("sessionnet"));
    }

    #[test]
    fn sitemap_locs_unescape_entities() {
        let xml = "<urlset><url><loc>https://example.de/a?x=1&amp;y=2</loc></url></urlset>";
        assert_eq!(sitemap_locs(xml), vec!["https://example.de/a?x=1&y=2"]);
    }
}
