//! HTML parsing helpers: visible text, titles and anchors.
//!
//! All functions are synchronous and consume/return owned data so no
//! non-`Send` parser state ever crosses an await point.

use scraper::{Html, Selector};
use url::Url;

/// An anchor found in a page.
#[derive(Debug, Clone)]
pub struct Anchor {
    /// Absolute URL, resolved against the page URL.
    pub url: String,
    /// Anchor text, whitespace-trimmed.
    pub text: String,
}

/// Visible text of an HTML document, newline-separated.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::new();
    for text in document.root_element().text() {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(trimmed);
        }
    }
    out
}

/// The document title: `<h1>` if present, else `<title>`.
pub fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    for selector in ["h1", "title"] {
        let selector = Selector::parse(selector).expect("static selector");
        if let Some(element) = document.select(&selector).next() {
            let text = element.text().collect::<String>().trim().to_string();
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

/// All `<a href>` anchors with absolute URLs. Fragments and unparsable
/// hrefs are dropped.
pub fn extract_anchors(html: &str, base_url: &str) -> Vec<Anchor> {
    let Ok(base) = Url::parse(base_url) else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").expect("static selector");

    let mut anchors = Vec::new();
    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if href.starts_with('#') || href.starts_with("javascript:") || href.starts_with("mailto:") {
            continue;
        }
        let Ok(mut resolved) = base.join(href) else {
            continue;
        };
        resolved.set_fragment(None);
        if !matches!(resolved.scheme(), "http" | "https") {
            continue;
        }
        anchors.push(Anchor {
            url: resolved.to_string(),
            text: element.text().collect::<String>().trim().to_string(),
        });
    }
    anchors
}

/// Whether two URLs share a host.
pub fn same_host(a: &str, b: &str) -> bool {
    let host = |u: &str| {
        Url::parse(u)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
    };
    match (host(a), host(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_extraction_skips_markup() {
        let html = "<html><body><h1>Bekanntmachung</h1><p>Öffentliche <b>Auslegung</b></p></body></html>";
        let text = extract_text(html);
        assert!(text.contains("Bekanntmachung"));
        assert!(text.contains("Auslegung"));
        assert!(!text.contains("<p>"));
    }

    #[test]
    fn title_prefers_h1() {
        let html = "<html><head><title>Stadt</title></head><body><h1>Bebauungsplan Nr. 5</h1></body></html>";
        assert_eq!(extract_title(html).as_deref(), Some("Bebauungsplan Nr. 5"));
    }

    #[test]
    fn anchors_are_resolved_and_filtered() {
        let html = r##"<a href="/amtsblatt/07.pdf">Amtsblatt</a>
                       <a href="#top">nach oben</a>
                       <a href="mailto:rathaus@example.de">Mail</a>
                       <a href="https://ris.example.de/si0100.asp">RIS</a>"##;
        let anchors = extract_anchors(html, "https://www.example.de/aktuelles/");
        assert_eq!(anchors.len(), 2);
        assert_eq!(anchors[0].url, "https://www.example.de/amtsblatt/07.pdf");
        assert_eq!(anchors[1].text, "RIS");
    }

    #[test]
    fn same_host_comparison() {
        assert!(same_host("https://www.example.de/a", "https://www.example.de/b"));
        assert!(!same_host("https://www.example.de/a", "https://ris.example.de/b"));
    }
}
