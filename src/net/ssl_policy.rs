//! SSL/TLS policy: controlled verification bypass for known-bad hosts.
//!
//! Verification stays on by default. Only after an SSL error, and only for
//! allowlisted hosts, is a request retried without verification. RIS
//! requests may additionally downgrade to plain HTTP when explicitly
//! enabled, accepted only if the response still looks like a RIS page.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::warn;
use url::Url;

/// Hosts that are allowed to bypass verification after an SSL failure.
const DEFAULT_INSECURE_ALLOWLIST: &[&str] = &["ssl.ratsinfo-online.net"];

/// Markers that identify a council information system page.
const RIS_MARKERS: &[&str] = &[
    "sitzung",
    "gremium",
    "tagesordnung",
    "sessionnet",
    "ratsinformationssystem",
    "vorlage",
];

/// Counters and allowlist for SSL handling. Process-wide, shared by all
/// workers.
#[derive(Debug)]
pub struct SslPolicy {
    allowlist: HashSet<String>,
    allow_http_fallback: bool,
    ssl_errors_total: AtomicU64,
    ssl_fallback_used_total: AtomicU64,
    http_fallback_used_total: AtomicU64,
}

/// Snapshot of the SSL counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SslMetrics {
    pub ssl_errors_total: u64,
    pub ssl_fallback_used_total: u64,
    pub http_fallback_used_total: u64,
}

impl SslPolicy {
    /// Build the policy from the configured extra allowlist entries.
    pub fn new(extra_allowlist: &[String], allow_http_fallback: bool) -> Self {
        let mut allowlist: HashSet<String> = DEFAULT_INSECURE_ALLOWLIST
            .iter()
            .map(|s| s.to_string())
            .collect();
        for host in extra_allowlist {
            let host = host.trim().to_lowercase();
            if !host.is_empty() {
                allowlist.insert(host);
            }
        }
        Self {
            allowlist,
            allow_http_fallback,
            ssl_errors_total: AtomicU64::new(0),
            ssl_fallback_used_total: AtomicU64::new(0),
            http_fallback_used_total: AtomicU64::new(0),
        }
    }

    /// Whether verification may be disabled for this URL after an SSL error.
    pub fn allows_insecure(&self, url: &str) -> bool {
        host_of(url)
            .map(|h| self.allowlist.contains(&h))
            .unwrap_or(false)
    }

    pub fn allow_http_fallback(&self) -> bool {
        self.allow_http_fallback
    }

    pub fn record_ssl_error(&self) {
        self.ssl_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ssl_fallback(&self, url: &str) {
        self.ssl_fallback_used_total.fetch_add(1, Ordering::Relaxed);
        warn!("SSL_FALLBACK_VERIFY_FALSE url={}", url);
    }

    pub fn record_http_fallback(&self, original: &str, downgraded: &str) {
        self.http_fallback_used_total.fetch_add(1, Ordering::Relaxed);
        warn!(
            "RIS_HTTP_FALLBACK_USED original={} http_fallback={}",
            original, downgraded
        );
    }

    pub fn metrics(&self) -> SslMetrics {
        SslMetrics {
            ssl_errors_total: self.ssl_errors_total.load(Ordering::Relaxed),
            ssl_fallback_used_total: self.ssl_fallback_used_total.load(Ordering::Relaxed),
            http_fallback_used_total: self.http_fallback_used_total.load(Ordering::Relaxed),
        }
    }
}

/// Whether a response body looks like a RIS page. Guards the HTTP
/// downgrade against serving arbitrary content over an insecure channel.
pub fn is_ris_page(body: &str) -> bool {
    let lowered = body.to_lowercase();
    RIS_MARKERS.iter().any(|m| lowered.contains(m))
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_allowlist_is_seeded() {
        let policy = SslPolicy::new(&[], false);
        assert!(policy.allows_insecure("https://ssl.ratsinfo-online.net/brandenburg"));
        assert!(!policy.allows_insecure("https://www.beispielstadt.de/"));
    }

    #[test]
    fn extra_hosts_extend_the_allowlist() {
        let policy = SslPolicy::new(&["RIS.Example.De ".to_string()], false);
        assert!(policy.allows_insecure("https://ris.example.de/si0100.asp"));
    }

    #[test]
    fn counters_accumulate() {
        let policy = SslPolicy::new(&[], true);
        policy.record_ssl_error();
        policy.record_ssl_error();
        policy.record_ssl_fallback("https://ssl.ratsinfo-online.net/x");
        policy.record_http_fallback("https://a", "http://a");
        let metrics = policy.metrics();
        assert_eq!(metrics.ssl_errors_total, 2);
        assert_eq!(metrics.ssl_fallback_used_total, 1);
        assert_eq!(metrics.http_fallback_used_total, 1);
    }

    #[test]
    fn ris_marker_detection() {
        assert!(is_ris_page("<html><h1>Tagesordnung der Sitzung</h1></html>"));
        assert!(!is_ris_page("<html><h1>Willkommen</h1></html>"));
    }
}
