//! Crawl statistics and discovery diagnostics.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one (run, municipality, source) crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceStatus {
    Success,
    ErrorSsl,
    ErrorNetwork,
    ErrorOther,
    #[default]
    NotRun,
}

impl SourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::ErrorSsl => "ERROR_SSL",
            Self::ErrorNetwork => "ERROR_NETWORK",
            Self::ErrorOther => "ERROR_OTHER",
            Self::NotRun => "NOT_RUN",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SUCCESS" => Some(Self::Success),
            "ERROR_SSL" => Some(Self::ErrorSsl),
            "ERROR_NETWORK" => Some(Self::ErrorNetwork),
            "ERROR_OTHER" => Some(Self::ErrorOther),
            "NOT_RUN" => Some(Self::NotRun),
            _ => None,
        }
    }
}

/// Why a discovery adapter ended the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    Found,
    NoSeedUrl,
    #[serde(rename = "ALL_URLS_404")]
    AllUrls404,
    SslBlocked,
    NoMarkersFound,
    FoundButEmpty,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Found => "FOUND",
            Self::NoSeedUrl => "NO_SEED_URL",
            Self::AllUrls404 => "ALL_URLS_404",
            Self::SslBlocked => "SSL_BLOCKED",
            Self::NoMarkersFound => "NO_MARKERS_FOUND",
            Self::FoundButEmpty => "FOUND_BUT_EMPTY",
        }
    }
}

/// How the adapter located its entry URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMethod {
    SiteDriven,
    PatternGuessing,
}

/// Structured trace of one adapter invocation. Adapters never fail
/// silently: every attempted URL and failure lands here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryDiagnostics {
    pub method: DiscoveryMethod,
    pub attempted_urls: Vec<String>,
    /// url -> short failure reason.
    pub failed_urls: BTreeMap<String, String>,
    pub reason_code: ReasonCode,
}

impl DiscoveryDiagnostics {
    pub fn new(method: DiscoveryMethod) -> Self {
        Self {
            method,
            attempted_urls: Vec::new(),
            failed_urls: BTreeMap::new(),
            reason_code: ReasonCode::NoMarkersFound,
        }
    }

    /// Derive the terminal reason code from the recorded failures.
    pub fn finish_failed(&mut self) {
        self.reason_code = if self.attempted_urls.is_empty() {
            ReasonCode::NoSeedUrl
        } else if !self.failed_urls.is_empty()
            && self.failed_urls.values().all(|v| v.contains("404"))
        {
            ReasonCode::AllUrls404
        } else if self
            .failed_urls
            .values()
            .any(|v| v.to_lowercase().contains("ssl") || v.to_lowercase().contains("certificate"))
        {
            ReasonCode::SslBlocked
        } else {
            ReasonCode::NoMarkersFound
        };
    }
}

/// Per-job phase timings in milliseconds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlTimings {
    pub fetch_html_ms: u64,
    pub fetch_pdf_ms: u64,
    pub extract_pdf_ms: u64,
    pub classify_ms: u64,
    pub db_write_ms: u64,
    pub total_ms: u64,
}

/// Counters plus status for one job, serialized into `counts_json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlCounts {
    pub pages_fetched: u64,
    pub pdfs_downloaded: u64,
    pub pdfs_skipped: u64,
    pub candidates_found: u64,
    pub procedures_saved: u64,
    pub procedures_skipped: u64,
    pub source_status: SourceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discovery_diagnostics: Option<DiscoveryDiagnostics>,
}

/// One crawl-stats row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlStats {
    pub run_id: String,
    pub job_id: String,
    pub municipality_key: String,
    pub source_type: String,
    pub counts: CrawlCounts,
    pub timings: CrawlTimings,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_code_derivation() {
        let mut d = DiscoveryDiagnostics::new(DiscoveryMethod::PatternGuessing);
        d.finish_failed();
        assert_eq!(d.reason_code, ReasonCode::NoSeedUrl);

        d.attempted_urls.push("https://a.example".into());
        d.failed_urls
            .insert("https://a.example".into(), "HTTP 404".into());
        d.finish_failed();
        assert_eq!(d.reason_code, ReasonCode::AllUrls404);

        d.failed_urls
            .insert("https://b.example".into(), "certificate verify failed".into());
        d.finish_failed();
        assert_eq!(d.reason_code, ReasonCode::SslBlocked);
    }
}
