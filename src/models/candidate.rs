//! Crawl candidates emitted by discovery.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which discovery channel produced an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscoverySource {
    Ris,
    Amtsblatt,
    MunicipalWebsite,
    Landkreis,
    Diplanung,
    Xplanung,
}

impl DiscoverySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ris => "RIS",
            Self::Amtsblatt => "AMTSBLATT",
            Self::MunicipalWebsite => "MUNICIPAL_WEBSITE",
            Self::Landkreis => "LANDKREIS",
            Self::Diplanung => "DIPLANUNG",
            Self::Xplanung => "XPLANUNG",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "RIS" => Some(Self::Ris),
            "AMTSBLATT" => Some(Self::Amtsblatt),
            "MUNICIPAL_WEBSITE" => Some(Self::MunicipalWebsite),
            "LANDKREIS" => Some(Self::Landkreis),
            "DIPLANUNG" => Some(Self::Diplanung),
            "XPLANUNG" => Some(Self::Xplanung),
            _ => None,
        }
    }
}

/// Lifecycle of a candidate. Created by discovery, consumed at most once
/// by extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CandidateStatus {
    Pending,
    Extracting,
    Done,
    Skipped,
    Error,
}

impl CandidateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Extracting => "EXTRACTING",
            Self::Done => "DONE",
            Self::Skipped => "SKIPPED",
            Self::Error => "ERROR",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "EXTRACTING" => Some(Self::Extracting),
            "DONE" => Some(Self::Done),
            "SKIPPED" => Some(Self::Skipped),
            "ERROR" => Some(Self::Error),
            _ => None,
        }
    }
}

/// A lightweight item surfaced by a discovery adapter.
///
/// Eligible for extraction iff `prefilter_score >= threshold(source, mode)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub run_id: String,
    pub municipality_key: String,
    pub discovery_source: DiscoverySource,
    /// The listing page or adapter entry that led here.
    pub discovery_path: String,
    pub title: String,
    pub url: String,
    pub date: Option<NaiveDate>,
    pub doc_urls: Vec<String>,
    /// Score in [-1, 1] from the prefilter.
    pub prefilter_score: f64,
    pub status: CandidateStatus,
}
