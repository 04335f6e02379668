//! Procedure records and their classification tags.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::candidate::DiscoverySource;

/// Procedural step a document belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcedureType {
    BplanAufstellung,
    #[serde(rename = "BPLAN_FRUEHZEITIG_3_1")]
    BplanFruehzeitig31,
    #[serde(rename = "BPLAN_AUSLEGUNG_3_2")]
    BplanAuslegung32,
    BplanSatzung,
    BplanOther,
    PermitBauvorbescheid,
    PermitBaugenehmigung,
    #[serde(rename = "PERMIT_36_EINVERNEHMEN")]
    Permit36Einvernehmen,
    PermitOther,
    Unknown,
}

impl ProcedureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BplanAufstellung => "BPLAN_AUFSTELLUNG",
            Self::BplanFruehzeitig31 => "BPLAN_FRUEHZEITIG_3_1",
            Self::BplanAuslegung32 => "BPLAN_AUSLEGUNG_3_2",
            Self::BplanSatzung => "BPLAN_SATZUNG",
            Self::BplanOther => "BPLAN_OTHER",
            Self::PermitBauvorbescheid => "PERMIT_BAUVORBESCHEID",
            Self::PermitBaugenehmigung => "PERMIT_BAUGENEHMIGUNG",
            Self::Permit36Einvernehmen => "PERMIT_36_EINVERNEHMEN",
            Self::PermitOther => "PERMIT_OTHER",
            Self::Unknown => "UNKNOWN",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BPLAN_AUFSTELLUNG" => Some(Self::BplanAufstellung),
            "BPLAN_FRUEHZEITIG_3_1" => Some(Self::BplanFruehzeitig31),
            "BPLAN_AUSLEGUNG_3_2" => Some(Self::BplanAuslegung32),
            "BPLAN_SATZUNG" => Some(Self::BplanSatzung),
            "BPLAN_OTHER" => Some(Self::BplanOther),
            "PERMIT_BAUVORBESCHEID" => Some(Self::PermitBauvorbescheid),
            "PERMIT_BAUGENEHMIGUNG" => Some(Self::PermitBaugenehmigung),
            "PERMIT_36_EINVERNEHMEN" => Some(Self::Permit36Einvernehmen),
            "PERMIT_OTHER" => Some(Self::PermitOther),
            "UNKNOWN" => Some(Self::Unknown),
            _ => None,
        }
    }
}

/// Legal basis under BauGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegalBasis {
    #[serde(rename = "§35")]
    Para35,
    #[serde(rename = "§34")]
    Para34,
    #[serde(rename = "§36")]
    Para36,
    #[serde(rename = "unknown")]
    Unknown,
}

impl LegalBasis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Para35 => "§35",
            Self::Para34 => "§34",
            Self::Para36 => "§36",
            Self::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "§35" => Some(Self::Para35),
            "§34" => Some(Self::Para34),
            "§36" => Some(Self::Para36),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Rollup precedence: §35 beats §34 beats §36 beats unknown.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Para35 => 3,
            Self::Para34 => 2,
            Self::Para36 => 1,
            Self::Unknown => 0,
        }
    }
}

/// What the project consists of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectComponents {
    #[serde(rename = "PV+BESS")]
    PvBess,
    #[serde(rename = "WIND+BESS")]
    WindBess,
    #[serde(rename = "BESS_ONLY")]
    BessOnly,
    #[serde(rename = "OTHER/UNCLEAR")]
    OtherUnclear,
}

impl ProjectComponents {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PvBess => "PV+BESS",
            Self::WindBess => "WIND+BESS",
            Self::BessOnly => "BESS_ONLY",
            Self::OtherUnclear => "OTHER/UNCLEAR",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PV+BESS" => Some(Self::PvBess),
            "WIND+BESS" => Some(Self::WindBess),
            "BESS_ONLY" => Some(Self::BessOnly),
            "OTHER/UNCLEAR" => Some(Self::OtherUnclear),
            _ => None,
        }
    }
}

/// A classified planning or permit procedure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Procedure {
    pub id: String,
    pub title: String,
    pub title_norm: String,
    pub municipality_key: String,
    pub state: String,
    pub county: String,
    pub discovery_source: DiscoverySource,
    pub procedure_type: ProcedureType,
    pub legal_basis: LegalBasis,
    pub project_components: ProjectComponents,
    pub ambiguity_flag: bool,
    pub review_recommended: bool,
    pub confidence: f64,
    pub bess_score: f64,
    pub grid_score: f64,
    pub decision_date: Option<NaiveDate>,
    pub site_location_raw: Option<String>,
    pub developer_company: Option<String>,
    pub capacity_mw: Option<f64>,
    pub capacity_mwh: Option<f64>,
    pub area_hectares: Option<f64>,
    pub evidence_snippets: Vec<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Derive the stable procedure id.
///
/// The id must be identical across reruns over identical inputs, so every
/// caller goes through this one function.
pub fn make_procedure_id(title_norm: &str, municipality_key: &str, key_tokens: &[&str]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title_norm.as_bytes());
    hasher.update(b"\x1f");
    hasher.update(municipality_key.as_bytes());
    for token in key_tokens {
        hasher.update(b"\x1f");
        hasher.update(token.as_bytes());
    }
    hex::encode(&hasher.finalize()[..16])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn procedure_id_is_stable() {
        let a = make_procedure_id("bebauungsplan nr. 12", "12060020", &["bp-12"]);
        let b = make_procedure_id("bebauungsplan nr. 12", "12060020", &["bp-12"]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn procedure_id_varies_with_inputs() {
        let a = make_procedure_id("bebauungsplan nr. 12", "12060020", &[]);
        let b = make_procedure_id("bebauungsplan nr. 12", "12060021", &[]);
        let c = make_procedure_id("bebauungsplan nr. 13", "12060020", &[]);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn procedure_id_separates_token_boundaries() {
        // "ab" + "c" must not collide with "a" + "bc".
        let a = make_procedure_id("t", "m", &["ab", "c"]);
        let b = make_procedure_id("t", "m", &["a", "bc"]);
        assert_ne!(a, b);
    }

    #[test]
    fn legal_basis_rank_order() {
        assert!(LegalBasis::Para35.rank() > LegalBasis::Para34.rank());
        assert!(LegalBasis::Para34.rank() > LegalBasis::Para36.rank());
        assert!(LegalBasis::Para36.rank() > LegalBasis::Unknown.rank());
    }
}
