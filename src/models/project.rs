//! Project entities: one real-world project consolidated from many
//! procedures.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::procedure::{LegalBasis, ProcedureType, ProjectComponents};

/// How far along the most advanced linked procedure is.
///
/// The ladder is ordered; a project's maturity is the max over its linked
/// procedures and never regresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaturityStage {
    Discovered,
    BplanAufstellung,
    BplanAuslegung,
    BplanSatzung,
    #[serde(rename = "PERMIT_36")]
    Permit36,
    PermitBauvorbescheid,
    PermitBaugenehmigung,
}

impl MaturityStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovered => "DISCOVERED",
            Self::BplanAufstellung => "BPLAN_AUFSTELLUNG",
            Self::BplanAuslegung => "BPLAN_AUSLEGUNG",
            Self::BplanSatzung => "BPLAN_SATZUNG",
            Self::Permit36 => "PERMIT_36",
            Self::PermitBauvorbescheid => "PERMIT_BAUVORBESCHEID",
            Self::PermitBaugenehmigung => "PERMIT_BAUGENEHMIGUNG",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DISCOVERED" => Some(Self::Discovered),
            "BPLAN_AUFSTELLUNG" => Some(Self::BplanAufstellung),
            "BPLAN_AUSLEGUNG" => Some(Self::BplanAuslegung),
            "BPLAN_SATZUNG" => Some(Self::BplanSatzung),
            "PERMIT_36" => Some(Self::Permit36),
            "PERMIT_BAUVORBESCHEID" => Some(Self::PermitBauvorbescheid),
            "PERMIT_BAUGENEHMIGUNG" => Some(Self::PermitBaugenehmigung),
            _ => None,
        }
    }

    /// Position of a procedure type on the ladder.
    pub fn from_procedure_type(pt: ProcedureType) -> Self {
        match pt {
            ProcedureType::BplanAufstellung | ProcedureType::BplanFruehzeitig31 => {
                Self::BplanAufstellung
            }
            ProcedureType::BplanAuslegung32 => Self::BplanAuslegung,
            ProcedureType::BplanSatzung => Self::BplanSatzung,
            ProcedureType::Permit36Einvernehmen => Self::Permit36,
            ProcedureType::PermitBauvorbescheid => Self::PermitBauvorbescheid,
            ProcedureType::PermitBaugenehmigung => Self::PermitBaugenehmigung,
            ProcedureType::BplanOther | ProcedureType::PermitOther | ProcedureType::Unknown => {
                Self::Discovered
            }
        }
    }
}

/// How a procedure was matched to its project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchLevel {
    Parcel,
    Plan,
    DevTitle,
    TitleSig,
    #[serde(rename = "§36_NEW")]
    Para36New,
    NewProject,
}

impl MatchLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parcel => "PARCEL",
            Self::Plan => "PLAN",
            Self::DevTitle => "DEV_TITLE",
            Self::TitleSig => "TITLE_SIG",
            Self::Para36New => "§36_NEW",
            Self::NewProject => "NEW_PROJECT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PARCEL" => Some(Self::Parcel),
            "PLAN" => Some(Self::Plan),
            "DEV_TITLE" => Some(Self::DevTitle),
            "TITLE_SIG" => Some(Self::TitleSig),
            "§36_NEW" => Some(Self::Para36New),
            "NEW_PROJECT" => Some(Self::NewProject),
            _ => None,
        }
    }

    /// Link confidence attached to the match tier.
    pub fn confidence(&self) -> f64 {
        match self {
            Self::Parcel => 0.95,
            Self::Plan => 0.90,
            Self::DevTitle => 0.80,
            Self::TitleSig => 0.70,
            Self::Para36New => 0.85,
            Self::NewProject => 1.0,
        }
    }
}

/// A consolidated project with best-field rollups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectEntity {
    pub id: String,
    pub municipality_key: String,
    pub canonical_project_name: String,
    pub maturity_stage: MaturityStage,
    pub legal_basis_best: LegalBasis,
    pub project_components_best: Option<ProjectComponents>,
    pub developer_company_best: Option<String>,
    pub site_location_best: Option<String>,
    pub capacity_mw_best: Option<f64>,
    pub capacity_mwh_best: Option<f64>,
    pub area_hectares_best: Option<f64>,
    pub first_seen_date: Option<NaiveDate>,
    pub last_seen_date: Option<NaiveDate>,
    pub max_confidence: f64,
    pub needs_review: bool,
    // Persisted signature fields so later procedures can match against
    // projects created in earlier runs.
    pub plan_token: Option<String>,
    pub parcel_token: Option<String>,
    pub developer_norm: Option<String>,
    pub title_signature: String,
}

impl ProjectEntity {
    /// A fresh project with no rollups yet.
    pub fn new(id: String, municipality_key: String) -> Self {
        Self {
            id,
            municipality_key,
            canonical_project_name: String::new(),
            maturity_stage: MaturityStage::Discovered,
            legal_basis_best: LegalBasis::Unknown,
            project_components_best: None,
            developer_company_best: None,
            site_location_best: None,
            capacity_mw_best: None,
            capacity_mwh_best: None,
            area_hectares_best: None,
            first_seen_date: None,
            last_seen_date: None,
            max_confidence: 0.0,
            needs_review: false,
            plan_token: None,
            parcel_token: None,
            developer_norm: None,
            title_signature: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ladder_order_matches_derive() {
        assert!(MaturityStage::Discovered < MaturityStage::BplanAufstellung);
        assert!(MaturityStage::BplanSatzung < MaturityStage::Permit36);
        assert!(MaturityStage::Permit36 < MaturityStage::PermitBauvorbescheid);
        assert!(MaturityStage::PermitBauvorbescheid < MaturityStage::PermitBaugenehmigung);
    }

    #[test]
    fn fruehzeitig_maps_to_aufstellung_rung() {
        assert_eq!(
            MaturityStage::from_procedure_type(ProcedureType::BplanFruehzeitig31),
            MaturityStage::BplanAufstellung
        );
    }
}
