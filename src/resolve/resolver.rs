//! Entity resolution: attach a procedure to its project entity.
//!
//! Matching runs in fixed tiers against the projects of the same
//! municipality; the first hit wins. §36 consents are the earliest public
//! signal of an outside-area project, so absent a parcel or plan match
//! they always found a new project.

use crate::models::{MatchLevel, ProcedureType, ProjectEntity};

use super::signature::{jaccard, ProjectSignature};

/// Jaccard threshold for the developer+title tier.
const DEV_TITLE_JACCARD: f64 = 0.6;
/// Jaccard threshold for the title-only tier.
const TITLE_SIG_JACCARD: f64 = 0.8;

/// Outcome of resolving one procedure.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Link to an existing project.
    Matched {
        project_id: String,
        match_level: MatchLevel,
    },
    /// Create a new project; the match level records why.
    CreateNew { match_level: MatchLevel },
}

/// Resolve a procedure signature against the municipality's projects.
///
/// `projects` must all belong to the procedure's municipality; ordering is
/// preserved so earlier (older) projects win ties.
pub fn resolve(
    signature: &ProjectSignature,
    procedure_type: ProcedureType,
    projects: &[ProjectEntity],
) -> Resolution {
    // Tier 1: parcel identity.
    if let Some(parcel) = &signature.parcel_token {
        if let Some(project) = projects
            .iter()
            .find(|p| p.parcel_token.as_deref() == Some(parcel.as_str()))
        {
            return Resolution::Matched {
                project_id: project.id.clone(),
                match_level: MatchLevel::Parcel,
            };
        }
    }

    // Tier 2: plan identity.
    if let Some(plan) = &signature.plan_token {
        if let Some(project) = projects
            .iter()
            .find(|p| p.plan_token.as_deref() == Some(plan.as_str()))
        {
            return Resolution::Matched {
                project_id: project.id.clone(),
                match_level: MatchLevel::Plan,
            };
        }
    }

    // §36 special path: no parcel or plan match founds a new project, the
    // weaker textual tiers are skipped.
    if procedure_type == ProcedureType::Permit36Einvernehmen {
        return Resolution::CreateNew {
            match_level: MatchLevel::Para36New,
        };
    }

    // Tier 3: same developer plus similar title.
    if let Some(developer) = &signature.developer_norm {
        if let Some(project) = projects.iter().find(|p| {
            p.developer_norm.as_deref() == Some(developer.as_str())
                && jaccard(
                    &signature.title_signature,
                    &ProjectSignature::title_signature_from_string(&p.title_signature),
                ) >= DEV_TITLE_JACCARD
        }) {
            return Resolution::Matched {
                project_id: project.id.clone(),
                match_level: MatchLevel::DevTitle,
            };
        }
    }

    // Tier 4: near-identical title signature.
    if !signature.title_signature.is_empty() {
        if let Some(project) = projects.iter().find(|p| {
            jaccard(
                &signature.title_signature,
                &ProjectSignature::title_signature_from_string(&p.title_signature),
            ) >= TITLE_SIG_JACCARD
        }) {
            return Resolution::Matched {
                project_id: project.id.clone(),
                match_level: MatchLevel::TitleSig,
            };
        }
    }

    // Extension point: geometry/BBOX matching would slot in here as a
    // further tier once procedures carry geometries.

    Resolution::CreateNew {
        match_level: MatchLevel::NewProject,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LegalBasis, MaturityStage};
    use std::collections::BTreeSet;

    fn project(id: &str) -> ProjectEntity {
        ProjectEntity {
            id: id.to_string(),
            municipality_key: "12060020".into(),
            canonical_project_name: "B-Plan 12/2024".into(),
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

    fn signature() -> ProjectSignature {
        ProjectSignature {
            plan_token: None,
            parcel_token: None,
            developer_norm: None,
            title_signature: BTreeSet::new(),
        }
    }

    #[test]
    fn parcel_match_wins_over_plan() {
        let mut by_parcel = project("p1");
        by_parcel.parcel_token = Some("gemarkung=x;flur=3;flurstueck=12".into());
        let mut by_plan = project("p2");
        by_plan.plan_token = Some("12/2024".into());

        let mut sig = signature();
        sig.parcel_token = Some("gemarkung=x;flur=3;flurstueck=12".into());
        sig.plan_token = Some("12/2024".into());

        let resolution = resolve(
            &sig,
            ProcedureType::BplanAufstellung,
            &[by_plan, by_parcel],
        );
        assert_eq!(
            resolution,
            Resolution::Matched {
                project_id: "p1".into(),
                match_level: MatchLevel::Parcel
            }
        );
    }

    #[test]
    fn para_36_creates_project_without_parcel_or_plan() {
        let mut similar = project("p1");
        similar.title_signature = "batteriespeicher metzdorf".into();

        let mut sig = signature();
        sig.title_signature = ProjectSignature::title_signature_from_string(
            "batteriespeicher metzdorf",
        );

        let resolution = resolve(&sig, ProcedureType::Permit36Einvernehmen, &[similar]);
        assert_eq!(
            resolution,
            Resolution::CreateNew {
                match_level: MatchLevel::Para36New
            }
        );
    }

    #[test]
    fn para_36_still_prefers_parcel_match() {
        let mut by_parcel = project("p1");
        by_parcel.parcel_token = Some("gemarkung=x;flur=1;flurstueck=9".into());

        let mut sig = signature();
        sig.parcel_token = Some("gemarkung=x;flur=1;flurstueck=9".into());

        let resolution = resolve(&sig, ProcedureType::Permit36Einvernehmen, &[by_parcel]);
        assert_eq!(
            resolution,
            Resolution::Matched {
                project_id: "p1".into(),
                match_level: MatchLevel::Parcel
            }
        );
    }

    #[test]
    fn dev_title_requires_both_developer_and_similarity() {
        let mut candidate = project("p1");
        candidate.developer_norm = Some("beispiel energie".into());
        candidate.title_signature = "batteriespeicher metzdorf sondergebiet".into();

        let mut sig = signature();
        sig.developer_norm = Some("beispiel energie".into());
        sig.title_signature = ProjectSignature::title_signature_from_string(
            "batteriespeicher metzdorf sondergebiet",
        );
        assert_eq!(
            resolve(&sig, ProcedureType::BplanOther, std::slice::from_ref(&candidate)),
            Resolution::Matched {
                project_id: "p1".into(),
                match_level: MatchLevel::DevTitle
            }
        );

        // Different developer: falls through to the title tier, which also
        // matches here because the signatures are identical.
        sig.developer_norm = Some("andere firma".into());
        assert_eq!(
            resolve(&sig, ProcedureType::BplanOther, std::slice::from_ref(&candidate)),
            Resolution::Matched {
                project_id: "p1".into(),
                match_level: MatchLevel::TitleSig
            }
        );
    }

    #[test]
    fn no_match_creates_new_project() {
        let resolution = resolve(&signature(), ProcedureType::BplanAufstellung, &[]);
        assert_eq!(
            resolution,
            Resolution::CreateNew {
                match_level: MatchLevel::NewProject
            }
        );
    }
}
