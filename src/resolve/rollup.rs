//! Best-field rollups over the procedures linked to a project.
//!
//! Rollups are recomputed from the full set of linked procedures on every
//! link, so they are idempotent and never depend on link order.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::models::{
    LegalBasis, MaturityStage, Procedure, ProjectComponents, ProjectEntity,
};

use super::signature::ProjectSignature;

/// Recompute every rolled-up field of `project` from `procedures`.
///
/// `signature` is the signature of the procedure that triggered the update;
/// it fills signature fields that are still empty (they never regress).
pub fn apply_rollups(
    project: &mut ProjectEntity,
    procedures: &[Procedure],
    signature: &ProjectSignature,
) {
    if project.plan_token.is_none() {
        project.plan_token = signature.plan_token.clone();
    }
    if project.parcel_token.is_none() {
        project.parcel_token = signature.parcel_token.clone();
    }
    if project.developer_norm.is_none() {
        project.developer_norm = signature.developer_norm.clone();
    }
    if project.title_signature.is_empty() {
        project.title_signature = signature.title_signature_string();
    }

    project.maturity_stage = procedures
        .iter()
        .map(|p| MaturityStage::from_procedure_type(p.procedure_type))
        .max()
        .unwrap_or(MaturityStage::Discovered);

    project.canonical_project_name = canonical_name(project, procedures);
    project.site_location_best = site_location_best(project, procedures);
    project.developer_company_best = most_frequent(
        procedures
            .iter()
            .filter_map(|p| p.developer_company.as_deref()),
    )
    .map(str::to_string);
    project.project_components_best = most_frequent(
        procedures
            .iter()
            .map(|p| p.project_components)
            .filter(|c| *c != ProjectComponents::OtherUnclear),
    );

    project.capacity_mw_best = max_field(procedures, |p| p.capacity_mw);
    project.capacity_mwh_best = max_field(procedures, |p| p.capacity_mwh);
    project.area_hectares_best = max_field(procedures, |p| p.area_hectares);

    project.legal_basis_best = procedures
        .iter()
        .map(|p| p.legal_basis)
        .max_by_key(|b| b.rank())
        .unwrap_or(LegalBasis::Unknown);

    let seen_dates: Vec<NaiveDate> = procedures
        .iter()
        .map(|p| p.decision_date.unwrap_or_else(|| p.created_at.date_naive()))
        .collect();
    project.first_seen_date = seen_dates.iter().min().copied();
    project.last_seen_date = seen_dates.iter().max().copied();

    project.max_confidence = procedures
        .iter()
        .map(|p| p.confidence)
        .fold(0.0, f64::max);
    project.needs_review = procedures.iter().any(|p| p.review_recommended);
}

/// Plan token if present, else the longest relevant title.
fn canonical_name(project: &ProjectEntity, procedures: &[Procedure]) -> String {
    if let Some(plan) = &project.plan_token {
        return format!("B-Plan {}", plan);
    }
    procedures
        .iter()
        .map(|p| p.title.as_str())
        .max_by_key(|t| t.len())
        .unwrap_or_default()
        .to_string()
}

/// Parcel triple if present, else the longest raw location string.
fn site_location_best(project: &ProjectEntity, procedures: &[Procedure]) -> Option<String> {
    if let Some(parcel) = &project.parcel_token {
        return Some(parcel.clone());
    }
    procedures
        .iter()
        .filter_map(|p| p.site_location_raw.as_deref())
        .max_by_key(|l| l.len())
        .map(|l| l.to_string())
}

/// Most frequent value; earlier procedures win ties.
fn most_frequent<T: Clone + Eq + std::hash::Hash>(values: impl Iterator<Item = T>) -> Option<T> {
    let mut counts: HashMap<T, (usize, usize)> = HashMap::new();
    for (index, value) in values.enumerate() {
        let entry = counts.entry(value).or_insert((0, index));
        entry.0 += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1 .0.cmp(&b.1 .0).then(b.1 .1.cmp(&a.1 .1)))
        .map(|(value, _)| value)
}

fn max_field(procedures: &[Procedure], f: impl Fn(&Procedure) -> Option<f64>) -> Option<f64> {
    procedures
        .iter()
        .filter_map(f)
        .fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.max(v))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DiscoverySource, ProcedureType};
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn procedure(id: &str, procedure_type: ProcedureType) -> Procedure {
        Procedure {
            id: id.to_string(),
            title: format!("Verfahren {}", id),
            title_norm: format!("verfahren {}", id),
            municipality_key: "12060020".into(),
            state: "BB".into(),
            county: "Oder-Spree".into(),
            discovery_source: DiscoverySource::Ris,
            procedure_type,
            legal_basis: LegalBasis::Unknown,
            project_components: ProjectComponents::BessOnly,
            ambiguity_flag: false,
            review_recommended: false,
            confidence: 0.5,
            bess_score: 0.0,
            grid_score: 0.0,
            decision_date: None,
            site_location_raw: None,
            developer_company: None,
            capacity_mw: None,
            capacity_mwh: None,
            area_hectares: None,
            evidence_snippets: Vec::new(),
            created_at: Utc::now(),
        }
    }

    fn empty_project() -> ProjectEntity {
        ProjectEntity {
            id: "pr1".into(),
            municipality_key: "12060020".into(),
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

    fn empty_signature() -> ProjectSignature {
        ProjectSignature {
            plan_token: None,
            parcel_token: None,
            developer_norm: None,
            title_signature: BTreeSet::new(),
        }
    }

    #[test]
    fn maturity_is_max_over_linked_procedures() {
        let mut project = empty_project();
        let procedures = vec![
            procedure("a", ProcedureType::BplanAufstellung),
            procedure("b", ProcedureType::PermitBaugenehmigung),
            procedure("c", ProcedureType::BplanSatzung),
        ];
        apply_rollups(&mut project, &procedures, &empty_signature());
        assert_eq!(project.maturity_stage, MaturityStage::PermitBaugenehmigung);
    }

    #[test]
    fn rollups_are_idempotent() {
        let mut project = empty_project();
        let mut procedures = vec![procedure("a", ProcedureType::Permit36Einvernehmen)];
        procedures[0].capacity_mw = Some(20.0);
        procedures[0].confidence = 0.8;

        apply_rollups(&mut project, &procedures, &empty_signature());
        let first = project.clone();
        apply_rollups(&mut project, &procedures, &empty_signature());
        assert_eq!(project.maturity_stage, first.maturity_stage);
        assert_eq!(project.capacity_mw_best, first.capacity_mw_best);
        assert_eq!(project.max_confidence, first.max_confidence);
    }

    #[test]
    fn legal_basis_precedence() {
        let mut project = empty_project();
        let mut procedures = vec![
            procedure("a", ProcedureType::Permit36Einvernehmen),
            procedure("b", ProcedureType::PermitBauvorbescheid),
        ];
        procedures[0].legal_basis = LegalBasis::Para36;
        procedures[1].legal_basis = LegalBasis::Para35;
        apply_rollups(&mut project, &procedures, &empty_signature());
        assert_eq!(project.legal_basis_best, LegalBasis::Para35);
    }

    #[test]
    fn first_and_last_seen_are_ordered() {
        let mut project = empty_project();
        let mut procedures = vec![
            procedure("a", ProcedureType::BplanAufstellung),
            procedure("b", ProcedureType::BplanSatzung),
        ];
        procedures[0].decision_date = NaiveDate::from_ymd_opt(2023, 5, 1);
        procedures[1].decision_date = NaiveDate::from_ymd_opt(2024, 2, 1);
        apply_rollups(&mut project, &procedures, &empty_signature());
        assert_eq!(project.first_seen_date, NaiveDate::from_ymd_opt(2023, 5, 1));
        assert_eq!(project.last_seen_date, NaiveDate::from_ymd_opt(2024, 2, 1));
        assert!(project.first_seen_date <= project.last_seen_date);
    }

    #[test]
    fn needs_review_is_or_over_procedures() {
        let mut project = empty_project();
        let mut procedures = vec![
            procedure("a", ProcedureType::BplanAufstellung),
            procedure("b", ProcedureType::BplanSatzung),
        ];
        procedures[1].review_recommended = true;
        apply_rollups(&mut project, &procedures, &empty_signature());
        assert!(project.needs_review);
    }

    #[test]
    fn canonical_name_prefers_plan_token() {
        let mut project = empty_project();
        let mut signature = empty_signature();
        signature.plan_token = Some("12/2024".into());
        apply_rollups(
            &mut project,
            &[procedure("a", ProcedureType::BplanAufstellung)],
            &signature,
        );
        assert_eq!(project.canonical_project_name, "B-Plan 12/2024");
    }
}
