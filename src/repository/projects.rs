//! Project entities and procedure links.

use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};

use crate::models::{
    LegalBasis, MatchLevel, MaturityStage, Procedure, ProjectComponents, ProjectEntity,
};

use super::procedures::{row_to_procedure, PROCEDURE_COLUMNS};
use super::{Repository, RepositoryError, Result};

const PROJECT_COLUMNS: &str =
    "id, municipality_key, canonical_project_name, maturity_stage, legal_basis_best, \
     project_components_best, developer_company_best, site_location_best, capacity_mw_best, \
     capacity_mwh_best, area_hectares_best, first_seen_date, last_seen_date, max_confidence, \
     needs_review, plan_token, parcel_token, developer_norm, title_signature";

impl Repository {
    pub fn projects_for_municipality(&self, municipality_key: &str) -> Result<Vec<ProjectEntity>> {
        let conn = self.connect()?;
        load_projects_for_municipality(&conn, municipality_key)
    }

    pub fn get_project(&self, id: &str) -> Result<Option<ProjectEntity>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM project_entities WHERE id = ?1",
            PROJECT_COLUMNS
        ))?;
        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_project(row)?)),
            None => Ok(None),
        }
    }

    pub fn procedures_for_project(&self, project_id: &str) -> Result<Vec<Procedure>> {
        let conn = self.connect()?;
        load_linked_procedures(&conn, project_id)
    }

    pub fn link_for_procedure(&self, procedure_id: &str) -> Result<Option<(String, MatchLevel)>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT project_id, match_level FROM project_links WHERE procedure_id = ?1",
        )?;
        let mut rows = stmt.query(params![procedure_id])?;
        match rows.next()? {
            Some(row) => {
                let project_id: String = row.get(0)?;
                let level: String = row.get(1)?;
                let match_level = MatchLevel::parse(&level)
                    .ok_or_else(|| RepositoryError::CorruptRow(format!("match_level {level}")))?;
                Ok(Some((project_id, match_level)))
            }
            None => Ok(None),
        }
    }

    pub fn count_projects(&self) -> Result<u64> {
        let conn = self.connect()?;
        let count: u64 =
            conn.query_row("SELECT COUNT(*) FROM project_entities", [], |r| r.get(0))?;
        Ok(count)
    }
}

/// All projects of a municipality, oldest first so earlier projects win
/// matching ties.
pub(crate) fn load_projects_for_municipality(
    conn: &Connection,
    municipality_key: &str,
) -> Result<Vec<ProjectEntity>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM project_entities WHERE municipality_key = ?1 ORDER BY rowid",
        PROJECT_COLUMNS
    ))?;
    let mut rows = stmt.query(params![municipality_key])?;
    let mut projects = Vec::new();
    while let Some(row) = rows.next()? {
        projects.push(row_to_project(row)?);
    }
    Ok(projects)
}

/// Procedures already linked to a project.
pub(crate) fn load_linked_procedures(
    conn: &Connection,
    project_id: &str,
) -> Result<Vec<Procedure>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM procedures p
         JOIN project_links l ON l.procedure_id = p.id
         WHERE l.project_id = ?1
         ORDER BY p.created_at",
        PROCEDURE_COLUMNS
            .split(", ")
            .map(|c| format!("p.{}", c))
            .collect::<Vec<_>>()
            .join(", ")
    ))?;
    let mut rows = stmt.query(params![project_id])?;
    let mut procedures = Vec::new();
    while let Some(row) = rows.next()? {
        procedures.push(row_to_procedure(row)?);
    }
    Ok(procedures)
}

pub(crate) fn insert_link(
    conn: &Connection,
    procedure_id: &str,
    project_id: &str,
    match_level: MatchLevel,
) -> Result<()> {
    conn.execute(
        r#"
        INSERT OR REPLACE INTO project_links
            (procedure_id, project_id, match_level, link_confidence)
        VALUES (?1, ?2, ?3, ?4)
        "#,
        params![
            procedure_id,
            project_id,
            match_level.as_str(),
            match_level.confidence(),
        ],
    )?;
    Ok(())
}

pub(crate) fn upsert_project(conn: &Connection, project: &ProjectEntity) -> Result<()> {
    conn.execute(
        r#"
        INSERT OR REPLACE INTO project_entities
            (id, municipality_key, canonical_project_name, maturity_stage, legal_basis_best,
             project_components_best, developer_company_best, site_location_best,
             capacity_mw_best, capacity_mwh_best, area_hectares_best, first_seen_date,
             last_seen_date, max_confidence, needs_review, plan_token, parcel_token,
             developer_norm, title_signature)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                ?17, ?18, ?19)
        "#,
        params![
            project.id,
            project.municipality_key,
            project.canonical_project_name,
            project.maturity_stage.as_str(),
            project.legal_basis_best.as_str(),
            project.project_components_best.map(|c| c.as_str()),
            project.developer_company_best,
            project.site_location_best,
            project.capacity_mw_best,
            project.capacity_mwh_best,
            project.area_hectares_best,
            project.first_seen_date.map(|d| d.to_string()),
            project.last_seen_date.map(|d| d.to_string()),
            project.max_confidence,
            project.needs_review,
            project.plan_token,
            project.parcel_token,
            project.developer_norm,
            project.title_signature,
        ],
    )?;
    Ok(())
}

fn row_to_project(row: &Row<'_>) -> Result<ProjectEntity> {
    let maturity: String = row.get(3)?;
    let legal_basis: String = row.get(4)?;
    let components: Option<String> = row.get(5)?;
    let first_seen: Option<String> = row.get(11)?;
    let last_seen: Option<String> = row.get(12)?;

    Ok(ProjectEntity {
        id: row.get(0)?,
        municipality_key: row.get(1)?,
        canonical_project_name: row.get(2)?,
        maturity_stage: MaturityStage::parse(&maturity)
            .ok_or_else(|| RepositoryError::CorruptRow(format!("maturity {maturity}")))?,
        legal_basis_best: LegalBasis::parse(&legal_basis)
            .ok_or_else(|| RepositoryError::CorruptRow(format!("legal_basis {legal_basis}")))?,
        project_components_best: components.as_deref().and_then(ProjectComponents::parse),
        developer_company_best: row.get(6)?,
        site_location_best: row.get(7)?,
        capacity_mw_best: row.get(8)?,
        capacity_mwh_best: row.get(9)?,
        area_hectares_best: row.get(10)?,
        first_seen_date: first_seen.and_then(|s| s.parse::<NaiveDate>().ok()),
        last_seen_date: last_seen.and_then(|s| s.parse::<NaiveDate>().ok()),
        max_confidence: row.get(13)?,
        needs_review: row.get(14)?,
        plan_token: row.get(15)?,
        parcel_token: row.get(16)?,
        developer_norm: row.get(17)?,
        title_signature: row.get(18)?,
    })
}
