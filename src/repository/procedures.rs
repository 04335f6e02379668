//! Procedure persistence: the atomic extraction commit.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Row, Transaction};
use uuid::Uuid;

use crate::models::{
    CandidateStatus, DiscoverySource, DocumentRecord, Extraction, LegalBasis, MatchLevel,
    Procedure, ProcedureType, ProjectComponents, ProjectEntity, SourceRecord,
};
use crate::resolve::{apply_rollups, resolve, ProjectSignature, Resolution};

use super::projects::{
    insert_link, load_linked_procedures, load_projects_for_municipality, upsert_project,
};
use super::{Repository, RepositoryError, Result};

/// Everything one extraction job wants persisted. Committed in a single
/// transaction: the procedure upsert, its evidence rows, the project link
/// and the refreshed rollups stand or fall together.
#[derive(Debug)]
pub struct ExtractionBatch {
    pub candidate_id: String,
    pub procedure: Procedure,
    pub signature: ProjectSignature,
    pub source: SourceRecord,
    pub documents: Vec<DocumentRecord>,
    pub extractions: Vec<Extraction>,
}

impl Repository {
    /// Commit an extraction batch and resolve the procedure to a project.
    pub fn commit_extraction(&self, batch: ExtractionBatch) -> Result<(String, MatchLevel)> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        upsert_procedure(&tx, &batch.procedure)?;
        insert_source(&tx, &batch.source)?;
        for document in &batch.documents {
            insert_document(&tx, document)?;
        }
        for extraction in &batch.extractions {
            insert_extraction(&tx, extraction)?;
        }

        let projects = load_projects_for_municipality(&tx, &batch.procedure.municipality_key)?;
        let (project_id, match_level, mut project) =
            match resolve(&batch.signature, batch.procedure.procedure_type, &projects) {
                Resolution::Matched {
                    project_id,
                    match_level,
                } => {
                    let project = projects
                        .into_iter()
                        .find(|p| p.id == project_id)
                        .ok_or_else(|| {
                            RepositoryError::CorruptRow(format!("missing project {project_id}"))
                        })?;
                    (project_id, match_level, project)
                }
                Resolution::CreateNew { match_level } => {
                    let id = Uuid::new_v4().to_string();
                    let project = ProjectEntity::new(
                        id.clone(),
                        batch.procedure.municipality_key.clone(),
                    );
                    (id, match_level, project)
                }
            };

        insert_link(&tx, &batch.procedure.id, &project_id, match_level)?;

        let mut linked = load_linked_procedures(&tx, &project_id)?;
        if !linked.iter().any(|p| p.id == batch.procedure.id) {
            linked.push(batch.procedure.clone());
        }
        apply_rollups(&mut project, &linked, &batch.signature);
        upsert_project(&tx, &project)?;

        tx.execute(
            "UPDATE candidates SET status = ?1 WHERE id = ?2",
            params![CandidateStatus::Done.as_str(), batch.candidate_id],
        )?;

        tx.commit()?;
        Ok((project_id, match_level))
    }

    /// Record an audit-only source for a rejected or container item.
    pub fn insert_audit_source(&self, source: &SourceRecord) -> Result<()> {
        let conn = self.connect()?;
        insert_source_conn(&conn, source)?;
        Ok(())
    }

    pub fn get_procedure(&self, id: &str) -> Result<Option<Procedure>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM procedures WHERE id = ?1",
            PROCEDURE_COLUMNS
        ))?;
        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_procedure(row)?)),
            None => Ok(None),
        }
    }

    pub fn count_procedures(&self) -> Result<u64> {
        let conn = self.connect()?;
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM procedures", [], |r| r.get(0))?;
        Ok(count)
    }

    /// Sources with no procedure: the audit-only trail.
    pub fn count_audit_sources(&self) -> Result<u64> {
        let conn = self.connect()?;
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM sources WHERE procedure_id IS NULL",
            [],
            |r| r.get(0),
        )?;
        Ok(count)
    }
}

pub(crate) const PROCEDURE_COLUMNS: &str =
    "id, title, title_norm, municipality_key, state, county, discovery_source, \
     procedure_type, legal_basis, project_components, ambiguity_flag, review_recommended, \
     confidence, bess_score, grid_score, decision_date, site_location_raw, developer_company, \
     capacity_mw, capacity_mwh, area_hectares, evidence_snippets, created_at";

fn upsert_procedure(tx: &Transaction<'_>, procedure: &Procedure) -> Result<()> {
    tx.execute(
        r#"
        INSERT OR REPLACE INTO procedures
            (id, title, title_norm, municipality_key, state, county, discovery_source,
             procedure_type, legal_basis, project_components, ambiguity_flag,
             review_recommended, confidence, bess_score, grid_score, decision_date,
             site_location_raw, developer_company, capacity_mw, capacity_mwh,
             area_hectares, evidence_snippets, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                ?17, ?18, ?19, ?20, ?21, ?22, ?23)
        "#,
        params![
            procedure.id,
            procedure.title,
            procedure.title_norm,
            procedure.municipality_key,
            procedure.state,
            procedure.county,
            procedure.discovery_source.as_str(),
            procedure.procedure_type.as_str(),
            procedure.legal_basis.as_str(),
            procedure.project_components.as_str(),
            procedure.ambiguity_flag,
            procedure.review_recommended,
            procedure.confidence,
            procedure.bess_score,
            procedure.grid_score,
            procedure.decision_date.map(|d| d.to_string()),
            procedure.site_location_raw,
            procedure.developer_company,
            procedure.capacity_mw,
            procedure.capacity_mwh,
            procedure.area_hectares,
            serde_json::to_string(&procedure.evidence_snippets)?,
            procedure.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn insert_source(tx: &Transaction<'_>, source: &SourceRecord) -> Result<()> {
    insert_source_conn(tx, source)
}

fn insert_source_conn(conn: &rusqlite::Connection, source: &SourceRecord) -> Result<()> {
    conn.execute(
        r#"
        INSERT OR IGNORE INTO sources
            (id, procedure_id, source_url, retrieved_at, http_status, etag,
             last_modified, discovery_source, discovery_path)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
        params![
            source.id,
            source.procedure_id,
            source.source_url,
            source.retrieved_at.to_rfc3339(),
            source.http_status,
            source.etag,
            source.last_modified,
            source.discovery_source.as_str(),
            source.discovery_path,
        ],
    )?;
    Ok(())
}

fn insert_document(tx: &Transaction<'_>, document: &DocumentRecord) -> Result<()> {
    // content_sha256 is the identity; re-fetching the same bytes from a
    // different URL must not create a second row.
    tx.execute(
        r#"
        INSERT OR IGNORE INTO documents
            (id, source_id, doc_url, content_sha256, bytes, mime, storage_path,
             has_text_layer, page_map, extracted_text, ocr_needed)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
        params![
            document.id,
            document.source_id,
            document.doc_url,
            document.content_sha256,
            document.bytes,
            document.mime,
            document.storage_path,
            document.has_text_layer,
            document
                .page_map
                .as_ref()
                .map(|m| serde_json::to_string(m))
                .transpose()?,
            document.extracted_text,
            document.ocr_needed,
        ],
    )?;
    Ok(())
}

fn insert_extraction(tx: &Transaction<'_>, extraction: &Extraction) -> Result<()> {
    // Append-only per (document, field, method).
    tx.execute(
        r#"
        INSERT OR IGNORE INTO extractions
            (id, document_id, field, value, method, evidence_snippet, page)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![
            extraction.id,
            extraction.document_id,
            extraction.field,
            extraction.value,
            extraction.method,
            extraction.evidence_snippet,
            extraction.page,
        ],
    )?;
    Ok(())
}

pub(crate) fn row_to_procedure(row: &Row<'_>) -> Result<Procedure> {
    let discovery_source: String = row.get(6)?;
    let procedure_type: String = row.get(7)?;
    let legal_basis: String = row.get(8)?;
    let components: String = row.get(9)?;
    let decision_date: Option<String> = row.get(15)?;
    let evidence_json: String = row.get(21)?;
    let created_at: String = row.get(22)?;

    Ok(Procedure {
        id: row.get(0)?,
        title: row.get(1)?,
        title_norm: row.get(2)?,
        municipality_key: row.get(3)?,
        state: row.get(4)?,
        county: row.get(5)?,
        discovery_source: DiscoverySource::parse(&discovery_source).ok_or_else(|| {
            RepositoryError::CorruptRow(format!("discovery_source {discovery_source}"))
        })?,
        procedure_type: ProcedureType::parse(&procedure_type)
            .ok_or_else(|| RepositoryError::CorruptRow(format!("procedure_type {procedure_type}")))?,
        legal_basis: LegalBasis::parse(&legal_basis)
            .ok_or_else(|| RepositoryError::CorruptRow(format!("legal_basis {legal_basis}")))?,
        project_components: ProjectComponents::parse(&components)
            .ok_or_else(|| RepositoryError::CorruptRow(format!("components {components}")))?,
        ambiguity_flag: row.get(10)?,
        review_recommended: row.get(11)?,
        confidence: row.get(12)?,
        bess_score: row.get(13)?,
        grid_score: row.get(14)?,
        decision_date: decision_date.and_then(|s| s.parse::<NaiveDate>().ok()),
        site_location_raw: row.get(16)?,
        developer_company: row.get(17)?,
        capacity_mw: row.get(18)?,
        capacity_mwh: row.get(19)?,
        area_hectares: row.get(20)?,
        evidence_snippets: serde_json::from_str(&evidence_json)?,
        created_at: created_at
            .parse::<DateTime<Utc>>()
            .map_err(|e| RepositoryError::CorruptRow(format!("created_at: {e}")))?,
    })
}
