//! Municipality seeds and crawl candidates.

use chrono::NaiveDate;
use rusqlite::{params, Row};

use crate::models::{Candidate, CandidateStatus, DiscoverySource, MunicipalitySeed};

use super::{Repository, RepositoryError, Result};

impl Repository {
    /// Load or refresh the municipality seed list.
    pub fn upsert_municipalities(&self, seeds: &[MunicipalitySeed]) -> Result<usize> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR REPLACE INTO municipality_seed
                    (municipality_key, name, county, state, official_website_url)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )?;
            for seed in seeds {
                count += stmt.execute(params![
                    seed.municipality_key,
                    seed.name,
                    seed.county,
                    seed.state,
                    seed.official_website_url,
                ])?;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    pub fn get_municipality(&self, municipality_key: &str) -> Result<Option<MunicipalitySeed>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT municipality_key, name, county, state, official_website_url
             FROM municipality_seed WHERE municipality_key = ?1",
        )?;
        let mut rows = stmt.query_map(params![municipality_key], |row| {
            Ok(MunicipalitySeed {
                municipality_key: row.get(0)?,
                name: row.get(1)?,
                county: row.get(2)?,
                state: row.get(3)?,
                official_website_url: row.get(4)?,
            })
        })?;
        rows.next().transpose().map_err(Into::into)
    }

    pub fn list_municipalities(&self) -> Result<Vec<MunicipalitySeed>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT municipality_key, name, county, state, official_website_url
             FROM municipality_seed ORDER BY municipality_key",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(MunicipalitySeed {
                municipality_key: row.get(0)?,
                name: row.get(1)?,
                county: row.get(2)?,
                state: row.get(3)?,
                official_website_url: row.get(4)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Insert a batch of discovered candidates in one transaction.
    pub fn insert_candidates(&self, candidates: &[Candidate]) -> Result<usize> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR IGNORE INTO candidates
                    (id, run_id, municipality_key, discovery_source, discovery_path,
                     title, url, date, doc_urls, prefilter_score, status, status_reason)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, NULL)
                "#,
            )?;
            for candidate in candidates {
                count += stmt.execute(params![
                    candidate.id,
                    candidate.run_id,
                    candidate.municipality_key,
                    candidate.discovery_source.as_str(),
                    candidate.discovery_path,
                    candidate.title,
                    candidate.url,
                    candidate.date.map(|d| d.to_string()),
                    serde_json::to_string(&candidate.doc_urls)?,
                    candidate.prefilter_score,
                    candidate.status.as_str(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    pub fn get_candidate(&self, id: &str) -> Result<Option<Candidate>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT id, run_id, municipality_key, discovery_source, discovery_path,
                    title, url, date, doc_urls, prefilter_score, status
             FROM candidates WHERE id = ?1",
        )?;
        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_candidate(row)?)),
            None => Ok(None),
        }
    }

    pub fn update_candidate_status(
        &self,
        id: &str,
        status: CandidateStatus,
        reason: Option<&str>,
    ) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE candidates SET status = ?1, status_reason = ?2 WHERE id = ?3",
            params![status.as_str(), reason, id],
        )?;
        Ok(())
    }
}

fn row_to_candidate(row: &Row<'_>) -> Result<Candidate> {
    let source_str: String = row.get(3)?;
    let status_str: String = row.get(10)?;
    let doc_urls_json: String = row.get(8)?;
    let date_str: Option<String> = row.get(7)?;

    Ok(Candidate {
        id: row.get(0)?,
        run_id: row.get(1)?,
        municipality_key: row.get(2)?,
        discovery_source: DiscoverySource::parse(&source_str)
            .ok_or_else(|| RepositoryError::CorruptRow(format!("discovery_source {source_str}")))?,
        discovery_path: row.get(4)?,
        title: row.get(5)?,
        url: row.get(6)?,
        date: date_str.and_then(|s| s.parse::<NaiveDate>().ok()),
        doc_urls: serde_json::from_str(&doc_urls_json)?,
        prefilter_score: row.get(9)?,
        status: CandidateStatus::parse(&status_str)
            .ok_or_else(|| RepositoryError::CorruptRow(format!("status {status_str}")))?,
    })
}
