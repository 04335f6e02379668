//! Crawl statistics.

use rusqlite::params;

use crate::models::{CrawlStats, SourceStatus};

use super::{Repository, Result};

/// Per-source status line for the municipality summary.
#[derive(Debug, Clone)]
pub struct SourceSummary {
    pub source_type: String,
    pub status: SourceStatus,
    pub procedures_saved: u64,
}

impl Repository {
    pub fn insert_crawl_stats(&self, stats: &CrawlStats) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO crawl_stats
                (run_id, job_id, municipality_key, source_type, counts_json,
                 timings_json, started_at, finished_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                stats.run_id,
                stats.job_id,
                stats.municipality_key,
                stats.source_type,
                serde_json::to_string(&stats.counts)?,
                serde_json::to_string(&stats.timings)?,
                stats.started_at.to_rfc3339(),
                stats.finished_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Latest per-source status of a municipality within a run, newest row
    /// per source type winning.
    pub fn source_summaries(
        &self,
        run_id: &str,
        municipality_key: &str,
    ) -> Result<Vec<SourceSummary>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT source_type, counts_json FROM crawl_stats
            WHERE run_id = ?1 AND municipality_key = ?2
            ORDER BY id
            "#,
        )?;
        let mut rows = stmt.query(params![run_id, municipality_key])?;

        let mut summaries: Vec<SourceSummary> = Vec::new();
        while let Some(row) = rows.next()? {
            let source_type: String = row.get(0)?;
            let counts_json: String = row.get(1)?;
            let counts: crate::models::CrawlCounts = serde_json::from_str(&counts_json)?;
            let summary = SourceSummary {
                source_type: source_type.clone(),
                status: counts.source_status,
                procedures_saved: counts.procedures_saved,
            };
            if let Some(existing) = summaries.iter_mut().find(|s| s.source_type == source_type) {
                *existing = summary;
            } else {
                summaries.push(summary);
            }
        }
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::temp_repo;
    use crate::models::{CrawlCounts, CrawlStats, CrawlTimings, SourceStatus};
    use chrono::Utc;

    fn stats(source_type: &str, status: SourceStatus, saved: u64) -> CrawlStats {
        CrawlStats {
            run_id: "r1".into(),
            job_id: "j1".into(),
            municipality_key: "12060020".into(),
            source_type: source_type.into(),
            counts: CrawlCounts {
                procedures_saved: saved,
                source_status: status,
                ..Default::default()
            },
            timings: CrawlTimings::default(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
        }
    }

    #[test]
    fn summaries_keep_latest_row_per_source() {
        let (repo, _dir) = temp_repo();
        repo.insert_crawl_stats(&stats("RIS", SourceStatus::ErrorSsl, 0))
            .unwrap();
        repo.insert_crawl_stats(&stats("RIS", SourceStatus::Success, 3))
            .unwrap();
        repo.insert_crawl_stats(&stats("AMTSBLATT", SourceStatus::Success, 1))
            .unwrap();

        let summaries = repo.source_summaries("r1", "12060020").unwrap();
        assert_eq!(summaries.len(), 2);
        let ris = summaries.iter().find(|s| s.source_type == "RIS").unwrap();
        assert_eq!(ris.status, SourceStatus::Success);
        assert_eq!(ris.procedures_saved, 3);
    }
}
