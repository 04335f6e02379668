//! Database schema.

use rusqlite::Connection;

use super::Result;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS municipality_seed (
    municipality_key     TEXT PRIMARY KEY,
    name                 TEXT NOT NULL,
    county               TEXT NOT NULL,
    state                TEXT NOT NULL,
    official_website_url TEXT
);

CREATE TABLE IF NOT EXISTS candidates (
    id               TEXT PRIMARY KEY,
    run_id           TEXT NOT NULL,
    municipality_key TEXT NOT NULL,
    discovery_source TEXT NOT NULL,
    discovery_path   TEXT NOT NULL,
    title            TEXT NOT NULL,
    url              TEXT NOT NULL,
    date             TEXT,
    doc_urls         TEXT NOT NULL,
    prefilter_score  REAL NOT NULL,
    status           TEXT NOT NULL,
    status_reason    TEXT
);
CREATE INDEX IF NOT EXISTS idx_candidates_run
    ON candidates(run_id, municipality_key);

CREATE TABLE IF NOT EXISTS procedures (
    id                 TEXT PRIMARY KEY,
    title              TEXT NOT NULL,
    title_norm         TEXT NOT NULL,
    municipality_key   TEXT NOT NULL,
    state              TEXT NOT NULL,
    county             TEXT NOT NULL,
    discovery_source   TEXT NOT NULL,
    procedure_type     TEXT NOT NULL,
    legal_basis        TEXT NOT NULL,
    project_components TEXT NOT NULL,
    ambiguity_flag     INTEGER NOT NULL,
    review_recommended INTEGER NOT NULL,
    confidence         REAL NOT NULL,
    bess_score         REAL NOT NULL,
    grid_score         REAL NOT NULL,
    decision_date      TEXT,
    site_location_raw  TEXT,
    developer_company  TEXT,
    capacity_mw        REAL,
    capacity_mwh       REAL,
    area_hectares      REAL,
    evidence_snippets  TEXT NOT NULL,
    created_at         TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_procedures_municipality
    ON procedures(municipality_key);

CREATE TABLE IF NOT EXISTS sources (
    id               TEXT PRIMARY KEY,
    procedure_id     TEXT,
    source_url       TEXT NOT NULL,
    retrieved_at     TEXT NOT NULL,
    http_status      INTEGER NOT NULL,
    etag             TEXT,
    last_modified    TEXT,
    discovery_source TEXT NOT NULL,
    discovery_path   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_sources_procedure ON sources(procedure_id);

CREATE TABLE IF NOT EXISTS documents (
    id             TEXT PRIMARY KEY,
    source_id      TEXT NOT NULL,
    doc_url        TEXT NOT NULL,
    content_sha256 TEXT NOT NULL UNIQUE,
    bytes          INTEGER NOT NULL,
    mime           TEXT NOT NULL,
    storage_path   TEXT NOT NULL,
    has_text_layer INTEGER NOT NULL,
    page_map       TEXT,
    extracted_text TEXT NOT NULL,
    ocr_needed     INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS extractions (
    id               TEXT PRIMARY KEY,
    document_id      TEXT NOT NULL,
    field            TEXT NOT NULL,
    value            TEXT NOT NULL,
    method           TEXT NOT NULL,
    evidence_snippet TEXT NOT NULL,
    page             INTEGER,
    UNIQUE(document_id, field, method)
);

CREATE TABLE IF NOT EXISTS project_entities (
    id                     TEXT PRIMARY KEY,
    municipality_key       TEXT NOT NULL,
    canonical_project_name TEXT NOT NULL,
    maturity_stage         TEXT NOT NULL,
    legal_basis_best       TEXT NOT NULL,
    project_components_best TEXT,
    developer_company_best TEXT,
    site_location_best     TEXT,
    capacity_mw_best       REAL,
    capacity_mwh_best      REAL,
    area_hectares_best     REAL,
    first_seen_date        TEXT,
    last_seen_date         TEXT,
    max_confidence         REAL NOT NULL,
    needs_review           INTEGER NOT NULL,
    plan_token             TEXT,
    parcel_token           TEXT,
    developer_norm         TEXT,
    title_signature        TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_projects_municipality
    ON project_entities(municipality_key);

CREATE TABLE IF NOT EXISTS project_links (
    procedure_id    TEXT PRIMARY KEY,
    project_id      TEXT NOT NULL,
    match_level     TEXT NOT NULL,
    link_confidence REAL NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_links_project ON project_links(project_id);

CREATE TABLE IF NOT EXISTS crawl_stats (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id           TEXT NOT NULL,
    job_id           TEXT NOT NULL,
    municipality_key TEXT NOT NULL,
    source_type      TEXT NOT NULL,
    counts_json      TEXT NOT NULL,
    timings_json     TEXT NOT NULL,
    started_at       TEXT NOT NULL,
    finished_at      TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_stats_run ON crawl_stats(run_id, municipality_key);
"#;

/// Create all tables and indexes if missing.
pub fn init(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
