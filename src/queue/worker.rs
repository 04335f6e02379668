//! Worker loop: discovery and extraction job processing.
//!
//! Workers never propagate an adapter failure into the queue. A failing
//! source writes its crawl-stats row and finishes; only database errors
//! fail a job. Cancellation is cooperative and checked before I/O phases;
//! a cancelled job finalizes what it already persisted and records
//! `ERROR_OTHER` with message "cancelled".

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::classify::{
    classify, find_capacity_mw, find_capacity_mwh, find_companies, find_decision_date,
    find_largest_area, extract_location, is_valid_procedure, normalize, prefilter_score,
    should_extract,
};
use crate::config::Settings;
use crate::discovery::{
    discover_amtsblatt, discover_municipal, discover_ris, fetch_agenda_attachments,
    has_privileged_agenda_term, DiscoveredItem,
};
use crate::models::{
    make_procedure_id, Candidate, CandidateStatus, CrawlCounts, CrawlMode, CrawlStats,
    CrawlTimings, DiscoverySource, DocumentRecord, Extraction, Job, MunicipalitySeed, Procedure,
    ReasonCode, SourceRecord, SourceStatus,
};
use crate::net::{FetchError, HttpClient};
use crate::parser::{extract_text, PdfTextPipeline};
use crate::repository::{ExtractionBatch, Repository, RepositoryError};
use crate::resolve::compute_signature;
use crate::storage;

use super::JobQueue;

/// Documents fetched per candidate, at most.
const MAX_DOCS_PER_CANDIDATE: usize = 5;
/// Fast mode keeps large PDFs only for high-scoring candidates.
const LARGE_PDF_SCORE_OVERRIDE: f64 = 0.8;

/// Shared state of all workers in one process.
pub struct WorkerContext {
    pub settings: Settings,
    pub repo: Repository,
    pub http: HttpClient,
    pub pdf: PdfTextPipeline,
    pub queue: Arc<JobQueue>,
    pub shutdown: watch::Receiver<bool>,
}

impl WorkerContext {
    fn is_cancelled(&self) -> bool {
        *self.shutdown.borrow()
    }
}

/// Run one worker until the queue drains.
pub async fn run_worker(ctx: Arc<WorkerContext>) {
    while let Some(job) = ctx.queue.next().await {
        if let Err(e) = dispatch(&ctx, &job).await {
            // Database errors are the only class that fails a job.
            error!(
                "job failed for municipality {}: {}",
                job.municipality_key(),
                e
            );
        }
        ctx.queue.job_done();
    }
}

async fn dispatch(ctx: &WorkerContext, job: &Job) -> Result<(), RepositoryError> {
    match job {
        Job::Municipality {
            run_id,
            municipality_key,
            municipality_name,
            mode,
        } => {
            // Fan a municipality into its three discovery sources; they run
            // independently and degrade independently.
            for build in [
                Job::DiscoveryRIS {
                    run_id: run_id.clone(),
                    municipality_key: municipality_key.clone(),
                    municipality_name: municipality_name.clone(),
                    entrypoint: None,
                    mode: *mode,
                },
                Job::DiscoveryGazette {
                    run_id: run_id.clone(),
                    municipality_key: municipality_key.clone(),
                    municipality_name: municipality_name.clone(),
                    entrypoint: None,
                    mode: *mode,
                },
                Job::DiscoveryMunicipal {
                    run_id: run_id.clone(),
                    municipality_key: municipality_key.clone(),
                    municipality_name: municipality_name.clone(),
                    entrypoint: None,
                    mode: *mode,
                },
            ] {
                ctx.queue.push(build);
            }
            Ok(())
        }
        Job::DiscoveryRIS {
            run_id,
            municipality_key,
            municipality_name,
            entrypoint,
            mode,
        } => {
            run_discovery(
                ctx,
                DiscoverySource::Ris,
                run_id,
                municipality_key,
                municipality_name,
                entrypoint.as_deref(),
                *mode,
            )
            .await
        }
        Job::DiscoveryGazette {
            run_id,
            municipality_key,
            municipality_name,
            entrypoint,
            mode,
        } => {
            run_discovery(
                ctx,
                DiscoverySource::Amtsblatt,
                run_id,
                municipality_key,
                municipality_name,
                entrypoint.as_deref(),
                *mode,
            )
            .await
        }
        Job::DiscoveryMunicipal {
            run_id,
            municipality_key,
            municipality_name,
            entrypoint,
            mode,
        } => {
            run_discovery(
                ctx,
                DiscoverySource::MunicipalWebsite,
                run_id,
                municipality_key,
                municipality_name,
                entrypoint.as_deref(),
                *mode,
            )
            .await
        }
        Job::Extraction {
            run_id,
            municipality_key,
            candidate_id,
            mode,
        } => run_extraction(ctx, run_id, municipality_key, candidate_id, *mode).await,
    }
}

/// One discovery source for one municipality.
#[allow(clippy::too_many_arguments)]
async fn run_discovery(
    ctx: &WorkerContext,
    source: DiscoverySource,
    run_id: &str,
    municipality_key: &str,
    municipality_name: &str,
    entrypoint: Option<&str>,
    mode: CrawlMode,
) -> Result<(), RepositoryError> {
    let started_at = Utc::now();
    let start = Instant::now();
    let job_id = Uuid::new_v4().to_string();
    let mut counts = CrawlCounts::default();
    let mut timings = CrawlTimings::default();

    let seed = ctx
        .repo
        .get_municipality(municipality_key)?
        .unwrap_or_else(|| MunicipalitySeed {
            municipality_key: municipality_key.to_string(),
            name: municipality_name.to_string(),
            county: String::new(),
            state: String::new(),
            official_website_url: None,
        });

    if ctx.is_cancelled() {
        counts.source_status = SourceStatus::ErrorOther;
        counts.error_message = Some("cancelled".to_string());
        write_stats(ctx, run_id, &job_id, municipality_key, source, counts, timings, started_at)?;
        log_municipality_summary(ctx, run_id, municipality_key, &seed.name)?;
        return Ok(());
    }

    let t0 = Instant::now();
    let (items, diagnostics) = match source {
        DiscoverySource::Ris => discover_ris(&ctx.http, &seed, entrypoint).await,
        DiscoverySource::Amtsblatt => discover_amtsblatt(&ctx.http, &seed, entrypoint).await,
        _ => discover_municipal(&ctx.http, &seed, entrypoint).await,
    };
    timings.fetch_html_ms = millis(t0);
    counts.pages_fetched = diagnostics.attempted_urls.len() as u64;
    counts.source_status = status_from_reason(diagnostics.reason_code, items.is_empty());
    if counts.source_status != SourceStatus::Success {
        counts.error_message = diagnostics
            .failed_urls
            .iter()
            .next()
            .map(|(url, reason)| format!("{}: {}", url, reason));
    }
    info!(
        "discovery for {} ({}): method={:?}, reason={}, attempted={} URLs, {} items",
        seed.name,
        source.as_str(),
        diagnostics.method,
        diagnostics.reason_code.as_str(),
        diagnostics.attempted_urls.len(),
        items.len()
    );

    // Score every item and persist it as a candidate.
    let candidates: Vec<Candidate> = items
        .into_iter()
        .map(|item| to_candidate(item, run_id, municipality_key, source))
        .collect();
    counts.candidates_found = candidates.len() as u64;

    let t0 = Instant::now();
    ctx.repo.insert_candidates(&candidates)?;
    let mut skipped = 0u64;
    for candidate in &candidates {
        if ctx.is_cancelled() {
            // Candidates are persisted; extraction jobs must not leak.
            break;
        }
        if should_extract(candidate.prefilter_score, source, mode) {
            ctx.queue.push(Job::Extraction {
                run_id: run_id.to_string(),
                municipality_key: municipality_key.to_string(),
                candidate_id: candidate.id.clone(),
                mode,
            });
        } else {
            ctx.repo.update_candidate_status(
                &candidate.id,
                CandidateStatus::Skipped,
                Some(&format!(
                    "prefilter_score {:.2} below threshold",
                    candidate.prefilter_score
                )),
            )?;
            skipped += 1;
        }
    }
    timings.db_write_ms = millis(t0);
    counts.procedures_skipped = skipped;

    if ctx.is_cancelled() {
        counts.source_status = SourceStatus::ErrorOther;
        counts.error_message = Some("cancelled".to_string());
    }
    counts.discovery_diagnostics = Some(diagnostics);
    timings.total_ms = millis(start);
    write_stats(ctx, run_id, &job_id, municipality_key, source, counts, timings, started_at)?;
    log_municipality_summary(ctx, run_id, municipality_key, &seed.name)?;
    Ok(())
}

/// One extraction job: fetch, extract, classify, persist, resolve.
async fn run_extraction(
    ctx: &WorkerContext,
    run_id: &str,
    municipality_key: &str,
    candidate_id: &str,
    mode: CrawlMode,
) -> Result<(), RepositoryError> {
    let started_at = Utc::now();
    let start = Instant::now();
    let job_id = Uuid::new_v4().to_string();
    let mut counts = CrawlCounts::default();
    let mut timings = CrawlTimings::default();

    let Some(candidate) = ctx.repo.get_candidate(candidate_id)? else {
        warn!("candidate {} not found", candidate_id);
        return Ok(());
    };
    let source = candidate.discovery_source;

    if ctx.is_cancelled() {
        counts.source_status = SourceStatus::ErrorOther;
        counts.error_message = Some("cancelled".to_string());
        write_stats(ctx, run_id, &job_id, municipality_key, source, counts, timings, started_at)?;
        return Ok(());
    }
    ctx.repo
        .update_candidate_status(candidate_id, CandidateStatus::Extracting, None)?;

    let seed = ctx.repo.get_municipality(municipality_key)?;

    // Fetch the item page unless the candidate itself is a document.
    let mut first_error: Option<FetchError> = None;
    let mut html_text = String::new();
    let mut http_status = 0u16;
    let mut etag = None;
    let mut last_modified = None;
    let mut doc_urls = candidate.doc_urls.clone();
    let url_is_document = looks_like_document(&candidate.url);
    if url_is_document && !doc_urls.contains(&candidate.url) {
        doc_urls.insert(0, candidate.url.clone());
    }

    if !url_is_document {
        let t0 = Instant::now();
        let fetched = match source {
            DiscoverySource::Ris => ctx.http.get_ris(&candidate.url).await,
            _ => ctx.http.get(&candidate.url).await,
        };
        timings.fetch_html_ms = millis(t0);
        match fetched {
            Ok(resp) => {
                http_status = resp.status;
                etag = resp.etag.clone();
                last_modified = resp.last_modified.clone();
                html_text = extract_text(&resp.text());
                counts.pages_fetched = 1;
            }
            Err(e) => {
                debug!("page fetch failed for {}: {}", candidate.url, e);
                first_error = Some(e);
            }
        }
    }

    // RIS items with privileged wording but no attachments: follow the
    // item page once to collect them.
    if doc_urls.is_empty()
        && source == DiscoverySource::Ris
        && has_privileged_agenda_term(&candidate.title)
        && !ctx.is_cancelled()
    {
        doc_urls = fetch_agenda_attachments(&ctx.http, &candidate.url).await;
    }

    // Fetch and extract documents.
    let mut all_text = format!("{}\n{}", candidate.title, html_text);
    let mut documents: Vec<DocumentRecord> = Vec::new();
    let source_id = Uuid::new_v4().to_string();
    for doc_url in doc_urls.iter().take(MAX_DOCS_PER_CANDIDATE) {
        if ctx.is_cancelled() {
            break;
        }
        match fetch_document(ctx, &candidate, doc_url, &source_id, mode, &mut timings).await {
            Ok(Some(document)) => {
                if !document.extracted_text.is_empty() {
                    all_text.push('\n');
                    all_text.push_str(&document.extracted_text);
                }
                documents.push(document);
                counts.pdfs_downloaded += 1;
            }
            Ok(None) => counts.pdfs_skipped += 1,
            Err(e) => {
                counts.pdfs_skipped += 1;
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    if ctx.is_cancelled() {
        // Finalize: candidate goes back to the pool, stats record the cut.
        ctx.repo
            .update_candidate_status(candidate_id, CandidateStatus::Pending, None)?;
        counts.source_status = SourceStatus::ErrorOther;
        counts.error_message = Some("cancelled".to_string());
        timings.total_ms = millis(start);
        write_stats(ctx, run_id, &job_id, municipality_key, source, counts, timings, started_at)?;
        return Ok(());
    }

    // Nothing fetched at all: record the transport failure and stop.
    if counts.pages_fetched == 0 && documents.is_empty() {
        if let Some(e) = first_error {
            ctx.repo.update_candidate_status(
                candidate_id,
                CandidateStatus::Error,
                Some(&e.to_string()),
            )?;
            counts.source_status = fetch_error_status(&e);
            counts.error_message = Some(e.to_string());
            timings.total_ms = millis(start);
            write_stats(ctx, run_id, &job_id, municipality_key, source, counts, timings, started_at)?;
            return Ok(());
        }
    }

    // Classify.
    let t0 = Instant::now();
    let result = classify(&all_text, &candidate.title, candidate.date, source);
    timings.classify_ms = millis(t0);

    let title_norm = normalize(&candidate.title).text;
    let all_text_norm = normalize(&all_text).text;

    if let Err(reason) = is_valid_procedure(
        &title_norm,
        &candidate.url,
        source,
        &result,
        &all_text_norm,
    ) {
        info!("{} url={} title={:?}", reason.as_str(), candidate.url, candidate.title);
        ctx.repo.insert_audit_source(&SourceRecord {
            id: source_id,
            procedure_id: None,
            source_url: candidate.url.clone(),
            retrieved_at: Utc::now(),
            http_status,
            etag,
            last_modified,
            discovery_source: source,
            discovery_path: candidate.discovery_path.clone(),
        })?;
        ctx.repo.update_candidate_status(
            candidate_id,
            CandidateStatus::Skipped,
            Some(reason.as_str()),
        )?;
        counts.procedures_skipped = 1;
        timings.total_ms = millis(start);
        write_stats(ctx, run_id, &job_id, municipality_key, source, counts, timings, started_at)?;
        return Ok(());
    }

    // Assemble the procedure with its extracted fields.
    let site_location = extract_location(&all_text);
    let companies = find_companies(&all_text);
    let developer = match companies.len() {
        0 => None,
        1 => Some(companies[0].clone()),
        _ => Some(companies[..companies.len().min(3)].join(", ")),
    };
    let evidence_joined = result.evidence_snippets.join(" ");
    let signature = compute_signature(
        &candidate.title,
        &evidence_joined,
        site_location.as_deref(),
        developer.as_deref(),
    );

    let mut key_tokens: Vec<&str> = Vec::new();
    if let Some(plan) = &signature.plan_token {
        key_tokens.push(plan);
    }
    if let Some(parcel) = &signature.parcel_token {
        key_tokens.push(parcel);
    }
    let procedure_id = make_procedure_id(&title_norm, municipality_key, &key_tokens);

    let procedure = Procedure {
        id: procedure_id.clone(),
        title: candidate.title.clone(),
        title_norm,
        municipality_key: municipality_key.to_string(),
        state: seed.as_ref().map(|s| s.state.clone()).unwrap_or_default(),
        county: seed.as_ref().map(|s| s.county.clone()).unwrap_or_default(),
        discovery_source: source,
        procedure_type: result.procedure_type,
        legal_basis: result.legal_basis,
        project_components: result.project_components,
        ambiguity_flag: result.ambiguity_flag,
        review_recommended: result.review_recommended,
        confidence: result.confidence,
        bess_score: result.bess_score,
        grid_score: result.grid_score,
        decision_date: find_decision_date(&all_text).or(candidate.date),
        site_location_raw: site_location,
        developer_company: developer,
        capacity_mw: find_capacity_mw(&all_text),
        capacity_mwh: find_capacity_mwh(&all_text),
        area_hectares: find_largest_area(&all_text),
        evidence_snippets: result.evidence_snippets.clone(),
        created_at: Utc::now(),
    };

    let extractions = field_extractions(&procedure, &documents);
    let batch = ExtractionBatch {
        candidate_id: candidate_id.to_string(),
        source: SourceRecord {
            id: source_id,
            procedure_id: Some(procedure_id.clone()),
            source_url: candidate.url.clone(),
            retrieved_at: Utc::now(),
            http_status,
            etag,
            last_modified,
            discovery_source: source,
            discovery_path: candidate.discovery_path.clone(),
        },
        signature,
        procedure,
        documents,
        extractions,
    };

    let t0 = Instant::now();
    let (project_id, match_level) = ctx.repo.commit_extraction(batch)?;
    timings.db_write_ms = millis(t0);
    counts.procedures_saved = 1;

    info!(
        "procedure {} linked to project {} ({})",
        procedure_id,
        project_id,
        match_level.as_str()
    );

    timings.total_ms = millis(start);
    write_stats(ctx, run_id, &job_id, municipality_key, source, counts, timings, started_at)?;
    Ok(())
}

/// Fetch one document URL with the PDF size guard, store the blob and
/// extract its text. `Ok(None)` means the guard skipped it.
async fn fetch_document(
    ctx: &WorkerContext,
    candidate: &Candidate,
    doc_url: &str,
    source_id: &str,
    mode: CrawlMode,
    timings: &mut CrawlTimings,
) -> Result<Option<DocumentRecord>, FetchError> {
    // HEAD before GET: fast mode skips oversized PDFs for ordinary
    // candidates.
    let t0 = Instant::now();
    if mode == CrawlMode::Fast && candidate.prefilter_score < LARGE_PDF_SCORE_OVERRIDE {
        if let Ok(head) = ctx.http.head(doc_url).await {
            if let Some(length) = head.content_length {
                let size_mb = length / (1024 * 1024);
                if size_mb > ctx.settings.pdf_max_size_mb {
                    debug!("skipping large document {} ({} MB)", doc_url, size_mb);
                    return Ok(None);
                }
            }
        }
    }

    let resp = match candidate.discovery_source {
        DiscoverySource::Ris => ctx.http.get_ris(doc_url).await?,
        _ => ctx.http.get(doc_url).await?,
    };
    timings.fetch_pdf_ms += millis(t0);

    let mime = resp
        .content_type
        .clone()
        .map(|ct| ct.split(';').next().unwrap_or("").trim().to_string())
        .filter(|ct| !ct.is_empty())
        .unwrap_or_else(|| guess_mime(doc_url).to_string());

    let sha = DocumentRecord::compute_sha256(&resp.body);
    let extension = storage::mime_to_extension(&mime);
    let storage_path = storage::save_blob(&ctx.settings.storage_base, &sha, extension, &resp.body)
        .map_err(|e| FetchError::Network {
            url: doc_url.to_string(),
            message: format!("blob write failed: {}", e),
        })?;

    let (extracted_text, page_map, has_text_layer, ocr_needed) = if mime == "application/pdf" {
        let t0 = Instant::now();
        let pipeline = ctx.pdf.clone();
        let bytes = resp.body.clone();
        let url = doc_url.to_string();
        let extraction = tokio::task::spawn_blocking(move || pipeline.extract(&bytes, &url, mode))
            .await
            .ok()
            .and_then(|r| r.ok());
        timings.extract_pdf_ms += millis(t0);
        match extraction {
            Some(extraction) if extraction.has_text_layer => {
                (extraction.text, Some(extraction.page_map), true, false)
            }
            _ => {
                info!("OCR_NEEDED url={} sha256={}", doc_url, sha);
                (String::new(), None, false, true)
            }
        }
    } else {
        (extract_text(&resp.text()), None, true, false)
    };

    Ok(Some(DocumentRecord {
        id: Uuid::new_v4().to_string(),
        source_id: source_id.to_string(),
        doc_url: doc_url.to_string(),
        content_sha256: sha,
        bytes: resp.body.len() as u64,
        mime,
        storage_path,
        has_text_layer,
        page_map,
        extracted_text,
        ocr_needed,
    }))
}

/// Extraction audit rows for the fields pulled out of the combined text.
fn field_extractions(procedure: &Procedure, documents: &[DocumentRecord]) -> Vec<Extraction> {
    let Some(document) = documents.first() else {
        return Vec::new();
    };
    let snippet = procedure
        .evidence_snippets
        .first()
        .cloned()
        .unwrap_or_default();

    let mut fields: Vec<(&str, Option<String>)> = vec![
        ("capacity_mw", procedure.capacity_mw.map(|v| v.to_string())),
        ("capacity_mwh", procedure.capacity_mwh.map(|v| v.to_string())),
        (
            "area_hectares",
            procedure.area_hectares.map(|v| v.to_string()),
        ),
        (
            "decision_date",
            procedure.decision_date.map(|d| d.to_string()),
        ),
        ("site_location", procedure.site_location_raw.clone()),
        ("developer_company", procedure.developer_company.clone()),
    ];

    fields
        .drain(..)
        .filter_map(|(field, value)| {
            value.map(|value| Extraction {
                id: Uuid::new_v4().to_string(),
                document_id: document.id.clone(),
                field: field.to_string(),
                value,
                method: "regex".to_string(),
                evidence_snippet: snippet.clone(),
                page: None,
            })
        })
        .collect()
}

fn to_candidate(
    item: DiscoveredItem,
    run_id: &str,
    municipality_key: &str,
    source: DiscoverySource,
) -> Candidate {
    let score = prefilter_score(&item.title, &item.url);
    Candidate {
        id: Uuid::new_v4().to_string(),
        run_id: run_id.to_string(),
        municipality_key: municipality_key.to_string(),
        discovery_source: source,
        discovery_path: item.discovery_path,
        title: item.title,
        url: item.url,
        date: item.date,
        doc_urls: item.doc_urls,
        prefilter_score: score,
        status: CandidateStatus::Pending,
    }
}

fn millis(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

fn looks_like_document(url: &str) -> bool {
    let lowered = url.to_lowercase();
    [".pdf", ".doc", ".docx"]
        .iter()
        .any(|ext| lowered.ends_with(ext))
}

fn guess_mime(url: &str) -> &'static str {
    let lowered = url.to_lowercase();
    if lowered.ends_with(".pdf") {
        "application/pdf"
    } else if lowered.ends_with(".doc") {
        "application/msword"
    } else if lowered.ends_with(".docx") {
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    } else {
        "text/html"
    }
}

fn status_from_reason(reason: ReasonCode, empty: bool) -> SourceStatus {
    match reason {
        ReasonCode::Found | ReasonCode::FoundButEmpty => SourceStatus::Success,
        ReasonCode::SslBlocked => SourceStatus::ErrorSsl,
        ReasonCode::AllUrls404 => SourceStatus::ErrorNetwork,
        ReasonCode::NoSeedUrl | ReasonCode::NoMarkersFound => {
            if empty {
                SourceStatus::ErrorOther
            } else {
                SourceStatus::Success
            }
        }
    }
}

fn fetch_error_status(error: &FetchError) -> SourceStatus {
    match error {
        FetchError::Ssl { .. } => SourceStatus::ErrorSsl,
        FetchError::Network { .. } | FetchError::Http { .. } => SourceStatus::ErrorNetwork,
        FetchError::InvalidUrl(_) | FetchError::RobotsDisallowed(_) => SourceStatus::ErrorOther,
    }
}

#[allow(clippy::too_many_arguments)]
fn write_stats(
    ctx: &WorkerContext,
    run_id: &str,
    job_id: &str,
    municipality_key: &str,
    source: DiscoverySource,
    counts: CrawlCounts,
    timings: CrawlTimings,
    started_at: chrono::DateTime<Utc>,
) -> Result<(), RepositoryError> {
    ctx.repo.insert_crawl_stats(&CrawlStats {
        run_id: run_id.to_string(),
        job_id: job_id.to_string(),
        municipality_key: municipality_key.to_string(),
        source_type: source.as_str().to_string(),
        counts,
        timings,
        started_at,
        finished_at: Utc::now(),
    })
}

/// One grep-able line per discovery completion, aggregating all sources of
/// the municipality seen so far in this run.
fn log_municipality_summary(
    ctx: &WorkerContext,
    run_id: &str,
    municipality_key: &str,
    municipality_name: &str,
) -> Result<(), RepositoryError> {
    let summaries = ctx.repo.source_summaries(run_id, municipality_key)?;
    let status_of = |source: &str| {
        summaries
            .iter()
            .find(|s| s.source_type == source)
            .map(|s| s.status)
            .unwrap_or(SourceStatus::NotRun)
    };
    let total: u64 = summaries.iter().map(|s| s.procedures_saved).sum();
    info!(
        "MUNICIPALITY_SUMMARY: {} ({}) | RIS={} | Amtsblatt={} | Municipal={} | Procedures={}",
        municipality_name,
        municipality_key,
        status_of("RIS").as_str(),
        status_of("AMTSBLATT").as_str(),
        status_of("MUNICIPAL_WEBSITE").as_str(),
        total
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_urls_are_detected() {
        assert!(looks_like_document("https://example.de/amtsblatt/07.PDF"));
        assert!(!looks_like_document("https://example.de/amtsblatt/07"));
    }

    #[test]
    fn reason_codes_map_to_source_status() {
        assert_eq!(
            status_from_reason(ReasonCode::Found, false),
            SourceStatus::Success
        );
        assert_eq!(
            status_from_reason(ReasonCode::SslBlocked, true),
            SourceStatus::ErrorSsl
        );
        assert_eq!(
            status_from_reason(ReasonCode::AllUrls404, true),
            SourceStatus::ErrorNetwork
        );
        assert_eq!(
            status_from_reason(ReasonCode::NoSeedUrl, true),
            SourceStatus::ErrorOther
        );
    }

    #[test]
    fn fetch_errors_map_to_source_status() {
        let ssl = FetchError::Ssl {
            url: "https://a".into(),
            message: "certificate".into(),
        };
        assert_eq!(fetch_error_status(&ssl), SourceStatus::ErrorSsl);
        let timeout = FetchError::Network {
            url: "https://a".into(),
            message: "timeout".into(),
        };
        assert_eq!(fetch_error_status(&timeout), SourceStatus::ErrorNetwork);
    }
}
