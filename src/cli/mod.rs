//! Command-line interface for the crawl worker.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{error, info};

use crate::config::Settings;
use crate::models::{CrawlMode, Job, MunicipalitySeed};
use crate::net::{HttpClient, RateLimiter, SslPolicy};
use crate::parser::PdfTextPipeline;
use crate::queue::{run_worker, JobQueue, WorkerContext};
use crate::repository::Repository;

#[derive(Parser)]
#[command(name = "bessharvest")]
#[command(about = "Harvester for municipal battery-storage planning procedures")]
#[command(version)]
struct Cli {
    /// Crawl mode (overrides CRAWL_MODE)
    #[arg(long, global = true, value_parser = parse_mode)]
    mode: Option<CrawlMode>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load municipality seeds into the database
    Init {
        /// JSON file with the municipality seed list
        seeds: PathBuf,
    },

    /// Crawl municipalities until the queue drains
    Run {
        /// JSON seed file to (re)load before crawling
        #[arg(long)]
        seeds: Option<PathBuf>,

        /// Crawl only this municipality key
        #[arg(long)]
        municipality: Option<String>,

        /// Number of concurrent workers (overrides CRAWL_WORKERS)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Run id; reusing one makes the run idempotent
        #[arg(long)]
        run_id: Option<String>,
    },
}

fn parse_mode(s: &str) -> Result<CrawlMode, String> {
    CrawlMode::parse(s).ok_or_else(|| format!("invalid mode '{}', expected fast or deep", s))
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

/// Parse arguments and run. Errors here are fatal (exit code 1).
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::from_env();
    if let Some(mode) = cli.mode {
        settings.mode = mode;
    }
    settings
        .ensure_directories()
        .map_err(|e| anyhow::anyhow!("cannot create data directories: {}", e))?;

    match cli.command {
        Commands::Init { seeds } => init(&settings, &seeds),
        Commands::Run {
            seeds,
            municipality,
            workers,
            run_id,
        } => {
            if let Some(workers) = workers {
                settings.workers = workers;
            }
            run_crawl(settings, seeds, municipality, run_id).await
        }
    }
}

fn load_seeds(path: &std::path::Path) -> anyhow::Result<Vec<MunicipalitySeed>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("cannot read seed file {}: {}", path.display(), e))?;
    serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("invalid seed file {}: {}", path.display(), e))
}

fn init(settings: &Settings, seeds_path: &std::path::Path) -> anyhow::Result<()> {
    let repo = Repository::open(&settings.database_path)?;
    let seeds = load_seeds(seeds_path)?;
    let count = repo.upsert_municipalities(&seeds)?;
    info!("loaded {} municipality seeds", count);
    Ok(())
}

async fn run_crawl(
    settings: Settings,
    seeds_path: Option<PathBuf>,
    municipality: Option<String>,
    run_id: Option<String>,
) -> anyhow::Result<()> {
    let repo = Repository::open(&settings.database_path)
        .map_err(|e| anyhow::anyhow!("database unreachable: {}", e))?;

    if let Some(path) = seeds_path {
        let seeds = load_seeds(&path)?;
        repo.upsert_municipalities(&seeds)?;
    }

    let mut seeds = repo.list_municipalities()?;
    if let Some(key) = &municipality {
        seeds.retain(|s| &s.municipality_key == key);
    }
    if seeds.is_empty() {
        anyhow::bail!("no municipality seeds loaded; run `bessharvest init <seeds.json>` first");
    }

    let run_id = run_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    info!(
        "starting run {} over {} municipalities (mode {})",
        run_id,
        seeds.len(),
        settings.mode.as_str()
    );

    let rate = RateLimiter::new(settings.global_concurrency, settings.per_domain_concurrency);
    let ssl = Arc::new(SslPolicy::new(
        &settings.ssl_insecure_allowlist,
        settings.allow_http_fallback,
    ));
    let http = HttpClient::new(&settings, rate, ssl.clone())?;
    let pdf = PdfTextPipeline::new(settings.text_cache_base.clone());

    let queue = Arc::new(JobQueue::new());
    for seed in &seeds {
        queue.push(Job::Municipality {
            run_id: run_id.clone(),
            municipality_key: seed.municipality_key.clone(),
            municipality_name: seed.name.clone(),
            mode: settings.mode,
        });
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            error!("shutdown signal received, finishing in-flight jobs");
            let _ = shutdown_tx.send(true);
        }
    });

    let worker_count = settings.workers.max(1);
    let ctx = Arc::new(WorkerContext {
        settings,
        repo: repo.clone(),
        http,
        pdf,
        queue: queue.clone(),
        shutdown: shutdown_rx,
    });

    let mut handles = Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        let ctx = ctx.clone();
        handles.push(tokio::spawn(run_worker(ctx)));
    }
    for handle in handles {
        let _ = handle.await;
    }

    let metrics = ssl.metrics();
    info!(
        "run {} finished: {} procedures, {} projects, {} audit sources \
         (ssl_errors={}, ssl_fallbacks={}, http_fallbacks={})",
        run_id,
        repo.count_procedures()?,
        repo.count_projects()?,
        repo.count_audit_sources()?,
        metrics.ssl_errors_total,
        metrics.ssl_fallback_used_total,
        metrics.http_fallback_used_total
    );
    Ok(())
}
