//! Runtime settings, environment-driven.

use std::path::PathBuf;

use crate::models::CrawlMode;

/// Application settings. Defaults match a containerized deployment; every
/// field can be overridden through `CRAWL_*` environment variables.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Crawl depth mode.
    pub mode: CrawlMode,
    /// Global cap on in-flight requests.
    pub global_concurrency: usize,
    /// Per-host cap on in-flight requests.
    pub per_domain_concurrency: usize,
    /// TCP connect timeout in seconds.
    pub connect_timeout_s: u64,
    /// Full-request timeout in seconds.
    pub timeout_s: u64,
    /// Attempts per URL on retryable failures.
    pub retries: u32,
    /// PDFs above this size are skipped in fast mode.
    pub pdf_max_size_mb: u64,
    /// Base directory for the robots and HTTP caches.
    pub cache_base: PathBuf,
    /// Base directory for extracted PDF text.
    pub text_cache_base: PathBuf,
    /// Base directory for document blobs.
    pub storage_base: PathBuf,
    /// SQLite database location.
    pub database_path: PathBuf,
    /// Extra hosts allowed to bypass SSL verification after an SSL error.
    pub ssl_insecure_allowlist: Vec<String>,
    /// Whether RIS requests may downgrade HTTPS to HTTP after an SSL error.
    pub allow_http_fallback: bool,
    /// Number of concurrent workers.
    pub workers: usize,
}

impl Default for Settings {
    fn default() -> Self {
        let data_dir = PathBuf::from("data");
        Self {
            mode: CrawlMode::Fast,
            global_concurrency: 100,
            per_domain_concurrency: 2,
            connect_timeout_s: 10,
            timeout_s: 30,
            retries: 3,
            pdf_max_size_mb: 25,
            text_cache_base: data_dir.join("cache").join("pdf_text"),
            cache_base: data_dir.join("cache"),
            storage_base: data_dir.join("documents"),
            database_path: data_dir.join("bessharvest.db"),
            ssl_insecure_allowlist: Vec::new(),
            allow_http_fallback: false,
            workers: 4,
        }
    }
}

impl Settings {
    /// Load settings with environment overrides applied.
    pub fn from_env() -> Self {
        let mut settings = Self::default();

        if let Some(mode) = env_str("CRAWL_MODE").and_then(|s| CrawlMode::parse(&s)) {
            settings.mode = mode;
        }
        if let Some(v) = env_parse("CRAWL_GLOBAL_CONCURRENCY") {
            settings.global_concurrency = v;
        }
        if let Some(v) = env_parse("CRAWL_PER_DOMAIN_CONCURRENCY") {
            settings.per_domain_concurrency = v;
        }
        if let Some(v) = env_parse("CRAWL_TIMEOUT_S") {
            settings.timeout_s = v;
        }
        if let Some(v) = env_parse("CRAWL_RETRIES") {
            settings.retries = v;
        }
        if let Some(v) = env_parse("CRAWL_PDF_MAX_SIZE_MB") {
            settings.pdf_max_size_mb = v;
        }
        if let Some(v) = env_str("CRAWL_CACHE_BASE") {
            settings.cache_base = PathBuf::from(v);
            settings.text_cache_base = settings.cache_base.join("pdf_text");
        }
        if let Some(v) = env_str("CRAWL_TEXT_CACHE_BASE") {
            settings.text_cache_base = PathBuf::from(v);
        }
        if let Some(v) = env_str("STORAGE_BASE_PATH") {
            settings.storage_base = PathBuf::from(v);
        }
        if let Some(v) = env_str("DATABASE_PATH") {
            settings.database_path = PathBuf::from(v);
        }
        if let Some(v) = env_str("CRAWL_SSL_INSECURE_ALLOWLIST") {
            settings.ssl_insecure_allowlist = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(v) = env_str("CRAWL_ALLOW_HTTP_FALLBACK") {
            settings.allow_http_fallback =
                matches!(v.to_lowercase().as_str(), "true" | "1" | "yes" | "on");
        }
        if let Some(v) = env_parse("CRAWL_WORKERS") {
            settings.workers = v;
        }

        settings
    }

    /// Create all directories the crawl writes into.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.cache_base.join("robots"))?;
        std::fs::create_dir_all(self.cache_base.join("http"))?;
        std::fs::create_dir_all(&self.text_cache_base)?;
        std::fs::create_dir_all(self.storage_base.join("docs"))?;
        if let Some(parent) = self.database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

fn env_str(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_str(key).and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_contract() {
        let settings = Settings::default();
        assert_eq!(settings.mode, CrawlMode::Fast);
        assert_eq!(settings.global_concurrency, 100);
        assert_eq!(settings.per_domain_concurrency, 2);
        assert_eq!(settings.connect_timeout_s, 10);
        assert_eq!(settings.timeout_s, 30);
        assert_eq!(settings.retries, 3);
        assert_eq!(settings.pdf_max_size_mb, 25);
        assert!(!settings.allow_http_fallback);
    }
}
