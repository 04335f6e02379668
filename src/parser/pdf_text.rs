//! Progressive PDF text extraction.
//!
//! Text is pulled with poppler's `pdftotext`. The first few pages are
//! extracted and scanned for trigger terms; only when a trigger is found is
//! the rest of the document extracted. Extracted text is cached on disk
//! keyed by sha256(url || content_length), so re-crawls of unchanged
//! documents never touch the PDF again.

use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use crate::classify::keywords::{BESS_EXPLICIT, PERMIT_STRONG, PLANNING_STRONG};
use crate::classify::normalize;
use crate::models::CrawlMode;

/// Pages extracted before the trigger check.
const INITIAL_PAGES_FAST: u32 = 3;
const INITIAL_PAGES_DEEP: u32 = 5;

/// Errors from the PDF pipeline.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("external tool not found: {0}")]
    ToolNotFound(&'static str),
    #[error("extraction failed: {0}")]
    Failed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result of one extraction.
#[derive(Debug, Clone)]
pub struct PdfExtraction {
    pub text: String,
    /// Byte offset of each page start within `text`.
    pub page_map: Vec<usize>,
    /// False when the PDF has no recoverable text layer; the document is
    /// then marked OCR_NEEDED (OCR itself is an external capability).
    pub has_text_layer: bool,
    /// Whether a trigger term caused full extraction.
    pub triggered: bool,
}

/// Content-addressed extraction pipeline.
#[derive(Debug, Clone)]
pub struct PdfTextPipeline {
    cache_base: PathBuf,
}

impl PdfTextPipeline {
    pub fn new(cache_base: impl Into<PathBuf>) -> Self {
        Self {
            cache_base: cache_base.into(),
        }
    }

    fn cache_key(url: &str, content_length: usize) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        hasher.update(content_length.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    fn cache_path(&self, key: &str) -> PathBuf {
        self.cache_base.join(&key[..2]).join(format!("{}.txt", key))
    }

    fn read_cache(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.cache_path(key)).ok()
    }

    fn write_cache(&self, key: &str, text: &str) {
        let path = self.cache_path(key);
        if let Some(parent) = path.parent() {
            if std::fs::create_dir_all(parent).is_ok() {
                if let Err(e) = std::fs::write(&path, text) {
                    debug!("text cache write failed for {}: {}", path.display(), e);
                }
            }
        }
    }

    /// Extract text, progressively. Blocking; run on a blocking thread.
    pub fn extract(
        &self,
        pdf_bytes: &[u8],
        url: &str,
        mode: CrawlMode,
    ) -> Result<PdfExtraction, ExtractError> {
        let key = Self::cache_key(url, pdf_bytes.len());
        if let Some(cached) = self.read_cache(&key) {
            debug!("pdf text cache hit for {}", url);
            return Ok(finish(cached, true));
        }

        let mut file = NamedTempFile::new()?;
        file.write_all(pdf_bytes)?;
        file.flush()?;
        let path = file.path().to_path_buf();

        let page_count = pdf_page_count(&path).unwrap_or(1);
        let initial_pages = match mode {
            CrawlMode::Fast => INITIAL_PAGES_FAST,
            CrawlMode::Deep => INITIAL_PAGES_DEEP,
        };

        let head_text = pdftotext_range(&path, 1, initial_pages.min(page_count))?;
        let triggered = has_trigger(&head_text);

        let text = if triggered && page_count > initial_pages {
            pdftotext_range(&path, 1, page_count)?
        } else {
            head_text
        };

        if !text.trim().is_empty() {
            self.write_cache(&key, &text);
        }
        Ok(finish(text, triggered))
    }
}

fn finish(text: String, triggered: bool) -> PdfExtraction {
    let has_text_layer = !text.trim().is_empty();
    PdfExtraction {
        page_map: page_map(&text),
        has_text_layer,
        triggered: triggered && has_text_layer,
        text,
    }
}

/// Trigger terms that justify extracting the whole document.
fn has_trigger(text: &str) -> bool {
    let norm = normalize(text).text;
    BESS_EXPLICIT.matches(&norm) || PERMIT_STRONG.matches(&norm) || PLANNING_STRONG.matches(&norm)
}

/// Page starts derived from the form feeds pdftotext emits between pages.
fn page_map(text: &str) -> Vec<usize> {
    let mut map = vec![0];
    for (idx, _) in text.match_indices('\u{c}') {
        map.push(idx + 1);
    }
    map
}

fn pdf_page_count(path: &std::path::Path) -> Option<u32> {
    let output = Command::new("pdfinfo").arg(path).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .lines()
        .find_map(|line| line.strip_prefix("Pages:"))
        .and_then(|rest| rest.trim().parse().ok())
}

fn pdftotext_range(path: &std::path::Path, first: u32, last: u32) -> Result<String, ExtractError> {
    let result = Command::new("pdftotext")
        .args(["-f", &first.to_string(), "-l", &last.to_string(), "-enc", "UTF-8"])
        .arg(path)
        .arg("-")
        .output();

    match result {
        Ok(output) if output.status.success() => {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        }
        Ok(output) => Err(ExtractError::Failed(
            String::from_utf8_lossy(&output.stderr).into_owned(),
        )),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ExtractError::ToolNotFound("pdftotext"))
        }
        Err(e) => Err(ExtractError::Io(e)),
    }
}
