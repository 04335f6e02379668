//! Disk-backed HTTP response cache.
//!
//! Bodies live under `http/{hash[..2]}/{hash}.bin` with a `.meta.json`
//! sidecar carrying the validators (ETag, Last-Modified). Subsequent GETs
//! send conditional headers; a 304 serves the cached body. Writers use
//! last-write-wins; readers tolerate concurrent writes.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Sidecar metadata stored next to each cached body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMeta {
    pub url: String,
    pub cached_at: DateTime<Utc>,
    pub content_length: usize,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub content_type: Option<String>,
}

/// URL-keyed disk cache.
#[derive(Debug, Clone)]
pub struct HttpCache {
    base: PathBuf,
}

impl HttpCache {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn key(url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn paths(&self, url: &str) -> (PathBuf, PathBuf) {
        let key = Self::key(url);
        let dir = self.base.join(&key[..2]);
        (
            dir.join(format!("{}.bin", key)),
            dir.join(format!("{}.meta.json", key)),
        )
    }

    /// Cached body and metadata, if present.
    pub fn get(&self, url: &str) -> Option<(Vec<u8>, CacheMeta)> {
        let (body_path, meta_path) = self.paths(url);
        let meta: CacheMeta = serde_json::from_slice(&std::fs::read(meta_path).ok()?).ok()?;
        let body = std::fs::read(body_path).ok()?;
        Some((body, meta))
    }

    /// Conditional request headers for a URL, if validators are cached.
    pub fn validators(&self, url: &str) -> (Option<String>, Option<String>) {
        match self.get(url) {
            Some((_, meta)) => (meta.etag, meta.last_modified),
            None => (None, None),
        }
    }

    /// Store a response body with its validators. Last write wins.
    pub fn put(
        &self,
        url: &str,
        body: &[u8],
        etag: Option<String>,
        last_modified: Option<String>,
        content_type: Option<String>,
    ) -> std::io::Result<()> {
        let (body_path, meta_path) = self.paths(url);
        if let Some(parent) = body_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&body_path, body)?;
        let meta = CacheMeta {
            url: url.to_string(),
            cached_at: Utc::now(),
            content_length: body.len(),
            etag,
            last_modified,
            content_type,
        };
        std::fs::write(&meta_path, serde_json::to_vec_pretty(&meta)?)?;
        Ok(())
    }

    pub fn base(&self) -> &Path {
        &self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_with_validators() {
        let dir = tempdir().unwrap();
        let cache = HttpCache::new(dir.path());
        cache
            .put(
                "https://example.de/amtsblatt.pdf",
                b"pdf bytes",
                Some("\"abc\"".into()),
                Some("Tue, 02 Jul 2024 10:00:00 GMT".into()),
                Some("application/pdf".into()),
            )
            .unwrap();

        let (body, meta) = cache.get("https://example.de/amtsblatt.pdf").unwrap();
        assert_eq!(body, b"pdf bytes");
        assert_eq!(meta.etag.as_deref(), Some("\"abc\""));
        assert_eq!(meta.content_length, 9);

        let (etag, last_modified) = cache.validators("https://example.de/amtsblatt.pdf");
        assert!(etag.is_some());
        assert!(last_modified.is_some());
    }

    #[test]
    fn miss_returns_none() {
        let dir = tempdir().unwrap();
        let cache = HttpCache::new(dir.path());
        assert!(cache.get("https://example.de/unseen").is_none());
        assert_eq!(cache.validators("https://example.de/unseen"), (None, None));
    }

    #[test]
    fn different_urls_use_different_slots() {
        let dir = tempdir().unwrap();
        let cache = HttpCache::new(dir.path());
        cache.put("https://a.de/1", b"a", None, None, None).unwrap();
        cache.put("https://b.de/2", b"b", None, None, None).unwrap();
        assert_eq!(cache.get("https://a.de/1").unwrap().0, b"a");
        assert_eq!(cache.get("https://b.de/2").unwrap().0, b"b");
    }
}
