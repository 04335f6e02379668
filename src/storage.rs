//! Content-addressed document blob storage.
//!
//! Blobs land under `docs/{sha256[..2]}/{sha256}.{ext}`; identical bytes
//! from different URLs share one file.

use std::path::{Path, PathBuf};

/// Relative blob path for a content hash.
pub fn blob_relative_path(sha256: &str, extension: &str) -> String {
    format!("docs/{}/{}.{}", &sha256[..2], sha256, extension)
}

/// Write a blob if absent. Returns the relative path.
pub fn save_blob(
    base: &Path,
    sha256: &str,
    extension: &str,
    content: &[u8],
) -> std::io::Result<String> {
    let relative = blob_relative_path(sha256, extension);
    let target = base.join(&relative);
    if !target.exists() {
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, content)?;
    }
    Ok(relative)
}

/// Read a blob back by its relative path.
pub fn read_blob(base: &Path, relative: &str) -> std::io::Result<Vec<u8>> {
    std::fs::read(base.join(relative))
}

/// Absolute path of a stored blob.
pub fn blob_path(base: &Path, relative: &str) -> PathBuf {
    base.join(relative)
}

/// Map a MIME type to the stored file extension.
pub fn mime_to_extension(mime: &str) -> &'static str {
    let essence = mime.split(';').next().unwrap_or(mime).trim();
    match essence {
        "application/pdf" => "pdf",
        "text/html" => "html",
        "text/plain" => "txt",
        "application/xml" | "text/xml" => "xml",
        "application/msword" => "doc",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => "docx",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentRecord;
    use tempfile::tempdir;

    #[test]
    fn blob_path_uses_hash_prefix() {
        let sha = "ab".to_string() + &"0".repeat(62);
        assert_eq!(
            blob_relative_path(&sha, "pdf"),
            format!("docs/ab/{}.pdf", sha)
        );
    }

    #[test]
    fn save_and_read_round_trip() {
        let dir = tempdir().unwrap();
        let content = b"pdf content";
        let sha = DocumentRecord::compute_sha256(content);
        let relative = save_blob(dir.path(), &sha, "pdf", content).unwrap();
        assert_eq!(read_blob(dir.path(), &relative).unwrap(), content);
    }

    #[test]
    fn identical_bytes_share_one_file() {
        let dir = tempdir().unwrap();
        let content = b"same bytes";
        let sha = DocumentRecord::compute_sha256(content);
        let a = save_blob(dir.path(), &sha, "pdf", content).unwrap();
        let b = save_blob(dir.path(), &sha, "pdf", content).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn mime_mapping() {
        assert_eq!(mime_to_extension("application/pdf"), "pdf");
        assert_eq!(mime_to_extension("text/html; charset=utf-8"), "html");
        assert_eq!(mime_to_extension("application/x-unknown"), "bin");
    }
}
