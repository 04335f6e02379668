//! Document records with content-addressed identity.
//!
//! The SHA-256 of the bytes is the identity: the same bytes fetched from two
//! URLs are one document.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A stored document blob plus its extracted text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub source_id: String,
    pub doc_url: String,
    pub content_sha256: String,
    pub bytes: u64,
    pub mime: String,
    pub storage_path: String,
    pub has_text_layer: bool,
    /// Byte offset of each page start within `extracted_text`, when known.
    pub page_map: Option<Vec<usize>>,
    pub extracted_text: String,
    /// Set when the PDF has no recoverable text layer; OCR is an external
    /// capability and never runs here.
    pub ocr_needed: bool,
}

impl DocumentRecord {
    /// Compute the content identity of a byte blob.
    pub fn compute_sha256(content: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content);
        hex::encode(hasher.finalize())
    }
}

/// One extracted field value with its provenance.
///
/// Append-only per (document, field, method).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extraction {
    pub id: String,
    pub document_id: String,
    pub field: String,
    pub value: String,
    pub method: String,
    pub evidence_snippet: String,
    pub page: Option<u32>,
}
