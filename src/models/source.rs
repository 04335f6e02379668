//! Source records: the audit trail of where a procedure was seen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::candidate::DiscoverySource;

/// One retrieval of one URL.
///
/// A record with `procedure_id = None` is audit-only: the item was a
/// container or was rejected, but the fetch itself is still evidenced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: String,
    pub procedure_id: Option<String>,
    pub source_url: String,
    pub retrieved_at: DateTime<Utc>,
    pub http_status: u16,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub discovery_source: DiscoverySource,
    pub discovery_path: String,
}

impl SourceRecord {
    /// Audit-only record for a rejected or container item.
    pub fn audit_only(
        source_url: String,
        http_status: u16,
        discovery_source: DiscoverySource,
        discovery_path: String,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            procedure_id: None,
            source_url,
            retrieved_at: Utc::now(),
            http_status,
            etag: None,
            last_modified: None,
            discovery_source,
            discovery_path,
        }
    }
}
