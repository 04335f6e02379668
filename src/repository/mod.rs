//! SQLite-backed persistence.
//!
//! The repository opens a connection per call from a stored path, so clones
//! can be used from any worker without shared connection state. All
//! multi-row writes go through single transactions.

mod candidates;
mod procedures;
mod projects;
mod schema;
mod stats;

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use thiserror::Error;

pub use procedures::ExtractionBatch;
pub use stats::SourceSummary;

/// Repository errors. Database failures abort the current job.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("corrupt row: {0}")]
    CorruptRow(String),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Handle to the crawl database.
#[derive(Debug, Clone)]
pub struct Repository {
    db_path: PathBuf,
}

impl Repository {
    /// Open (and initialize) the database at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let repo = Self {
            db_path: path.into(),
        };
        let conn = repo.connect()?;
        schema::init(&conn)?;
        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub(crate) fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "busy_timeout", 5000)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(conn)
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::Repository;
    use tempfile::TempDir;

    /// A repository on a temp database, kept alive with its directory.
    pub fn temp_repo() -> (Repository, TempDir) {
        let dir = TempDir::new().expect("tempdir");
        let repo = Repository::open(dir.path().join("test.db")).expect("open repo");
        (repo, dir)
    }
}
