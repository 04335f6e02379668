//! Data models for bessharvest.

mod candidate;
mod document;
mod job;
mod municipality;
mod procedure;
mod project;
mod source;
mod stats;

pub use candidate::{Candidate, CandidateStatus, DiscoverySource};
pub use document::{DocumentRecord, Extraction};
pub use job::{CrawlMode, Job};
pub use municipality::MunicipalitySeed;
pub use procedure::{make_procedure_id, LegalBasis, Procedure, ProcedureType, ProjectComponents};
pub use project::{MatchLevel, MaturityStage, ProjectEntity};
pub use source::SourceRecord;
pub use stats::{
    CrawlCounts, CrawlStats, CrawlTimings, DiscoveryDiagnostics, DiscoveryMethod, ReasonCode,
    SourceStatus,
};
