//! Job payloads for the crawl queue.

use serde::{Deserialize, Serialize};

/// Crawl depth mode. Fast mode trades recall for throughput.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CrawlMode {
    #[default]
    Fast,
    Deep,
}

impl CrawlMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Deep => "deep",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fast" => Some(Self::Fast),
            "deep" => Some(Self::Deep),
            _ => None,
        }
    }
}

/// A queued unit of work.
///
/// A `Municipality` job fans out into the three discovery jobs; discovery
/// jobs emit candidates and enqueue `Extraction` jobs for those passing the
/// prefilter threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Job {
    Municipality {
        run_id: String,
        municipality_key: String,
        municipality_name: String,
        mode: CrawlMode,
    },
    DiscoveryRIS {
        run_id: String,
        municipality_key: String,
        municipality_name: String,
        entrypoint: Option<String>,
        mode: CrawlMode,
    },
    DiscoveryGazette {
        run_id: String,
        municipality_key: String,
        municipality_name: String,
        entrypoint: Option<String>,
        mode: CrawlMode,
    },
    DiscoveryMunicipal {
        run_id: String,
        municipality_key: String,
        municipality_name: String,
        entrypoint: Option<String>,
        mode: CrawlMode,
    },
    Extraction {
        run_id: String,
        municipality_key: String,
        candidate_id: String,
        mode: CrawlMode,
    },
}

impl Job {
    pub fn run_id(&self) -> &str {
        match self {
            Job::Municipality { run_id, .. }
            | Job::DiscoveryRIS { run_id, .. }
            | Job::DiscoveryGazette { run_id, .. }
            | Job::DiscoveryMunicipal { run_id, .. }
            | Job::Extraction { run_id, .. } => run_id,
        }
    }

    pub fn municipality_key(&self) -> &str {
        match self {
            Job::Municipality { municipality_key, .. }
            | Job::DiscoveryRIS { municipality_key, .. }
            | Job::DiscoveryGazette { municipality_key, .. }
            | Job::DiscoveryMunicipal { municipality_key, .. }
            | Job::Extraction { municipality_key, .. } => municipality_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_payload_round_trips_as_json() {
        let job = Job::Extraction {
            run_id: "r1".into(),
            municipality_key: "12060020".into(),
            candidate_id: "c1".into(),
            mode: CrawlMode::Deep,
        };
        let json = serde_json::to_string(&job).unwrap();
        assert!(json.contains("\"type\":\"Extraction\""));
        assert!(json.contains("\"mode\":\"deep\""));
        let back: Job = serde_json::from_str(&json).unwrap();
        assert_eq!(back.run_id(), "r1");
    }
}
