//! Report encoding
//!
//! Wraps an aggregation result into a versioned report with producer and
//! provenance metadata, ready for presentation layers.

use chrono::Utc;
use uuid::Uuid;

use crate::error::ScorecardError;
use crate::pipeline::AggregateOutcome;
use crate::types::{
    ContributorScorecard, ReportProducer, ReportProvenance, ReportSummary, ScorecardReport,
};
use crate::{ENGINE_VERSION, PRODUCER_NAME};

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Encoder for scorecard reports
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Encode an aggregation outcome into a report
    pub fn encode(&self, outcome: &AggregateOutcome) -> ScorecardReport {
        let producer = ReportProducer {
            name: PRODUCER_NAME.to_string(),
            version: ENGINE_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        };

        let provenance = ReportProvenance {
            computed_at_utc: Utc::now().to_rfc3339(),
            pull_requests_seen: outcome.pull_requests_seen,
            deployments_seen: outcome.deployments_seen,
            incidents_seen: outcome.incidents_seen,
            skipped: outcome.skipped,
        };

        ScorecardReport {
            report_version: REPORT_VERSION.to_string(),
            producer,
            provenance,
            summary: build_summary(&outcome.scorecards),
            contributors: outcome.scorecards.clone(),
        }
    }

    /// Encode to a pretty-printed JSON string
    pub fn encode_to_json(&self, outcome: &AggregateOutcome) -> Result<String, ScorecardError> {
        let report = self.encode(outcome);
        serde_json::to_string_pretty(&report).map_err(|e| ScorecardError::EncodingError(e.to_string()))
    }
}

fn build_summary(scorecards: &[ContributorScorecard]) -> ReportSummary {
    let scores: Vec<f64> = scorecards
        .iter()
        .filter_map(|c| c.dora_score)
        .map(f64::from)
        .collect();
    let mean_dora_score = if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    };

    ReportSummary {
        contributor_count: scorecards.len(),
        total_commits: scorecards.iter().map(|c| u64::from(c.commit_count)).sum(),
        total_pull_requests: scorecards.iter().map(|c| u64::from(c.pr_count)).sum(),
        mean_dora_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Identity, SkipCounts};

    fn scored(username: &str, commits: u32, prs: u32, score: Option<u32>) -> ContributorScorecard {
        let mut card = ContributorScorecard::new(Identity::from_username(username));
        card.commit_count = commits;
        card.pr_count = prs;
        card.dora_score = score;
        card
    }

    fn sample_outcome() -> AggregateOutcome {
        AggregateOutcome {
            scorecards: vec![
                scored("alice", 12, 3, Some(70)),
                scored("bob", 2, 1, Some(50)),
                scored("carol", 1, 1, None),
            ],
            skipped: SkipCounts {
                malformed: 1,
                bots: 2,
                unknown_contributor: 0,
            },
            pull_requests_seen: 8,
            deployments_seen: 3,
            incidents_seen: 1,
        }
    }

    #[test]
    fn test_encode_metadata() {
        let encoder = ReportEncoder::with_instance_id("test-instance".to_string());
        let report = encoder.encode(&sample_outcome());

        assert_eq!(report.report_version, REPORT_VERSION);
        assert_eq!(report.producer.name, PRODUCER_NAME);
        assert_eq!(report.producer.version, ENGINE_VERSION);
        assert_eq!(report.producer.instance_id, "test-instance");
        assert_eq!(report.provenance.pull_requests_seen, 8);
        assert_eq!(report.provenance.skipped.bots, 2);
        assert!(chrono::DateTime::parse_from_rfc3339(&report.provenance.computed_at_utc).is_ok());
    }

    #[test]
    fn test_summary() {
        let report = ReportEncoder::new().encode(&sample_outcome());

        assert_eq!(report.summary.contributor_count, 3);
        assert_eq!(report.summary.total_commits, 15);
        assert_eq!(report.summary.total_pull_requests, 5);
        assert_eq!(report.summary.mean_dora_score, Some(60.0));
    }

    #[test]
    fn test_summary_without_scores() {
        let outcome = AggregateOutcome {
            scorecards: Vec::new(),
            skipped: SkipCounts::default(),
            pull_requests_seen: 0,
            deployments_seen: 0,
            incidents_seen: 0,
        };
        let report = ReportEncoder::new().encode(&outcome);
        assert_eq!(report.summary.contributor_count, 0);
        assert_eq!(report.summary.mean_dora_score, None);
    }

    #[test]
    fn test_encode_to_json() {
        let json = ReportEncoder::new().encode_to_json(&sample_outcome()).unwrap();
        let payload: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(payload["report_version"], "1.0.0");
        assert_eq!(payload["producer"]["name"], PRODUCER_NAME);
        assert_eq!(payload["contributors"][0]["username"], "alice");
        assert!(payload["contributors"][2]["dora_score"].is_null());
        assert!(payload["producer"]["instance_id"].is_string());
    }

    #[test]
    fn test_instance_ids_are_unique() {
        let a = ReportEncoder::new().encode(&sample_outcome());
        let b = ReportEncoder::new().encode(&sample_outcome());
        assert_ne!(a.producer.instance_id, b.producer.instance_id);
    }
}
