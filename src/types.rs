//! Core types for the scorecard pipeline
//!
//! This module defines the event records that enter the pipeline and the
//! per-contributor scorecard that leaves it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A human contributor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Unique key (the Git host login)
    pub username: String,
    /// Name shown in tables and podiums
    pub display_name: String,
    /// Avatar image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl Identity {
    /// Identity whose display name is the username itself
    pub fn from_username(username: &str) -> Self {
        Self {
            username: username.to_string(),
            display_name: username.to_string(),
            avatar_url: None,
        }
    }
}

/// A merged (or open) pull request within the aggregation window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PullRequestEvent {
    /// Login of the PR author
    #[serde(default, alias = "authorUsername")]
    pub author_username: String,
    /// Author display name, if the upstream source resolved one
    #[serde(default, alias = "authorDisplayName", skip_serializing_if = "Option::is_none")]
    pub author_display_name: Option<String>,
    /// Author avatar URL
    #[serde(default, alias = "authorAvatarUrl", skip_serializing_if = "Option::is_none")]
    pub author_avatar_url: Option<String>,
    /// Repository the PR belongs to (log context only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    /// PR number (log context only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u64>,
    #[serde(default, alias = "commitCount")]
    pub commit_count: u32,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default, alias = "commentCount")]
    pub comment_count: u32,
    #[serde(default, alias = "reworkCycles")]
    pub rework_cycles: u32,
    /// First commit to merge, in milliseconds
    #[serde(default, alias = "leadTimeMs", skip_serializing_if = "Option::is_none")]
    pub lead_time_ms: Option<f64>,
    /// First approval to merge, in milliseconds
    #[serde(default, alias = "mergeTimeMs", skip_serializing_if = "Option::is_none")]
    pub merge_time_ms: Option<f64>,
    /// First review to last follow-up commit, in milliseconds
    #[serde(default, alias = "reworkTimeMs", skip_serializing_if = "Option::is_none")]
    pub rework_time_ms: Option<f64>,
    #[serde(default, alias = "reviewerUsernames")]
    pub reviewer_usernames: Vec<String>,
}

/// Outcome of a deployment run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    Success,
    Failure,
}

/// A deployment triggered by a contributor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentEvent {
    #[serde(default, alias = "actorUsername")]
    pub actor_username: String,
    pub status: DeploymentStatus,
    pub timestamp: DateTime<Utc>,
}

/// An incident assigned to a contributor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncidentEvent {
    #[serde(default, alias = "assigneeUsername")]
    pub assignee_username: String,
    #[serde(default, alias = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// How often a reviewer reviewed one contributor's PRs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerCount {
    pub username: String,
    pub display_name: String,
    pub count: u32,
}

/// Per-contributor DORA sub-metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DoraMetrics {
    /// Deployments per pull request
    pub deploy_frequency: f64,
    /// Failed deployments over all deployments (0-1)
    pub change_failure_rate: f64,
    /// Lead time proxy, only present when the contributor owns incidents
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_to_restore_ms: Option<f64>,
}

/// The aggregate record produced for each human contributor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributorScorecard {
    pub username: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,

    // Activity counters
    pub commit_count: u32,
    pub pr_count: u32,
    pub additions: u64,
    pub deletions: u64,
    pub comment_count: u32,
    pub rework_cycle_count: u32,

    // Running means over the contributor's PRs
    pub avg_lead_time_ms: Option<f64>,
    pub avg_merge_time_ms: Option<f64>,
    pub avg_rework_time_ms: Option<f64>,

    // Delivery
    pub deployment_count: u32,
    pub successful_deployments: u32,
    pub failed_deployments: u32,
    pub incident_count: u32,

    /// Most frequent reviewers of this contributor's PRs
    pub top_reviewers: Vec<ReviewerCount>,

    pub dora_metrics: DoraMetrics,
    /// Composite DORA score in [35, 94], absent when no metric had data
    pub dora_score: Option<u32>,
    /// Share of team activity; sums to 100 across one result set
    pub contribution_percentage: u32,
}

impl ContributorScorecard {
    /// Fresh scorecard with all counters at zero
    pub fn new(identity: Identity) -> Self {
        Self {
            username: identity.username,
            display_name: identity.display_name,
            avatar_url: identity.avatar_url,
            commit_count: 0,
            pr_count: 0,
            additions: 0,
            deletions: 0,
            comment_count: 0,
            rework_cycle_count: 0,
            avg_lead_time_ms: None,
            avg_merge_time_ms: None,
            avg_rework_time_ms: None,
            deployment_count: 0,
            successful_deployments: 0,
            failed_deployments: 0,
            incident_count: 0,
            top_reviewers: Vec::new(),
            dora_metrics: DoraMetrics::default(),
            dora_score: None,
            contribution_percentage: 0,
        }
    }

    /// Lines added plus lines removed
    pub fn churn(&self) -> u64 {
        self.additions.saturating_add(self.deletions)
    }
}

/// Events dropped while joining, by reason
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipCounts {
    /// Missing identity field or invalid duration
    pub malformed: u32,
    /// Authored, deployed or assigned to an automated account
    pub bots: u32,
    /// Deployment or incident for someone with no pull request in the window
    pub unknown_contributor: u32,
}

impl SkipCounts {
    pub fn total(&self) -> u32 {
        self.malformed
            .saturating_add(self.bots)
            .saturating_add(self.unknown_contributor)
    }
}

// ============================================================================
// Report output
// ============================================================================

/// Versioned report wrapping one aggregation result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScorecardReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub provenance: ReportProvenance,
    pub summary: ReportSummary,
    pub contributors: Vec<ContributorScorecard>,
}

/// Producer metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// What went into the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProvenance {
    pub computed_at_utc: String,
    pub pull_requests_seen: usize,
    pub deployments_seen: usize,
    pub incidents_seen: usize,
    pub skipped: SkipCounts,
}

/// Team-level totals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub contributor_count: usize,
    pub total_commits: u64,
    pub total_pull_requests: u64,
    /// Mean over contributors that have a score
    pub mean_dora_score: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pull_request_accepts_camel_case() {
        let json = r#"{
            "authorUsername": "alice",
            "commitCount": 3,
            "additions": 120,
            "deletions": 40,
            "leadTimeMs": 3600000,
            "reviewerUsernames": ["bob"]
        }"#;

        let pr: PullRequestEvent = serde_json::from_str(json).unwrap();
        assert_eq!(pr.author_username, "alice");
        assert_eq!(pr.commit_count, 3);
        assert_eq!(pr.lead_time_ms, Some(3_600_000.0));
        assert_eq!(pr.merge_time_ms, None);
        assert_eq!(pr.reviewer_usernames, vec!["bob".to_string()]);
    }

    #[test]
    fn test_missing_author_defaults_to_blank() {
        let pr: PullRequestEvent = serde_json::from_str(r#"{"commit_count": 1}"#).unwrap();
        assert!(pr.author_username.is_empty());
    }

    #[test]
    fn test_deployment_status_lowercase() {
        let json = r#"{"actor_username": "alice", "status": "failure", "timestamp": "2024-03-01T10:00:00Z"}"#;
        let deployment: DeploymentEvent = serde_json::from_str(json).unwrap();
        assert_eq!(deployment.status, DeploymentStatus::Failure);

        let out = serde_json::to_value(&deployment).unwrap();
        assert_eq!(out["status"], "failure");
    }

    #[test]
    fn test_new_scorecard_is_empty() {
        let card = ContributorScorecard::new(Identity::from_username("alice"));
        assert_eq!(card.display_name, "alice");
        assert_eq!(card.pr_count, 0);
        assert_eq!(card.churn(), 0);
        assert!(card.avg_lead_time_ms.is_none());
        assert!(card.dora_score.is_none());
    }

    #[test]
    fn test_churn_saturates() {
        let mut card = ContributorScorecard::new(Identity::from_username("alice"));
        card.additions = u64::MAX - 1;
        card.deletions = 5;
        assert_eq!(card.churn(), u64::MAX);

        let skipped = SkipCounts {
            malformed: u32::MAX,
            bots: 1,
            unknown_contributor: 1,
        };
        assert_eq!(skipped.total(), u32::MAX);
    }
}
