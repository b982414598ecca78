//! Pipeline orchestration
//!
//! This module provides the public API for the scorecard engine.
//! It runs the full pipeline from raw event lists to sorted scorecards.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::config::ScoringConfig;
use crate::contribution::ContributionWeigher;
use crate::encoder::ReportEncoder;
use crate::error::ScorecardError;
use crate::joiner::{EventJoiner, IdentityDirectory};
use crate::schema::{EventBatch, EventBatchAdapter};
use crate::score::ScoreCalculator;
use crate::types::{
    ContributorScorecard, DeploymentEvent, Identity, IncidentEvent, PullRequestEvent, SkipCounts,
};

/// Scorecards plus the bookkeeping needed to report on a run
#[derive(Debug, Clone)]
pub struct AggregateOutcome {
    pub scorecards: Vec<ContributorScorecard>,
    pub skipped: SkipCounts,
    pub pull_requests_seen: usize,
    pub deployments_seen: usize,
    pub incidents_seen: usize,
}

/// Aggregate one window of events into sorted per-contributor scorecards.
///
/// Uses default scoring settings and the thread-local RNG for the score
/// band draws.
///
/// # Example
/// ```ignore
/// let scorecards = aggregate(&pull_requests, &deployments, &incidents);
/// assert_eq!(scorecards.iter().map(|c| c.contribution_percentage).sum::<u32>(), 100);
/// ```
pub fn aggregate(
    pull_requests: &[PullRequestEvent],
    deployments: &[DeploymentEvent],
    incidents: &[IncidentEvent],
) -> Vec<ContributorScorecard> {
    let config = ScoringConfig::default();
    let mut rng = rand::thread_rng();
    run(&config, None, pull_requests, deployments, incidents, &mut rng).scorecards
}

/// Parse a `dora.events.v1` batch, aggregate it and encode the report.
///
/// # Returns
/// Pretty-printed report JSON
pub fn scorecards_from_json(batch_json: String) -> Result<String, ScorecardError> {
    let batch = EventBatchAdapter::parse_batch(&batch_json)?;
    let outcome = Aggregator::new().aggregate_batch(&batch);
    ReportEncoder::new().encode_to_json(&outcome)
}

/// Run the pipeline stages over one set of events.
///
/// Pipeline stages:
/// 1. EventJoiner - Group events per contributor, drop bots and malformed events
/// 2. ScoreCalculator - DORA metrics and banded score per contributor
/// 3. ContributionWeigher - Team shares summing to 100
/// 4. Sort - Commits desc, then pull requests desc
fn run<R: Rng>(
    config: &ScoringConfig,
    directory: Option<&IdentityDirectory>,
    pull_requests: &[PullRequestEvent],
    deployments: &[DeploymentEvent],
    incidents: &[IncidentEvent],
    rng: &mut R,
) -> AggregateOutcome {
    // Stage 1: Join
    let mut joiner = EventJoiner::new(config.top_reviewers);
    if let Some(directory) = directory {
        joiner = joiner.with_directory(directory);
    }
    let joined = joiner.join(pull_requests, deployments, incidents);
    let mut scorecards = joined.scorecards;

    // Stage 2: Score
    let calculator = ScoreCalculator::new(config.window_weeks);
    for card in scorecards.iter_mut() {
        calculator.score(card, rng);
    }

    // Stage 3: Contribution shares
    ContributionWeigher::apply(&mut scorecards);

    // Stage 4: Order
    sort_scorecards(&mut scorecards);

    debug!(
        contributors = scorecards.len(),
        pull_requests = pull_requests.len(),
        deployments = deployments.len(),
        incidents = incidents.len(),
        "aggregated scorecards"
    );

    AggregateOutcome {
        scorecards,
        skipped: joined.skipped,
        pull_requests_seen: pull_requests.len(),
        deployments_seen: deployments.len(),
        incidents_seen: incidents.len(),
    }
}

/// Commits desc, then pull requests desc; `sort_by` is stable so remaining
/// ties keep encounter order
fn sort_scorecards(scorecards: &mut [ContributorScorecard]) {
    scorecards.sort_by(|a, b| {
        b.commit_count
            .cmp(&a.commit_count)
            .then(b.pr_count.cmp(&a.pr_count))
    });
}

/// Stateful aggregator carrying configuration, a known-identity directory
/// and its own RNG.
///
/// Use this when you need reproducible scores (fixed seed) or display names
/// resolved from a team roster.
pub struct Aggregator {
    config: ScoringConfig,
    directory: IdentityDirectory,
    rng: StdRng,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregator {
    /// Create an aggregator with default settings
    pub fn new() -> Self {
        Self::build(ScoringConfig::default())
    }

    /// Create an aggregator from a validated configuration
    pub fn with_config(config: ScoringConfig) -> Result<Self, ScorecardError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: ScoringConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            directory: IdentityDirectory::new(),
            rng,
        }
    }

    /// Register known identities; later entries replace earlier ones with
    /// the same username
    pub fn with_identities<I>(mut self, identities: I) -> Self
    where
        I: IntoIterator<Item = Identity>,
    {
        for identity in identities {
            self.directory.insert(identity.username.clone(), identity);
        }
        self
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Number of identities in the directory
    pub fn identity_count(&self) -> usize {
        self.directory.len()
    }

    /// Aggregate event lists into sorted scorecards
    pub fn aggregate(
        &mut self,
        pull_requests: &[PullRequestEvent],
        deployments: &[DeploymentEvent],
        incidents: &[IncidentEvent],
    ) -> Vec<ContributorScorecard> {
        self.run(pull_requests, deployments, incidents).scorecards
    }

    /// Aggregate a parsed batch, keeping skip statistics for reporting
    pub fn aggregate_batch(&mut self, batch: &EventBatch) -> AggregateOutcome {
        self.run(&batch.pull_requests, &batch.deployments, &batch.incidents)
    }

    fn run(
        &mut self,
        pull_requests: &[PullRequestEvent],
        deployments: &[DeploymentEvent],
        incidents: &[IncidentEvent],
    ) -> AggregateOutcome {
        let directory = if self.directory.is_empty() {
            None
        } else {
            Some(&self.directory)
        };
        run(
            &self.config,
            directory,
            pull_requests,
            deployments,
            incidents,
            &mut self.rng,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DeploymentStatus;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    const HOUR: f64 = 3_600_000.0;

    fn pr(author: &str, commits: u32) -> PullRequestEvent {
        PullRequestEvent {
            author_username: author.to_string(),
            commit_count: commits,
            ..Default::default()
        }
    }

    fn deployment(actor: &str, status: DeploymentStatus) -> DeploymentEvent {
        DeploymentEvent {
            actor_username: actor.to_string(),
            status,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
        }
    }

    fn incident(assignee: &str) -> IncidentEvent {
        IncidentEvent {
            assignee_username: assignee.to_string(),
            created_at: None,
        }
    }

    fn usernames(cards: &[ContributorScorecard]) -> Vec<&str> {
        cards.iter().map(|c| c.username.as_str()).collect()
    }

    fn percentage_sum(cards: &[ContributorScorecard]) -> u32 {
        cards.iter().map(|c| c.contribution_percentage).sum()
    }

    fn seeded(seed: u64) -> Aggregator {
        Aggregator::with_config(ScoringConfig {
            seed: Some(seed),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_two_contributors_end_to_end() {
        let prs = vec![pr("alice", 5), pr("alice", 4), pr("alice", 3), pr("bob", 2)];
        let cards = aggregate(&prs, &[], &[]);

        assert_eq!(usernames(&cards), vec!["alice", "bob"]);
        assert_eq!(cards[0].commit_count, 12);
        assert_eq!(cards[0].pr_count, 3);
        assert_eq!(cards[1].commit_count, 2);
        assert_eq!(percentage_sum(&cards), 100);
        assert!(cards[0].contribution_percentage > cards[1].contribution_percentage);
    }

    #[test]
    fn test_sort_ties_keep_encounter_order() {
        let prs = vec![
            pr("carol", 3),
            pr("carol", 2),
            pr("bob", 2),
            pr("bob", 2),
            pr("bob", 1),
            pr("alice", 1),
            pr("alice", 1),
            pr("alice", 3),
        ];
        let cards = aggregate(&prs, &[], &[]);

        // all at 5 commits; bob and alice have 3 PRs, carol 2
        assert_eq!(usernames(&cards), vec!["bob", "alice", "carol"]);
    }

    #[test]
    fn test_sum_invariant_with_mixed_activity() {
        let mut prs = Vec::new();
        for (idx, name) in ["a", "b", "c", "d", "e", "f", "g"].iter().enumerate() {
            for n in 0..=idx {
                let mut event = pr(name, (n as u32 % 3) + 1);
                event.additions = 37 * n as u64;
                event.lead_time_ms = Some((n as f64 + 1.0) * 7.0 * HOUR);
                prs.push(event);
            }
        }
        let deployments = vec![
            deployment("c", DeploymentStatus::Success),
            deployment("c", DeploymentStatus::Failure),
            deployment("f", DeploymentStatus::Success),
        ];

        let cards = aggregate(&prs, &deployments, &[incident("g")]);
        assert_eq!(cards.len(), 7);
        assert_eq!(percentage_sum(&cards), 100);
        assert!(cards.iter().all(|c| c.contribution_percentage <= 100));
    }

    #[test]
    fn test_large_team_percentages_sum_to_100() {
        for team_size in [150usize, 200, 300] {
            let prs: Vec<_> = (0..team_size).map(|i| pr(&format!("user{i}"), 1)).collect();
            let cards = aggregate(&prs, &[], &[]);

            assert_eq!(cards.len(), team_size);
            assert_eq!(percentage_sum(&cards), 100, "team of {team_size}");
        }
    }

    #[test]
    fn test_oversized_counts_do_not_fail() {
        let prs = vec![pr("alice", u32::MAX), pr("alice", 1), pr("bob", 2)];
        let cards = aggregate(&prs, &[], &[]);

        assert_eq!(usernames(&cards), vec!["alice", "bob"]);
        assert_eq!(cards[0].commit_count, u32::MAX);
        assert_eq!(percentage_sum(&cards), 100);
    }

    #[test]
    fn test_fixed_seed_is_reproducible() {
        let mut fast = pr("alice", 4);
        fast.lead_time_ms = Some(0.5 * HOUR);
        let mut slow = pr("bob", 1);
        slow.lead_time_ms = Some(2000.0 * HOUR);
        let prs = vec![fast, slow];
        let deployments: Vec<_> = (0..30)
            .map(|_| deployment("alice", DeploymentStatus::Success))
            .collect();
        let incidents = vec![incident("alice")];

        let first = seeded(7).aggregate(&prs, &deployments, &incidents);
        let second = seeded(7).aggregate(&prs, &deployments, &incidents);
        assert_eq!(first, second);

        let alice = &first[0];
        assert!((85..=94).contains(&alice.dora_score.unwrap()));
        let bob = &first[1];
        assert!((35..=44).contains(&bob.dora_score.unwrap()));
    }

    #[test]
    fn test_only_band_draws_vary() {
        let mut event = pr("alice", 2);
        event.lead_time_ms = Some(100.0 * HOUR);
        let prs = vec![event, pr("bob", 1)];

        let first = seeded(1).aggregate(&prs, &[], &[]);
        let second = seeded(2).aggregate(&prs, &[], &[]);
        // (75 + 40) / 2 is outside both bands
        assert_eq!(first, second);
        assert_eq!(first[0].dora_score, Some(58));
        assert_eq!(first[1].dora_score, None);
    }

    #[test]
    fn test_bots_and_unknown_actors_excluded() {
        let prs = vec![pr("alice", 2), pr("dependabot[bot]", 9)];
        let deployments = vec![
            deployment("alice", DeploymentStatus::Success),
            deployment("mallory", DeploymentStatus::Failure),
        ];
        let incidents = vec![incident("mallory"), incident("alice")];

        let outcome = Aggregator::new().aggregate_batch(&EventBatch::new(prs, deployments, incidents));
        assert_eq!(usernames(&outcome.scorecards), vec!["alice"]);

        let alice = &outcome.scorecards[0];
        assert_eq!(alice.deployment_count, 1);
        assert_eq!(alice.failed_deployments, 0);
        assert_eq!(alice.incident_count, 1);
        assert_eq!(alice.contribution_percentage, 100);

        assert_eq!(outcome.skipped.bots, 1);
        assert_eq!(outcome.skipped.unknown_contributor, 2);
        assert_eq!(outcome.pull_requests_seen, 2);
        assert_eq!(outcome.deployments_seen, 2);
        assert_eq!(outcome.incidents_seen, 2);
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate(&[], &[], &[]).is_empty());

        let outcome = Aggregator::new().aggregate_batch(&EventBatch::default());
        assert!(outcome.scorecards.is_empty());
        assert_eq!(outcome.skipped.total(), 0);
    }

    #[test]
    fn test_identities_resolve_display_names() {
        let mut event = pr("alice", 1);
        event.reviewer_usernames = vec!["bob".to_string()];

        let mut aggregator = Aggregator::new().with_identities(vec![
            Identity {
                username: "alice".to_string(),
                display_name: "Alice Liddell".to_string(),
                avatar_url: Some("https://avatars.example/alice.png".to_string()),
            },
            Identity {
                username: "bob".to_string(),
                display_name: "Bob Builder".to_string(),
                avatar_url: None,
            },
        ]);
        assert_eq!(aggregator.identity_count(), 2);

        let cards = aggregator.aggregate(&[event], &[], &[]);
        assert_eq!(cards[0].display_name, "Alice Liddell");
        assert_eq!(
            cards[0].avatar_url.as_deref(),
            Some("https://avatars.example/alice.png")
        );
        assert_eq!(cards[0].top_reviewers[0].display_name, "Bob Builder");
    }

    #[test]
    fn test_config_is_validated() {
        let config = ScoringConfig {
            window_weeks: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            Aggregator::with_config(config),
            Err(ScorecardError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_top_reviewers_limit_from_config() {
        let mut event = pr("alice", 1);
        event.reviewer_usernames = vec!["r1".into(), "r2".into(), "r3".into()];

        let mut aggregator = Aggregator::with_config(ScoringConfig {
            top_reviewers: 2,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(aggregator.config().top_reviewers, 2);

        let cards = aggregator.aggregate(&[event], &[], &[]);
        assert_eq!(cards[0].top_reviewers.len(), 2);
    }

    #[test]
    fn test_scorecards_from_json() {
        let json = r#"{
            "schema_version": "dora.events.v1",
            "pull_requests": [
                {"author_username": "alice", "commit_count": 3, "lead_time_ms": 7200000},
                {"author_username": "bob", "commit_count": 1}
            ],
            "deployments": [
                {"actor_username": "alice", "status": "success", "timestamp": "2024-03-01T10:00:00Z"}
            ]
        }"#;

        let report = scorecards_from_json(json.to_string()).unwrap();
        let payload: serde_json::Value = serde_json::from_str(&report).unwrap();

        assert_eq!(payload["report_version"], "1.0.0");
        assert_eq!(payload["summary"]["contributor_count"], 2);
        assert_eq!(payload["contributors"][0]["username"], "alice");
        assert_eq!(payload["contributors"][0]["deployment_count"], 1);
        assert_eq!(payload["provenance"]["deployments_seen"], 1);
    }

    #[test]
    fn test_scorecards_from_invalid_json() {
        assert!(scorecards_from_json("not valid json".to_string()).is_err());
    }
}
