//! Event joining
//!
//! Folds the pull request, deployment and incident streams into one
//! scorecard per human contributor. Scores and contribution shares are
//! filled in by later stages.
//!
//! Deployments and incidents only attach to contributors that authored at
//! least one pull request in the same input; the joiner folds every pull
//! request before looking at the other two streams, so the relative order
//! of the lists does not matter.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::bots::is_bot;
use crate::running_average::RunningAverage;
use crate::schema::ValidationError;
use crate::types::{
    ContributorScorecard, DeploymentEvent, DeploymentStatus, Identity, IncidentEvent,
    PullRequestEvent, ReviewerCount, SkipCounts,
};

/// Known identities keyed by username, used to resolve display names and
/// avatars the event streams do not carry
pub type IdentityDirectory = HashMap<String, Identity>;

/// Output of the join stage
#[derive(Debug, Clone)]
pub struct JoinedContributors {
    /// Unscored scorecards in first-seen order
    pub scorecards: Vec<ContributorScorecard>,
    pub skipped: SkipCounts,
}

/// Groups events by contributor
pub struct EventJoiner<'a> {
    top_reviewers: usize,
    directory: Option<&'a IdentityDirectory>,
}

impl<'a> EventJoiner<'a> {
    /// Create a joiner keeping at most `top_reviewers` reviewers per card
    pub fn new(top_reviewers: usize) -> Self {
        Self {
            top_reviewers,
            directory: None,
        }
    }

    /// Resolve names and avatars from a directory of known identities
    pub fn with_directory(mut self, directory: &'a IdentityDirectory) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Fold all three streams into per-contributor scorecards
    pub fn join(
        &self,
        pull_requests: &[PullRequestEvent],
        deployments: &[DeploymentEvent],
        incidents: &[IncidentEvent],
    ) -> JoinedContributors {
        let mut book = ContributorBook::default();

        for pr in pull_requests {
            book.fold_pull_request(pr, self.directory);
        }
        for deployment in deployments {
            book.fold_deployment(deployment);
        }
        for incident in incidents {
            book.fold_incident(incident);
        }

        let joined = book.finish(self.top_reviewers, self.directory);
        debug!(
            contributors = joined.scorecards.len(),
            skipped_malformed = joined.skipped.malformed,
            skipped_bots = joined.skipped.bots,
            skipped_unknown = joined.skipped.unknown_contributor,
            "joined contributor events"
        );
        joined
    }
}

struct ReviewerTally {
    username: String,
    count: u32,
}

struct Entry {
    card: ContributorScorecard,
    /// Reviewers of this contributor's PRs in first-seen order
    reviewers: Vec<ReviewerTally>,
}

#[derive(Default)]
struct ContributorBook {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
    skipped: SkipCounts,
}

impl ContributorBook {
    fn fold_pull_request(&mut self, pr: &PullRequestEvent, directory: Option<&IdentityDirectory>) {
        if let Err(e) = pr.validate() {
            warn!(
                repository = pr.repository.as_deref().unwrap_or("unknown"),
                number = pr.number,
                error = %e,
                "skipping malformed pull request"
            );
            self.skipped.malformed = self.skipped.malformed.saturating_add(1);
            return;
        }

        let author = pr.author_username.trim();
        if is_bot(author) {
            debug!(author, "skipping bot pull request");
            self.skipped.bots = self.skipped.bots.saturating_add(1);
            return;
        }

        let entry = self.entry_for_author(author, pr, directory);
        let card = &mut entry.card;

        let previous_count = card.pr_count;
        // Counters saturate on oversized input
        card.pr_count = card.pr_count.saturating_add(1);
        card.commit_count = card.commit_count.saturating_add(pr.commit_count);
        card.additions = card.additions.saturating_add(pr.additions);
        card.deletions = card.deletions.saturating_add(pr.deletions);
        card.comment_count = card.comment_count.saturating_add(pr.comment_count);
        card.rework_cycle_count = card.rework_cycle_count.saturating_add(pr.rework_cycles);

        card.avg_lead_time_ms = fold_mean(card.avg_lead_time_ms, previous_count, pr.lead_time_ms);
        card.avg_merge_time_ms =
            fold_mean(card.avg_merge_time_ms, previous_count, pr.merge_time_ms);
        card.avg_rework_time_ms =
            fold_mean(card.avg_rework_time_ms, previous_count, pr.rework_time_ms);

        for reviewer in &pr.reviewer_usernames {
            let reviewer = reviewer.trim();
            if reviewer.is_empty() || reviewer == author {
                continue;
            }
            if is_bot(reviewer) {
                debug!(reviewer, author, "ignoring bot reviewer");
                continue;
            }
            match entry.reviewers.iter_mut().find(|t| t.username == reviewer) {
                Some(tally) => tally.count = tally.count.saturating_add(1),
                None => entry.reviewers.push(ReviewerTally {
                    username: reviewer.to_string(),
                    count: 1,
                }),
            }
        }
    }

    fn fold_deployment(&mut self, deployment: &DeploymentEvent) {
        let invalid = deployment.validate().err();
        let Some(card) = self.gated_card(invalid, &deployment.actor_username, "deployment") else {
            return;
        };

        card.deployment_count = card.deployment_count.saturating_add(1);
        match deployment.status {
            DeploymentStatus::Success => {
                card.successful_deployments = card.successful_deployments.saturating_add(1)
            }
            DeploymentStatus::Failure => {
                card.failed_deployments = card.failed_deployments.saturating_add(1)
            }
        }
    }

    fn fold_incident(&mut self, incident: &IncidentEvent) {
        let invalid = incident.validate().err();
        let Some(card) = self.gated_card(invalid, &incident.assignee_username, "incident") else {
            return;
        };

        card.incident_count = card.incident_count.saturating_add(1);
    }

    /// Card for a deployment actor or incident assignee, if the event may
    /// attach to one
    fn gated_card(
        &mut self,
        invalid: Option<ValidationError>,
        username: &str,
        kind: &'static str,
    ) -> Option<&mut ContributorScorecard> {
        if let Some(e) = invalid {
            warn!(kind, error = %e, "skipping malformed event");
            self.skipped.malformed = self.skipped.malformed.saturating_add(1);
            return None;
        }

        let username = username.trim();
        if is_bot(username) {
            debug!(kind, username, "skipping bot event");
            self.skipped.bots = self.skipped.bots.saturating_add(1);
            return None;
        }

        match self.index.get(username) {
            Some(&idx) => Some(&mut self.entries[idx].card),
            None => {
                debug!(kind, username, "skipping event for unknown contributor");
                self.skipped.unknown_contributor = self.skipped.unknown_contributor.saturating_add(1);
                None
            }
        }
    }

    fn entry_for_author(
        &mut self,
        author: &str,
        pr: &PullRequestEvent,
        directory: Option<&IdentityDirectory>,
    ) -> &mut Entry {
        let idx = match self.index.get(author) {
            Some(&idx) => idx,
            None => {
                let identity = resolve_identity(author, pr, directory);
                self.entries.push(Entry {
                    card: ContributorScorecard::new(identity),
                    reviewers: Vec::new(),
                });
                self.index.insert(author.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };

        let entry = &mut self.entries[idx];

        // Later PRs may carry identity details the first one lacked
        if entry.card.display_name == entry.card.username {
            if let Some(name) = non_blank(pr.author_display_name.as_deref()) {
                entry.card.display_name = name.to_string();
            }
        }
        if entry.card.avatar_url.is_none() {
            entry.card.avatar_url = non_blank(pr.author_avatar_url.as_deref()).map(str::to_string);
        }

        entry
    }

    fn display_name_of(&self, username: &str, directory: Option<&IdentityDirectory>) -> String {
        if let Some(&idx) = self.index.get(username) {
            return self.entries[idx].card.display_name.clone();
        }
        directory
            .and_then(|d| d.get(username))
            .map(|identity| identity.display_name.clone())
            .unwrap_or_else(|| username.to_string())
    }

    fn top_reviewers(
        &self,
        entry: &Entry,
        limit: usize,
        directory: Option<&IdentityDirectory>,
    ) -> Vec<ReviewerCount> {
        let mut tallies: Vec<&ReviewerTally> = entry.reviewers.iter().collect();
        // Stable: equal counts keep first-seen order
        tallies.sort_by(|a, b| b.count.cmp(&a.count));

        tallies
            .into_iter()
            .take(limit)
            .map(|tally| ReviewerCount {
                username: tally.username.clone(),
                display_name: self.display_name_of(&tally.username, directory),
                count: tally.count,
            })
            .collect()
    }

    fn finish(self, limit: usize, directory: Option<&IdentityDirectory>) -> JoinedContributors {
        let reviewers: Vec<Vec<ReviewerCount>> = self
            .entries
            .iter()
            .map(|entry| self.top_reviewers(entry, limit, directory))
            .collect();

        let scorecards = self
            .entries
            .into_iter()
            .zip(reviewers)
            .map(|(entry, top_reviewers)| ContributorScorecard {
                top_reviewers,
                ..entry.card
            })
            .collect();

        JoinedContributors {
            scorecards,
            skipped: self.skipped,
        }
    }
}

fn fold_mean(mean: Option<f64>, previous_count: u32, value: Option<f64>) -> Option<f64> {
    match value {
        Some(v) => Some(RunningAverage::update(mean, previous_count, v)),
        None => mean,
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn resolve_identity(
    author: &str,
    pr: &PullRequestEvent,
    directory: Option<&IdentityDirectory>,
) -> Identity {
    let known = directory.and_then(|d| d.get(author));

    let display_name = non_blank(pr.author_display_name.as_deref())
        .map(str::to_string)
        .or_else(|| known.map(|identity| identity.display_name.clone()))
        .unwrap_or_else(|| author.to_string());
    let avatar_url = non_blank(pr.author_avatar_url.as_deref())
        .map(str::to_string)
        .or_else(|| known.and_then(|identity| identity.avatar_url.clone()));

    Identity {
        username: author.to_string(),
        display_name,
        avatar_url,
    }
}
