//! Team roster merge
//!
//! A Git host lists contributors per repository. A team spans several
//! repositories, so the per-repository listings are folded into one roster
//! keyed by login, with contributions summed and the repositories recorded.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ScorecardError;
use crate::types::Identity;

/// The only host whose listings are merged
pub const GITHUB_PROVIDER: &str = "github";

fn default_provider() -> String {
    GITHUB_PROVIDER.to_string()
}

/// One contributor as listed for a single repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoContributor {
    pub login: String,
    #[serde(default)]
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    /// Account type as reported by the host (`User`, `Bot`, ...)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub account_type: Option<String>,
    #[serde(default)]
    pub contributions: u64,
}

/// Contributor listing for one repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoContributors {
    pub repository: String,
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub contributors: Vec<RepoContributor>,
}

/// Contributions to one repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryContribution {
    pub name: String,
    pub contributions: u64,
}

/// A contributor merged across all team repositories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamContributor {
    pub login: String,
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub account_type: Option<String>,
    /// Sum over `repositories`
    pub contributions: u64,
    pub repositories: Vec<RepositoryContribution>,
}

impl TeamContributor {
    /// Identity for the aggregator's directory; the login doubles as
    /// display name since hosts do not list names here
    pub fn identity(&self) -> Identity {
        Identity {
            username: self.login.clone(),
            display_name: self.login.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

/// Merged roster document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRoster {
    pub contributors: Vec<TeamContributor>,
}

/// Merge per-repository listings into one roster sorted by total
/// contributions, highest first. Equal totals keep first-seen order.
pub fn merge_repo_contributors(listings: &[RepoContributors]) -> Vec<TeamContributor> {
    let mut merged: Vec<TeamContributor> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for listing in listings {
        if !listing.provider.eq_ignore_ascii_case(GITHUB_PROVIDER) {
            info!(
                repository = %listing.repository,
                provider = %listing.provider,
                "skipping repository from unsupported provider"
            );
            continue;
        }

        for contributor in &listing.contributors {
            let share = RepositoryContribution {
                name: listing.repository.clone(),
                contributions: contributor.contributions,
            };

            match index.get(&contributor.login) {
                Some(&idx) => {
                    let entry = &mut merged[idx];
                    entry.contributions =
                        entry.contributions.saturating_add(contributor.contributions);
                    entry.repositories.push(share);
                }
                None => {
                    index.insert(contributor.login.clone(), merged.len());
                    merged.push(TeamContributor {
                        login: contributor.login.clone(),
                        id: contributor.id,
                        avatar_url: contributor.avatar_url.clone(),
                        html_url: contributor.html_url.clone(),
                        account_type: contributor.account_type.clone(),
                        contributions: contributor.contributions,
                        repositories: vec![share],
                    });
                }
            }
        }
    }

    merged.sort_by(|a, b| b.contributions.cmp(&a.contributions));
    debug!(
        repositories = listings.len(),
        contributors = merged.len(),
        "merged team roster"
    );
    merged
}

/// Parse a JSON array of listings and return the merged roster as JSON
pub fn merge_roster_json(listings_json: &str) -> Result<String, ScorecardError> {
    let listings: Vec<RepoContributors> = serde_json::from_str(listings_json)?;
    let roster = TeamRoster {
        contributors: merge_repo_contributors(&listings),
    };
    serde_json::to_string_pretty(&roster).map_err(|e| ScorecardError::EncodingError(e.to_string()))
}

/// Parse a roster document produced by [`merge_roster_json`]
pub fn parse_roster(json: &str) -> Result<TeamRoster, ScorecardError> {
    Ok(serde_json::from_str(json)?)
}
