//! Team contribution percentages
//!
//! Each contributor's share of team activity, as integers that always sum
//! to exactly 100 across one result set.

use tracing::debug;

use crate::types::ContributorScorecard;

const W_PULL_REQUESTS: f64 = 0.35;
const W_COMMITS: f64 = 0.20;
const W_CHURN: f64 = 0.15;
const W_DEPLOY_SUCCESS: f64 = 0.20;
const W_SPEED: f64 = 0.10;

/// Churn above this many lines adds nothing more
const CHURN_CAP_LINES: u64 = 5000;

/// Lead times longer than a week score like a week
const SPEED_CAP_HOURS: f64 = 168.0;

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Computes contribution percentages across all contributors
pub struct ContributionWeigher;

impl ContributionWeigher {
    /// Blend of PR count, commits, churn, deployment success and speed
    pub fn weighted_score(card: &ContributorScorecard) -> f64 {
        let churn = card.churn().min(CHURN_CAP_LINES) as f64 / 100.0;
        let success_rate =
            f64::from(card.successful_deployments) / f64::from(card.deployment_count.max(1));
        let speed = card
            .avg_lead_time_ms
            .map(|ms| (10.0 - (ms / MS_PER_HOUR).min(SPEED_CAP_HOURS) / 24.0).max(0.0))
            .unwrap_or(0.0);

        W_PULL_REQUESTS * f64::from(card.pr_count)
            + W_COMMITS * f64::from(card.commit_count)
            + W_CHURN * churn
            + W_DEPLOY_SUCCESS * success_rate * 100.0
            + W_SPEED * speed
    }

    /// Percentages in input order
    pub fn percentages(cards: &[ContributorScorecard]) -> Vec<u32> {
        if cards.is_empty() {
            return Vec::new();
        }

        let weights: Vec<f64> = cards.iter().map(Self::weighted_score).collect();
        let mut shares = rounded_shares(&weights);

        // Weighted shares that fail to tell anyone apart fall back to PR share
        if cards.len() >= 2 && shares.iter().all(|&s| s == shares[0]) {
            debug!(
                contributors = cards.len(),
                "weighted shares tied, falling back to pull request share"
            );
            let pr_counts: Vec<f64> = cards.iter().map(|c| f64::from(c.pr_count)).collect();
            shares = rounded_shares(&pr_counts);
        }

        rebalance(&mut shares);
        shares.into_iter().map(|s| s.clamp(0, 100) as u32).collect()
    }

    /// Write `contribution_percentage` on every card
    pub fn apply(cards: &mut [ContributorScorecard]) {
        let percentages = Self::percentages(cards);
        for (card, percentage) in cards.iter_mut().zip(percentages) {
            card.contribution_percentage = percentage;
        }
    }
}

/// `round(100 * value / total)` per entry, all zero when the total is zero
fn rounded_shares(values: &[f64]) -> Vec<i64> {
    let total: f64 = values.iter().sum();
    if total <= 0.0 {
        return vec![0; values.len()];
    }
    values
        .iter()
        .map(|v| (100.0 * v / total).round() as i64)
        .collect()
}

/// Push rounding drift onto the first contributor holding the highest share.
///
/// A negative drift larger than that share floors it at zero and carries the
/// remainder down the ranking (highest share first, list order on ties).
fn rebalance(shares: &mut [i64]) {
    let mut drift = 100 - shares.iter().sum::<i64>();
    if drift == 0 || shares.is_empty() {
        return;
    }

    let mut ranked: Vec<usize> = (0..shares.len()).collect();
    // Stable: equal shares keep list order
    ranked.sort_by(|&a, &b| shares[b].cmp(&shares[a]));

    if drift > 0 {
        shares[ranked[0]] += drift;
        return;
    }

    for idx in ranked {
        let taken = (-drift).min(shares[idx].max(0));
        shares[idx] -= taken;
        drift += taken;
        if drift == 0 {
            break;
        }
    }
}
