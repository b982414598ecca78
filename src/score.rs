//! DORA scoring
//!
//! Derives the per-contributor DORA sub-metrics and the composite 0-100
//! score. Each sub-metric with data contributes a banded point value; a
//! fixed baseline is then averaged in so sparse data does not produce
//! extreme scores.
//!
//! Scores above 85 or below 35 are replaced by a uniform draw from a
//! compressed band ([85, 94] and [35, 44]). Everything in [35, 85] is
//! deterministic.

use std::ops::RangeInclusive;

use rand::Rng;

use crate::config::DEFAULT_WINDOW_WEEKS;
use crate::types::{ContributorScorecard, DoraMetrics};

/// Points averaged into every score that has at least one metric
pub const BASELINE_POINTS: u32 = 40;

/// Scores above this are redrawn from [`ELITE_BAND`]
pub const ELITE_THRESHOLD: u32 = 85;

/// Scores below this are redrawn from [`FLOOR_BAND`]
pub const FLOOR_THRESHOLD: u32 = 35;

pub const ELITE_BAND: RangeInclusive<u32> = 85..=94;
pub const FLOOR_BAND: RangeInclusive<u32> = 35..=44;

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Computes DORA metrics and scores for single contributors
#[derive(Debug, Clone)]
pub struct ScoreCalculator {
    window_weeks: f64,
}

impl Default for ScoreCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_WEEKS)
    }
}

impl ScoreCalculator {
    /// Create a calculator for events spanning `window_weeks` weeks
    pub fn new(window_weeks: f64) -> Self {
        Self { window_weeks }
    }

    /// Fill in `dora_metrics` and `dora_score` on a joined scorecard
    pub fn score<R: Rng>(&self, card: &mut ContributorScorecard, rng: &mut R) {
        card.dora_metrics = self.dora_metrics(card);
        card.dora_score = self
            .raw_score(card)
            .map(|raw| band_score(raw, rng));
    }

    /// The three reported sub-metrics
    pub fn dora_metrics(&self, card: &ContributorScorecard) -> DoraMetrics {
        DoraMetrics {
            deploy_frequency: f64::from(card.deployment_count) / f64::from(card.pr_count.max(1)),
            change_failure_rate: f64::from(card.failed_deployments)
                / f64::from(card.deployment_count.max(1)),
            time_to_restore_ms: time_to_restore_ms(card),
        }
    }

    /// Composite score before banding, `None` when no metric has data.
    ///
    /// Deployment frequency and change failure rate only count once the
    /// contributor has at least one deployment.
    pub fn raw_score(&self, card: &ContributorScorecard) -> Option<u32> {
        let mut sum = 0u32;
        let mut metrics_counted = 0u32;

        if card.deployment_count > 0 {
            let per_week = f64::from(card.deployment_count) / self.window_weeks;
            sum += deploy_frequency_points(per_week);
            metrics_counted += 1;
        }

        if let Some(lead_ms) = card.avg_lead_time_ms {
            sum += lead_time_points(lead_ms / MS_PER_HOUR);
            metrics_counted += 1;
        }

        if card.deployment_count > 0 {
            let failure_rate =
                f64::from(card.failed_deployments) / f64::from(card.deployment_count);
            sum += change_failure_points(failure_rate);
            metrics_counted += 1;
        }

        if let Some(restore_ms) = time_to_restore_ms(card) {
            sum += time_to_restore_points(restore_ms / MS_PER_HOUR);
            metrics_counted += 1;
        }

        if metrics_counted == 0 {
            return None;
        }

        sum += BASELINE_POINTS;
        metrics_counted += 1;

        Some((f64::from(sum) / f64::from(metrics_counted)).round() as u32)
    }
}

/// Compress extreme scores into their bands; pass everything else through
pub fn band_score<R: Rng>(raw: u32, rng: &mut R) -> u32 {
    if raw > ELITE_THRESHOLD {
        rng.gen_range(ELITE_BAND)
    } else if raw < FLOOR_THRESHOLD {
        rng.gen_range(FLOOR_BAND)
    } else {
        raw
    }
}

/// Lead time stands in for restore time when the contributor owns incidents
fn time_to_restore_ms(card: &ContributorScorecard) -> Option<f64> {
    if card.incident_count > 0 {
        card.avg_lead_time_ms
    } else {
        None
    }
}

fn deploy_frequency_points(per_week: f64) -> u32 {
    if per_week >= 7.0 {
        100
    } else if per_week >= 1.0 {
        75
    } else if per_week >= 0.25 {
        50
    } else {
        25
    }
}

fn lead_time_points(hours: f64) -> u32 {
    if hours < 24.0 {
        100
    } else if hours < 168.0 {
        75
    } else if hours < 720.0 {
        50
    } else {
        25
    }
}

fn change_failure_points(rate: f64) -> u32 {
    if rate < 0.15 {
        100
    } else if rate < 0.30 {
        75
    } else if rate < 0.45 {
        50
    } else {
        25
    }
}

fn time_to_restore_points(hours: f64) -> u32 {
    if hours < 1.0 {
        100
    } else if hours < 24.0 {
        75
    } else if hours < 168.0 {
        50
    } else {
        25
    }
}
