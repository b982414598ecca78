//! Scoring configuration
//!
//! The band thresholds and contribution weights are fixed; only the knobs
//! that depend on how the caller fetched its events are configurable.

use serde::{Deserialize, Serialize};

use crate::error::ScorecardError;

/// Default length of the aggregation window in weeks
pub const DEFAULT_WINDOW_WEEKS: f64 = 4.0;

/// Default number of reviewers kept per scorecard
pub const DEFAULT_TOP_REVIEWERS: usize = 5;

/// Configuration for one aggregation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Window covered by the input events, used to turn deployment counts
    /// into deployments per week
    pub window_weeks: f64,
    /// Maximum number of entries in `top_reviewers`
    pub top_reviewers: usize,
    /// Seed for the score-band draws; `None` draws from OS entropy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            window_weeks: DEFAULT_WINDOW_WEEKS,
            top_reviewers: DEFAULT_TOP_REVIEWERS,
            seed: None,
        }
    }
}

impl ScoringConfig {
    /// Load and validate a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, ScorecardError> {
        let config: ScoringConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, ScorecardError> {
        serde_json::to_string_pretty(self).map_err(ScorecardError::JsonError)
    }

    pub fn validate(&self) -> Result<(), ScorecardError> {
        if !self.window_weeks.is_finite() || self.window_weeks <= 0.0 {
            return Err(ScorecardError::InvalidConfig(format!(
                "window_weeks must be a positive number, got {}",
                self.window_weeks
            )));
        }
        if self.top_reviewers == 0 {
            return Err(ScorecardError::InvalidConfig(
                "top_reviewers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
