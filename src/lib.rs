//! DORA scorecard - contributor-level delivery metrics for engineering teams
//!
//! Turns one window of pull request, deployment and incident events into a
//! scorecard per human contributor through a deterministic pipeline:
//! event joining → DORA scoring → contribution weighting → ordering.
//!
//! ## Modules
//!
//! - **Pipeline**: `aggregate`, `Aggregator` and the JSON one-shot entry point
//! - **Schema**: the `dora.events.v1` input format
//! - **Roster**: merge per-repository contributor listings into a team roster

pub mod bots;
pub mod config;
pub mod contribution;
pub mod encoder;
pub mod error;
pub mod joiner;
pub mod pipeline;
pub mod roster;
pub mod running_average;
pub mod schema;
pub mod score;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::ScoringConfig;
pub use encoder::{ReportEncoder, REPORT_VERSION};
pub use error::ScorecardError;
pub use pipeline::{aggregate, scorecards_from_json, AggregateOutcome, Aggregator};
pub use roster::{merge_repo_contributors, merge_roster_json, TeamContributor, TeamRoster};
pub use types::{
    ContributorScorecard, DeploymentEvent, DeploymentStatus, Identity, IncidentEvent,
    PullRequestEvent, ScorecardReport, SkipCounts,
};

// Schema exports
pub use schema::{EventBatch, EventBatchAdapter, RawEvent, ValidationError, SCHEMA_VERSION};

/// Engine version embedded in every report
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "dora-scorecard";
