//! dora.events.v1 schema definition
//!
//! Input for one aggregation run. Events arrive either as a single batch
//! document holding the three lists, or as newline-delimited records tagged
//! with their `kind`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{DeploymentEvent, IncidentEvent, PullRequestEvent};

/// Current schema version
pub const SCHEMA_VERSION: &str = "dora.events.v1";

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

/// The three event collections for one time window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventBatch {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    #[serde(default, alias = "pullRequests")]
    pub pull_requests: Vec<PullRequestEvent>,
    #[serde(default)]
    pub deployments: Vec<DeploymentEvent>,
    #[serde(default)]
    pub incidents: Vec<IncidentEvent>,
}

impl Default for EventBatch {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new(), Vec::new())
    }
}

impl EventBatch {
    pub fn new(
        pull_requests: Vec<PullRequestEvent>,
        deployments: Vec<DeploymentEvent>,
        incidents: Vec<IncidentEvent>,
    ) -> Self {
        Self {
            schema_version: default_schema_version(),
            pull_requests,
            deployments,
            incidents,
        }
    }

    /// Total number of events across all three lists
    pub fn len(&self) -> usize {
        self.pull_requests.len() + self.deployments.len() + self.incidents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check the batch-level envelope
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(ValidationError::InvalidSchemaVersion {
                expected: SCHEMA_VERSION.to_string(),
                actual: self.schema_version.clone(),
            });
        }
        Ok(())
    }
}

/// Which stream an event came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PullRequest,
    Deployment,
    Incident,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::PullRequest => write!(f, "pull_request"),
            EventKind::Deployment => write!(f, "deployment"),
            EventKind::Incident => write!(f, "incident"),
        }
    }
}

/// A single NDJSON record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawEvent {
    PullRequest(PullRequestEvent),
    Deployment(DeploymentEvent),
    Incident(IncidentEvent),
}

impl RawEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            RawEvent::PullRequest(_) => EventKind::PullRequest,
            RawEvent::Deployment(_) => EventKind::Deployment,
            RawEvent::Incident(_) => EventKind::Incident,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            RawEvent::PullRequest(pr) => pr.validate(),
            RawEvent::Deployment(deployment) => deployment.validate(),
            RawEvent::Incident(incident) => incident.validate(),
        }
    }
}

impl PullRequestEvent {
    /// An event is usable when it names its author and carries sane durations
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_identity(EventKind::PullRequest, "author_username", &self.author_username)?;
        check_duration("lead_time_ms", self.lead_time_ms)?;
        check_duration("merge_time_ms", self.merge_time_ms)?;
        check_duration("rework_time_ms", self.rework_time_ms)?;
        Ok(())
    }
}

impl DeploymentEvent {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_identity(EventKind::Deployment, "actor_username", &self.actor_username)
    }
}

impl IncidentEvent {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_identity(EventKind::Incident, "assignee_username", &self.assignee_username)
    }
}

fn require_identity(
    kind: EventKind,
    field: &'static str,
    value: &str,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingIdentity { kind, field });
    }
    Ok(())
}

fn check_duration(field: &'static str, value: Option<f64>) -> Result<(), ValidationError> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => {
            Err(ValidationError::InvalidDuration { field, value: v })
        }
        _ => Ok(()),
    }
}

/// Validation errors for events
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid schema version: expected {expected}, got {actual}")]
    InvalidSchemaVersion { expected: String, actual: String },

    #[error("{kind} event is missing {field}")]
    MissingIdentity { kind: EventKind, field: &'static str },

    #[error("{field} must be a non-negative number of milliseconds, got {value}")]
    InvalidDuration { field: &'static str, value: f64 },
}
