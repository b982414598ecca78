//! Adapter for reading dora.events.v1 input
//!
//! Handles both input shapes (batch document and NDJSON records) and reports
//! per-event validation problems without failing the whole batch.

use crate::error::ScorecardError;
use crate::schema::raw_event::*;

/// Adapter for turning raw input text into an [`EventBatch`]
pub struct EventBatchAdapter;

impl EventBatchAdapter {
    /// Parse a JSON batch document
    pub fn parse_batch(json: &str) -> Result<EventBatch, ScorecardError> {
        let batch: EventBatch = serde_json::from_str(json)?;
        batch.validate()?;
        Ok(batch)
    }

    /// Parse NDJSON (newline-delimited JSON) containing tagged records
    pub fn parse_ndjson(ndjson: &str) -> Result<EventBatch, ScorecardError> {
        let mut events = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<RawEvent>(trimmed) {
                Ok(event) => events.push(event),
                Err(e) => {
                    return Err(ScorecardError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(Self::from_raw_events(events))
    }

    /// Split tagged records into the three streams, keeping their order
    pub fn from_raw_events(events: Vec<RawEvent>) -> EventBatch {
        let mut batch = EventBatch::default();

        for event in events {
            match event {
                RawEvent::PullRequest(pr) => batch.pull_requests.push(pr),
                RawEvent::Deployment(deployment) => batch.deployments.push(deployment),
                RawEvent::Incident(incident) => batch.incidents.push(incident),
            }
        }

        batch
    }

    /// Validate every event of a batch, returning only the failures
    pub fn validate_batch(batch: &EventBatch) -> Vec<ValidationResult> {
        let prs = batch
            .pull_requests
            .iter()
            .enumerate()
            .map(|(index, pr)| (EventKind::PullRequest, index, pr.validate()));
        let deployments = batch
            .deployments
            .iter()
            .enumerate()
            .map(|(index, d)| (EventKind::Deployment, index, d.validate()));
        let incidents = batch
            .incidents
            .iter()
            .enumerate()
            .map(|(index, i)| (EventKind::Incident, index, i.validate()));

        prs.chain(deployments)
            .chain(incidents)
            .filter_map(|(kind, index, result)| {
                result.err().map(|error| ValidationResult { kind, index, error })
            })
            .collect()
    }
}

/// A validation failure for one event
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub kind: EventKind,
    /// Position within the event's own stream
    pub index: usize,
    pub error: ValidationError,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_batch_json() -> &'static str {
        r#"{
            "schema_version": "dora.events.v1",
            "pull_requests": [
                {"author_username": "alice", "commit_count": 3, "lead_time_ms": 7200000},
                {"author_username": "", "commit_count": 1}
            ],
            "deployments": [
                {"actor_username": "alice", "status": "success", "timestamp": "2024-03-01T10:00:00Z"}
            ],
            "incidents": [
                {"assignee_username": "alice"},
                {}
            ]
        }"#
    }

    #[test]
    fn test_parse_batch() {
        let batch = EventBatchAdapter::parse_batch(sample_batch_json()).unwrap();
        assert_eq!(batch.pull_requests.len(), 2);
        assert_eq!(batch.deployments.len(), 1);
        assert_eq!(batch.incidents.len(), 2);
        assert_eq!(batch.len(), 5);
    }

    #[test]
    fn test_parse_batch_rejects_other_versions() {
        let result = EventBatchAdapter::parse_batch(r#"{"schema_version": "v9"}"#);
        assert!(matches!(result, Err(ScorecardError::Validation(_))));
    }

    #[test]
    fn test_parse_batch_invalid_json() {
        let result = EventBatchAdapter::parse_batch("not json");
        assert!(matches!(result, Err(ScorecardError::JsonError(_))));
    }

    #[test]
    fn test_parse_ndjson() {
        let ndjson = r#"
{"kind": "pull_request", "author_username": "alice", "commit_count": 2}

{"kind": "deployment", "actor_username": "alice", "status": "failure", "timestamp": "2024-03-01T10:00:00Z"}
{"kind": "pull_request", "author_username": "bob", "commit_count": 1}
{"kind": "incident", "assignee_username": "bob"}
"#;
        let batch = EventBatchAdapter::parse_ndjson(ndjson).unwrap();
        assert_eq!(batch.pull_requests.len(), 2);
        assert_eq!(batch.pull_requests[1].author_username, "bob");
        assert_eq!(batch.deployments.len(), 1);
        assert_eq!(batch.incidents.len(), 1);
    }

    #[test]
    fn test_parse_ndjson_reports_line() {
        let ndjson = "{\"kind\": \"incident\", \"assignee_username\": \"bob\"}\n{broken";
        let err = EventBatchAdapter::parse_ndjson(ndjson).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_validate_batch_lists_failures() {
        let batch = EventBatchAdapter::parse_batch(sample_batch_json()).unwrap();
        let failures = EventBatchAdapter::validate_batch(&batch);

        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].kind, EventKind::PullRequest);
        assert_eq!(failures[0].index, 1);
        assert_eq!(failures[1].kind, EventKind::Incident);
        assert_eq!(failures[1].index, 1);
    }
}
