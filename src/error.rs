//! Error types for the scorecard engine

use thiserror::Error;

use crate::schema::ValidationError;

/// Errors that can occur at the fallible edges of the engine
/// (parsing, configuration, encoding). Aggregation itself never fails.
#[derive(Debug, Error)]
pub enum ScorecardError {
    #[error("Failed to parse event payload: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid scoring configuration: {0}")]
    InvalidConfig(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Invalid event: {0}")]
    Validation(#[from] ValidationError),
}
