//! Execution error types

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// The remote call failed
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("No JSON object could be decoded from the Druid response.")]
    InvalidJson { query: Value, response: String },

    #[error("Druid responded with non-200 status code {status}.")]
    Status {
        status: u16,
        query: Value,
        response: Value,
    },

    /// The broker gave up on the query
    #[error("Druid query timed out after {elapsed:?} ({})", describe_timeout(.timeout_ms))]
    Timeout {
        elapsed: Duration,
        timeout_ms: Option<u64>,
        query: Value,
        response: Value,
    },

    #[error("Request failed: {message}")]
    Transport { message: String },

    #[error("You must configure a data source to fetch the schema.")]
    MissingDataSource,

    #[error(transparent)]
    Context(#[from] crate::context::ContextError),

    #[error(transparent)]
    Schema(#[from] crate::record::SchemaError),

    #[error(transparent)]
    Validation(#[from] crate::query::ValidationError),
}

impl ExecutionError {
    /// True for server-side query timeouts
    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecutionError::Timeout { .. })
    }

    /// The query that was sent, when the failure came back from the server
    pub fn query(&self) -> Option<&Value> {
        match self {
            ExecutionError::InvalidJson { query, .. }
            | ExecutionError::Status { query, .. }
            | ExecutionError::Timeout { query, .. } => Some(query),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ExecutionError {
    fn from(err: reqwest::Error) -> Self {
        ExecutionError::Transport { message: err.to_string() }
    }
}

fn describe_timeout(timeout_ms: &Option<u64>) -> String {
    match timeout_ms {
        Some(ms) => format!("timeout {ms}ms"),
        None => "no timeout configured".to_string(),
    }
}
