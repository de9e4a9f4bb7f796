//! Query validation error types

use serde_json::Value;
use thiserror::Error;

/// A constructed query failed document-level validation
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Invalid query:\n  {}", .failures.join("\n  "))]
pub struct ValidationError {
    /// The offending query
    pub query: Value,
    /// Every failed check, in check order
    pub failures: Vec<String>,
}
