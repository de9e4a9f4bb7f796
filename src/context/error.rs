//! Context error types

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    /// A processor with this key is already active
    #[error("Duplicate context key: {0}")]
    DuplicateKey(String),
}
