//! Result decoding error types

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResultError {
    #[error("{0} is not supported for query results")]
    UnsupportedQueryType(String),

    #[error("Query results must be a list, found {0}")]
    NotAList(&'static str),

    #[error("Malformed result row {row}: {message}")]
    MalformedRow { row: usize, message: String },

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
