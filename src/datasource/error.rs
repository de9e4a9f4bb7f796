//! Data-source view error types

use thiserror::Error;

use crate::client::ExecutionError;
use crate::record::SchemaError;
use crate::result::ResultError;
use crate::translate::TranslateError;

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error("Unknown dimension: {0}")]
    UnknownDimension(String),

    /// No intervals, and no start or duration to derive them from
    #[error("A start or a duration is required when no intervals are given")]
    MissingTimeRange,

    #[error(transparent)]
    Translate(#[from] TranslateError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Result(#[from] ResultError),
}
