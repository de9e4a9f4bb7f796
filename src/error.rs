//! Error types for druidkit

use thiserror::Error;

use crate::client::ExecutionError;
use crate::context::ContextError;
use crate::datasource::ViewError;
use crate::query::ValidationError;
use crate::record::SchemaError;
use crate::result::ResultError;
use crate::time::DurationParseError;
use crate::translate::TranslateError;

/// Errors that can occur during parsing
#[derive(Debug, Error)]
pub enum ParseError {
    /// IO error reading file
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    /// YAML deserialization error
    #[error("Invalid YAML: {source}")]
    Yaml {
        #[from]
        source: serde_yaml::Error,
    },
}

/// Any error the crate can return
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Translate(#[from] TranslateError),

    #[error(transparent)]
    Duration(#[from] DurationParseError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    View(#[from] ViewError),

    #[error(transparent)]
    Result(#[from] ResultError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
