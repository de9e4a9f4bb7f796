//! Translator error types

use thiserror::Error;

use crate::record::SchemaError;

/// An expression has no equivalent filter
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TranslateError {
    #[error("Druid does not support constant comparisons")]
    ConstantComparison,

    #[error("Druid does not support column-comparison inequalities")]
    ColumnInequality,

    /// Membership and pattern checks need the field on the left and
    /// the value on the right
    #[error("Druid does not support dynamic {operator} checks")]
    DynamicOperand { operator: String },

    #[error("Pattern values for {operator} must be strings, found {found}")]
    InvalidPattern { operator: String, found: String },

    #[error("Unknown filter operator: {0}")]
    UnknownOperator(String),

    #[error("Malformed {operator} expression: {message}")]
    Malformed { operator: String, message: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}
