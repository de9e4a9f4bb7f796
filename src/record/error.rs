//! Schema error types

use thiserror::Error;

/// A single problem found while validating a record against its schema
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Violation {
    /// The discriminant is not one of the family's known variants
    #[error("Invalid {family} type: {variant} (known types: {})", .known.join(", "))]
    UnknownVariant {
        family: &'static str,
        variant: String,
        known: Vec<&'static str>,
    },
    /// A required field is absent
    #[error("Missing field: {field} required for type: {variant}")]
    MissingField {
        field: &'static str,
        variant: String,
    },
    /// A field is present but holds the wrong kind of value
    #[error("Field {field} has mismatched type (expecting {expected}, found {found})")]
    MismatchedType {
        field: String,
        expected: String,
        found: &'static str,
    },
    /// A field holds a value of the right kind that is still not acceptable
    #[error("Invalid {field}: {message}")]
    InvalidValue { field: String, message: String },
    /// The fields were not given as an object
    #[error("Expected an object of fields, found {found}")]
    NotAnObject { found: &'static str },
}

/// Construction of a typed record failed
///
/// Carries every violation found in one pass, not just the first.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Invalid {family}:\n  {}", render(.violations))]
pub struct SchemaError {
    pub family: &'static str,
    pub variant: String,
    pub violations: Vec<Violation>,
}

fn render(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n  ")
}

impl SchemaError {
    pub fn new(family: &'static str, variant: impl Into<String>, violations: Vec<Violation>) -> Self {
        Self {
            family,
            variant: variant.into(),
            violations,
        }
    }

    /// Shorthand for an error with a single `InvalidValue` violation
    pub fn invalid_value(
        family: &'static str,
        variant: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(
            family,
            variant,
            vec![Violation::InvalidValue {
                field: field.into(),
                message: message.into(),
            }],
        )
    }

    /// True if a `MissingField` violation names `field`
    pub fn is_missing(&self, field: &str) -> bool {
        self.violations
            .iter()
            .any(|v| matches!(v, Violation::MissingField { field: f, .. } if *f == field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_lists_every_violation() {
        let err = SchemaError::new(
            "aggregation",
            "javascript",
            vec![
                Violation::MissingField { field: "fnAggregate", variant: "javascript".into() },
                Violation::MissingField { field: "fnCombine", variant: "javascript".into() },
            ],
        );
        let message = err.to_string();
        assert!(message.starts_with("Invalid aggregation:"));
        assert!(message.contains("fnAggregate"));
        assert!(message.contains("fnCombine"));
        assert!(err.is_missing("fnCombine"));
        assert!(!err.is_missing("name"));
    }
}
