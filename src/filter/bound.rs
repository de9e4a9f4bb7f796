//! Bound filter builder

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::variants::Filter;
use crate::record::SchemaError;

/// How bound values are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundOrdering {
    Lexicographic,
    #[default]
    Alphanumeric,
    Numeric,
    Strlen,
}

impl BoundOrdering {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoundOrdering::Lexicographic => "lexicographic",
            BoundOrdering::Alphanumeric => "alphanumeric",
            BoundOrdering::Numeric => "numeric",
            BoundOrdering::Strlen => "strlen",
        }
    }

    /// Numeric for JSON numbers, alphanumeric for everything else
    pub fn for_value(value: &Value) -> Self {
        if value.is_number() {
            BoundOrdering::Numeric
        } else {
            BoundOrdering::Alphanumeric
        }
    }
}

impl fmt::Display for BoundOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds a `bound` filter, emitting only the fields that were set
#[derive(Debug, Clone, Default)]
pub struct BoundFilter {
    dimension: String,
    lower: Option<Value>,
    upper: Option<Value>,
    lower_strict: Option<bool>,
    upper_strict: Option<bool>,
    ordering: Option<BoundOrdering>,
    extraction_fn: Option<Value>,
}

impl BoundFilter {
    pub fn new(dimension: impl Into<String>) -> Self {
        Self {
            dimension: dimension.into(),
            ..Default::default()
        }
    }

    pub fn lower(mut self, value: impl Into<Value>) -> Self {
        self.lower = Some(value.into());
        self
    }

    pub fn upper(mut self, value: impl Into<Value>) -> Self {
        self.upper = Some(value.into());
        self
    }

    pub fn lower_strict(mut self, strict: bool) -> Self {
        self.lower_strict = Some(strict);
        self
    }

    pub fn upper_strict(mut self, strict: bool) -> Self {
        self.upper_strict = Some(strict);
        self
    }

    pub fn ordering(mut self, ordering: BoundOrdering) -> Self {
        self.ordering = Some(ordering);
        self
    }

    pub fn extraction_fn(mut self, extraction_fn: Value) -> Self {
        self.extraction_fn = Some(extraction_fn);
        self
    }

    /// Validate and build; bounds must be strings or numbers
    pub fn build(self) -> Result<Filter, SchemaError> {
        let mut fields = Map::new();
        fields.insert("dimension".to_string(), Value::String(self.dimension));
        if let Some(lower) = self.lower {
            fields.insert("lower".to_string(), lower);
        }
        if let Some(strict) = self.lower_strict {
            fields.insert("lowerStrict".to_string(), Value::Bool(strict));
        }
        if let Some(upper) = self.upper {
            fields.insert("upper".to_string(), upper);
        }
        if let Some(strict) = self.upper_strict {
            fields.insert("upperStrict".to_string(), Value::Bool(strict));
        }
        if let Some(ordering) = self.ordering {
            fields.insert("ordering".to_string(), Value::String(ordering.as_str().to_string()));
        }
        if let Some(extraction_fn) = self.extraction_fn {
            fields.insert("extractionFn".to_string(), extraction_fn);
        }
        Filter::from_map("bound", fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_only_set_fields_are_emitted() {
        let filter = BoundFilter::new("age").lower(18).lower_strict(true).build().unwrap();
        assert_eq!(
            filter,
            json!({"type": "bound", "dimension": "age", "lower": 18, "lowerStrict": true})
        );
    }

    #[test]
    fn test_bool_bounds_rejected() {
        assert!(BoundFilter::new("flag").upper(true).build().is_err());
    }

    #[test]
    fn test_ordering_for_value() {
        assert_eq!(BoundOrdering::for_value(&json!(42)), BoundOrdering::Numeric);
        assert_eq!(BoundOrdering::for_value(&json!(4.2)), BoundOrdering::Numeric);
        assert_eq!(BoundOrdering::for_value(&json!("42")), BoundOrdering::Alphanumeric);
    }
}
