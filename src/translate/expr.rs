//! Generic boolean filter expressions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::TranslateError;

/// One side of a comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ExprOperand {
    Field { field: String },
    Value { value: Value },
}

impl ExprOperand {
    pub fn field(name: impl Into<String>) -> Self {
        ExprOperand::Field { field: name.into() }
    }

    pub fn value(value: impl Into<Value>) -> Self {
        ExprOperand::Value { value: value.into() }
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    NotStartsWith,
    NotEndsWith,
}

impl Operator {
    const ALL: [Operator; 14] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Gt,
        Operator::Gte,
        Operator::Lt,
        Operator::Lte,
        Operator::In,
        Operator::NotIn,
        Operator::Contains,
        Operator::NotContains,
        Operator::StartsWith,
        Operator::EndsWith,
        Operator::NotStartsWith,
        Operator::NotEndsWith,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::In => "in",
            Operator::NotIn => "not in",
            Operator::Contains => "contains",
            Operator::NotContains => "not contains",
            Operator::StartsWith => "startswith",
            Operator::EndsWith => "endswith",
            Operator::NotStartsWith => "not startswith",
            Operator::NotEndsWith => "not endswith",
        }
    }

    /// True for the negated forms (`!=`, `not in`, `not ...`)
    pub fn is_negated(&self) -> bool {
        matches!(
            self,
            Operator::Ne
                | Operator::NotIn
                | Operator::NotContains
                | Operator::NotStartsWith
                | Operator::NotEndsWith
        )
    }
}

impl FromStr for Operator {
    type Err = TranslateError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == text)
            .ok_or_else(|| TranslateError::UnknownOperator(text.to_string()))
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A boolean expression tree over fields and constant values
///
/// Wire form: `{"type": "<op>", "left": .., "right": ..}` for
/// comparisons, `{"type": "and"|"or", "filters": [..]}` and
/// `{"type": "not", "filter": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawExpr", into = "RawExpr")]
pub enum FilterExpr {
    Compare {
        op: Operator,
        left: ExprOperand,
        right: ExprOperand,
    },
    And(Vec<FilterExpr>),
    Or(Vec<FilterExpr>),
    Not(Box<FilterExpr>),
}

impl FilterExpr {
    pub fn compare(op: Operator, left: ExprOperand, right: ExprOperand) -> Self {
        FilterExpr::Compare { op, left, right }
    }

    /// `field <op> value`, the common shape
    pub fn field_op(field: &str, op: Operator, value: impl Into<Value>) -> Self {
        Self::compare(op, ExprOperand::field(field), ExprOperand::value(value))
    }

    pub fn not(expr: FilterExpr) -> Self {
        FilterExpr::Not(Box::new(expr))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawExpr {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    left: Option<ExprOperand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    right: Option<ExprOperand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    filters: Option<Vec<FilterExpr>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    filter: Option<Box<FilterExpr>>,
}

impl TryFrom<RawExpr> for FilterExpr {
    type Error = TranslateError;

    fn try_from(raw: RawExpr) -> Result<Self, Self::Error> {
        let missing = |part: &str| TranslateError::Malformed {
            operator: raw.kind.clone(),
            message: format!("missing {part}"),
        };
        match raw.kind.as_str() {
            "and" => Ok(FilterExpr::And(raw.filters.clone().ok_or_else(|| missing("filters"))?)),
            "or" => Ok(FilterExpr::Or(raw.filters.clone().ok_or_else(|| missing("filters"))?)),
            "not" => Ok(FilterExpr::Not(raw.filter.clone().ok_or_else(|| missing("filter"))?)),
            other => {
                let op = other.parse()?;
                let left = raw.left.clone().ok_or_else(|| missing("left"))?;
                let right = raw.right.clone().ok_or_else(|| missing("right"))?;
                Ok(FilterExpr::Compare { op, left, right })
            }
        }
    }
}

impl From<FilterExpr> for RawExpr {
    fn from(expr: FilterExpr) -> Self {
        let raw = |kind: &str| RawExpr {
            kind: kind.to_string(),
            left: None,
            right: None,
            filters: None,
            filter: None,
        };
        match expr {
            FilterExpr::Compare { op, left, right } => RawExpr {
                left: Some(left),
                right: Some(right),
                ..raw(op.as_str())
            },
            FilterExpr::And(filters) => RawExpr { filters: Some(filters), ..raw("and") },
            FilterExpr::Or(filters) => RawExpr { filters: Some(filters), ..raw("or") },
            FilterExpr::Not(filter) => RawExpr { filter: Some(filter), ..raw("not") },
        }
    }
}
