//! Expression tree to filter translation

use serde_json::Value;
use tracing::debug;

use super::error::TranslateError;
use super::expr::{ExprOperand, FilterExpr, Operator};
use crate::filter::{BoundFilter, BoundOrdering, Filter};
use crate::record::kind_name;

/// Translate an optional expression; `None` stays `None`
pub fn translate_filter(expr: Option<&FilterExpr>) -> Result<Option<Filter>, TranslateError> {
    expr.map(translate).transpose().map(Option::flatten)
}

/// Translate an expression into a filter
///
/// Returns `Ok(None)` when the expression restricts nothing, such as
/// membership in an empty list or a conjunction of such.
pub fn translate(expr: &FilterExpr) -> Result<Option<Filter>, TranslateError> {
    match expr {
        FilterExpr::Compare { op, left, right } => compare(*op, left, right),
        FilterExpr::And(children) => Ok(Filter::join(translate_all(children)?)),
        FilterExpr::Or(children) => Ok(Filter::disjoin(translate_all(children)?)),
        FilterExpr::Not(child) => Ok(translate(child)?.map(|filter| filter.negate())),
    }
}

fn translate_all(children: &[FilterExpr]) -> Result<Vec<Option<Filter>>, TranslateError> {
    children.iter().map(translate).collect()
}

fn compare(
    op: Operator,
    left: &ExprOperand,
    right: &ExprOperand,
) -> Result<Option<Filter>, TranslateError> {
    match op {
        Operator::Eq | Operator::Ne => equality(op, left, right).map(Some),
        Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => {
            inequality(op, left, right).map(Some)
        }
        Operator::In | Operator::NotIn => membership(op, left, right),
        Operator::Contains
        | Operator::NotContains
        | Operator::StartsWith
        | Operator::EndsWith
        | Operator::NotStartsWith
        | Operator::NotEndsWith => pattern(op, left, right),
    }
}

fn equality(op: Operator, left: &ExprOperand, right: &ExprOperand) -> Result<Filter, TranslateError> {
    let filter = match (left, right) {
        (ExprOperand::Value { .. }, ExprOperand::Value { .. }) => {
            return Err(TranslateError::ConstantComparison)
        }
        (ExprOperand::Field { field: a }, ExprOperand::Field { field: b }) => {
            Filter::column_comparison(a.as_str(), b.as_str())
        }
        (ExprOperand::Field { field }, ExprOperand::Value { value })
        | (ExprOperand::Value { value }, ExprOperand::Field { field }) => {
            Filter::selector(field.as_str(), value.clone())
        }
    };
    Ok(if op.is_negated() { filter.negate() } else { filter })
}

fn inequality(op: Operator, left: &ExprOperand, right: &ExprOperand) -> Result<Filter, TranslateError> {
    let (field, value, field_on_left) = match (left, right) {
        (ExprOperand::Field { .. }, ExprOperand::Field { .. }) => {
            return Err(TranslateError::ColumnInequality)
        }
        (ExprOperand::Value { .. }, ExprOperand::Value { .. }) => {
            return Err(TranslateError::ConstantComparison)
        }
        (ExprOperand::Field { field }, ExprOperand::Value { value }) => (field, value, true),
        (ExprOperand::Value { value }, ExprOperand::Field { field }) => (field, value, false),
    };

    let strict = matches!(op, Operator::Gt | Operator::Lt);
    let less_than = matches!(op, Operator::Lt | Operator::Lte);
    let bound = BoundFilter::new(field.as_str()).ordering(BoundOrdering::for_value(value));

    // `field < v` and `v > field` cap the field from above
    let bound = if less_than == field_on_left {
        bound.upper(value.clone()).upper_strict(strict)
    } else {
        bound.lower(value.clone()).lower_strict(strict)
    };
    Ok(bound.build()?)
}

/// Field on the left, constant on the right
fn field_and_value<'e>(
    op: Operator,
    left: &'e ExprOperand,
    right: &'e ExprOperand,
) -> Result<(&'e str, &'e Value), TranslateError> {
    match (left, right) {
        (ExprOperand::Field { field }, ExprOperand::Value { value }) => Ok((field.as_str(), value)),
        _ => Err(TranslateError::DynamicOperand { operator: op.to_string() }),
    }
}

fn membership(
    op: Operator,
    left: &ExprOperand,
    right: &ExprOperand,
) -> Result<Option<Filter>, TranslateError> {
    let (field, value) = field_and_value(op, left, right)?;
    let values = match value {
        Value::Array(values) => values.clone(),
        scalar => vec![scalar.clone()],
    };
    let selectors = values.into_iter().map(|v| Filter::selector(field, v));
    let filter = Filter::disjoin(selectors);
    Ok(filter.map(|f| if op.is_negated() { f.negate() } else { f }))
}

#[derive(Clone, Copy)]
enum Anchor {
    Start,
    End,
    Anywhere,
}

impl Anchor {
    fn of(op: Operator) -> Self {
        match op {
            Operator::StartsWith | Operator::NotStartsWith => Anchor::Start,
            Operator::EndsWith | Operator::NotEndsWith => Anchor::End,
            _ => Anchor::Anywhere,
        }
    }

    fn like(&self, literal: &str) -> String {
        match self {
            Anchor::Start => format!("{literal}%"),
            Anchor::End => format!("%{literal}"),
            Anchor::Anywhere => format!("%{literal}%"),
        }
    }

    fn regex(&self, literal: &str) -> String {
        match self {
            Anchor::Start => format!("^{literal}.*"),
            Anchor::End => format!(".*{literal}$"),
            Anchor::Anywhere => format!(".*{literal}.*"),
        }
    }
}

/// Escape LIKE wildcards; the flag reports whether anything was escaped
fn escape_like(text: &str) -> (String, bool) {
    let mut escaped = String::with_capacity(text.len());
    let mut changed = false;
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
            changed = true;
        }
        escaped.push(c);
    }
    (escaped, changed)
}

fn pattern(
    op: Operator,
    left: &ExprOperand,
    right: &ExprOperand,
) -> Result<Option<Filter>, TranslateError> {
    let (field, value) = field_and_value(op, left, right)?;
    let anchor = Anchor::of(op);
    let invalid = |found: &Value| TranslateError::InvalidPattern {
        operator: op.to_string(),
        found: kind_name(found).to_string(),
    };

    let filter = match value {
        Value::String(text) => {
            let (literal, escaped) = escape_like(text);
            if escaped {
                Filter::like_escaped(field, anchor.like(&literal), '\\')
            } else {
                Filter::like(field, anchor.like(&literal))
            }
        }
        Value::Array(items) => {
            let alternatives = items
                .iter()
                .map(|item| match item {
                    Value::String(text) => Ok(anchor.regex(&regex::escape(text))),
                    other => Err(invalid(other)),
                })
                .collect::<Result<Vec<_>, _>>()?;
            if alternatives.is_empty() {
                return Ok(None);
            }
            Filter::regex(field, alternatives.join("|"))
        }
        other => return Err(invalid(other)),
    };
    debug!(operator = %op, dimension = field, "translated pattern expression");
    Ok(Some(if op.is_negated() { filter.negate() } else { filter }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn one(expr: FilterExpr) -> Filter {
        translate(&expr).unwrap().unwrap()
    }

    #[test]
    fn test_none_passes_through() {
        assert_eq!(translate_filter(None).unwrap(), None);
    }

    #[test]
    fn test_equality() {
        assert_eq!(
            one(FilterExpr::field_op("deleted", Operator::Eq, true)),
            json!({"type": "selector", "dimension": "deleted", "value": "t"})
        );
        let reversed = FilterExpr::compare(Operator::Ne, ExprOperand::value("x"), ExprOperand::field("name"));
        assert_eq!(one(reversed), Filter::selector("name", "x").negate());
        let columns = FilterExpr::compare(Operator::Eq, ExprOperand::field("a"), ExprOperand::field("b"));
        assert_eq!(one(columns), Filter::column_comparison("a", "b"));
    }

    #[test]
    fn test_constant_comparison_fails() {
        let expr = FilterExpr::compare(Operator::Eq, ExprOperand::value(1), ExprOperand::value(1));
        assert_eq!(translate(&expr).unwrap_err(), TranslateError::ConstantComparison);
        let expr = FilterExpr::compare(Operator::Lt, ExprOperand::field("a"), ExprOperand::field("b"));
        assert_eq!(translate(&expr).unwrap_err(), TranslateError::ColumnInequality);
    }

    #[test]
    fn test_bounds() {
        assert_eq!(
            one(FilterExpr::field_op("deleted", Operator::Gt, 42)),
            json!({"type": "bound", "dimension": "deleted", "lower": 42, "lowerStrict": true, "ordering": "numeric"})
        );
        assert_eq!(
            one(FilterExpr::field_op("deleted", Operator::Gt, "42")),
            json!({"type": "bound", "dimension": "deleted", "lower": "42", "lowerStrict": true, "ordering": "alphanumeric"})
        );
        assert_eq!(
            one(FilterExpr::field_op("age", Operator::Lte, 65)),
            json!({"type": "bound", "dimension": "age", "upper": 65, "upperStrict": false, "ordering": "numeric"})
        );
        // Value on the left flips the side
        let flipped = FilterExpr::compare(Operator::Gt, ExprOperand::value(42), ExprOperand::field("deleted"));
        assert_eq!(
            one(flipped),
            json!({"type": "bound", "dimension": "deleted", "upper": 42, "upperStrict": true, "ordering": "numeric"})
        );
    }

    #[test]
    fn test_membership() {
        assert_eq!(translate(&FilterExpr::field_op("c", Operator::In, json!([]))).unwrap(), None);
        assert_eq!(one(FilterExpr::field_op("c", Operator::In, "t")), Filter::selector("c", "t"));
        assert_eq!(
            one(FilterExpr::field_op("c", Operator::NotIn, json!(["a", "b"]))),
            Filter::or(vec![Filter::selector("c", "a"), Filter::selector("c", "b")]).negate()
        );
        let dynamic = FilterExpr::compare(Operator::In, ExprOperand::value(json!(["a"])), ExprOperand::field("c"));
        assert!(matches!(translate(&dynamic), Err(TranslateError::DynamicOperand { .. })));
    }

    #[test]
    fn test_patterns() {
        assert_eq!(
            one(FilterExpr::field_op("name", Operator::StartsWith, "prefix")),
            json!({"type": "like", "pattern": "prefix%", "dimension": "name"})
        );
        assert_eq!(
            one(FilterExpr::field_op("name", Operator::EndsWith, "50%")),
            json!({"type": "like", "dimension": "name", "pattern": "%50\\%", "escape": "\\"})
        );
        assert_eq!(
            one(FilterExpr::field_op("name", Operator::NotContains, "x")),
            Filter::like("name", "%x%").negate()
        );
        assert_eq!(
            one(FilterExpr::field_op("name", Operator::StartsWith, json!(["a.b", "c"]))),
            Filter::regex("name", "^a\\.b.*|^c.*")
        );
        assert!(matches!(
            translate(&FilterExpr::field_op("name", Operator::EndsWith, json!([1]))),
            Err(TranslateError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_logical_collapse() {
        let empty_in = FilterExpr::field_op("c", Operator::In, json!([]));
        let eq = FilterExpr::field_op("a", Operator::Eq, 1);

        assert_eq!(one(FilterExpr::And(vec![empty_in.clone(), eq.clone()])), Filter::selector("a", 1));
        assert_eq!(translate(&FilterExpr::Or(vec![empty_in.clone()])).unwrap(), None);
        assert_eq!(translate(&FilterExpr::not(empty_in)).unwrap(), None);
        assert_eq!(
            one(FilterExpr::And(vec![eq.clone(), eq.clone()])),
            Filter::and(vec![Filter::selector("a", 1), Filter::selector("a", 1)])
        );
    }
}
