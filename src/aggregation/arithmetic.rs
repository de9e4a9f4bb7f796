//! Arithmetic over aggregations and post-aggregations

use std::fmt;

use indexmap::IndexMap;
use serde_json::{json, Map, Value};

use super::aggregation::Aggregation;
use super::post::PostAggregation;
use crate::record::SchemaError;

/// Operators an arithmetic post-aggregation can apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Divide,
    Multiply,
    Add,
    Subtract,
}

impl ArithmeticOp {
    /// Wire form of the operator
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithmeticOp::Divide => "/",
            ArithmeticOp::Multiply => "*",
            ArithmeticOp::Add => "+",
            ArithmeticOp::Subtract => "-",
        }
    }

    /// Short name used in generated post-aggregation names
    pub fn short_name(&self) -> &'static str {
        match self {
            ArithmeticOp::Divide => "div",
            ArithmeticOp::Multiply => "mul",
            ArithmeticOp::Add => "add",
            ArithmeticOp::Subtract => "sub",
        }
    }
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One side of an arithmetic post-aggregation
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Read through a field accessor
    Aggregation(Aggregation),
    /// Used as-is
    PostAggregation(PostAggregation),
    /// Becomes a constant named `constant__{value}`
    Constant(Value),
}

impl Operand {
    fn into_post_aggregation(self) -> PostAggregation {
        match self {
            Operand::Aggregation(agg) => PostAggregation::from_aggregation(&agg, None),
            Operand::PostAggregation(post) => post,
            Operand::Constant(value) => {
                PostAggregation::constant(&format!("constant__{}", value), value)
            }
        }
    }
}

impl From<Aggregation> for Operand {
    fn from(agg: Aggregation) -> Self {
        Operand::Aggregation(agg)
    }
}

impl From<&Aggregation> for Operand {
    fn from(agg: &Aggregation) -> Self {
        Operand::Aggregation(agg.clone())
    }
}

impl From<PostAggregation> for Operand {
    fn from(post: PostAggregation) -> Self {
        Operand::PostAggregation(post)
    }
}

impl From<&PostAggregation> for Operand {
    fn from(post: &PostAggregation) -> Self {
        Operand::PostAggregation(post.clone())
    }
}

macro_rules! constant_operand {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Operand {
                fn from(value: $ty) -> Self {
                    Operand::Constant(json!(value))
                }
            }
        )*
    };
}

constant_operand!(i32, i64, u32, u64, f64);

/// Combine two operands into an arithmetic post-aggregation
///
/// Unless `name` is given the result is named
/// `{left}__{op}__{right}` after the operands' names.
pub fn arithmetic(
    op: ArithmeticOp,
    left: impl Into<Operand>,
    right: impl Into<Operand>,
    name: Option<&str>,
) -> Result<PostAggregation, SchemaError> {
    let left = left.into().into_post_aggregation();
    let right = right.into().into_post_aggregation();
    let name = match name {
        Some(name) => name.to_string(),
        None => format!(
            "{}__{}__{}",
            left.name().unwrap_or_default(),
            op.short_name(),
            right.name().unwrap_or_default()
        ),
    };

    let mut fields = Map::new();
    fields.insert("name".to_string(), json!(name));
    fields.insert("fields".to_string(), Value::Array(vec![left.into(), right.into()]));
    fields.insert("fn".to_string(), json!(op.symbol()));
    PostAggregation::from_map("arithmetic", fields)
}

pub fn divide(
    left: impl Into<Operand>,
    right: impl Into<Operand>,
    name: Option<&str>,
) -> Result<PostAggregation, SchemaError> {
    arithmetic(ArithmeticOp::Divide, left, right, name)
}

pub fn multiply(
    left: impl Into<Operand>,
    right: impl Into<Operand>,
    name: Option<&str>,
) -> Result<PostAggregation, SchemaError> {
    arithmetic(ArithmeticOp::Multiply, left, right, name)
}

pub fn add(
    left: impl Into<Operand>,
    right: impl Into<Operand>,
    name: Option<&str>,
) -> Result<PostAggregation, SchemaError> {
    arithmetic(ArithmeticOp::Add, left, right, name)
}

pub fn subtract(
    left: impl Into<Operand>,
    right: impl Into<Operand>,
    name: Option<&str>,
) -> Result<PostAggregation, SchemaError> {
    arithmetic(ArithmeticOp::Subtract, left, right, name)
}

/// Records identified by a resolved name
pub trait Named {
    fn resolved_name(&self) -> Option<&str>;
}

impl Named for Aggregation {
    fn resolved_name(&self) -> Option<&str> {
        self.name()
    }
}

impl Named for PostAggregation {
    fn resolved_name(&self) -> Option<&str> {
        self.name()
    }
}

/// Deduplicate by resolved name
///
/// When names collide the later record wins, placed where the name
/// first appeared.
pub fn remove_duplicates<T, I>(records: I) -> Vec<T>
where
    T: Named,
    I: IntoIterator<Item = T>,
{
    let mut unique: IndexMap<String, T> = IndexMap::new();
    for record in records {
        let key = record.resolved_name().unwrap_or_default().to_string();
        unique.insert(key, record);
    }
    unique.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Filter;

    #[test]
    fn test_divide_names_and_coerces() {
        let users = Aggregation::long_sum("users", Some("users_sum"));
        let active = users
            .filter([Filter::selector("active", true)], Some("active_users_sum"))
            .unwrap();
        let ratio = divide(&active, &users, None).unwrap();
        assert_eq!(
            ratio,
            json!({
                "type": "arithmetic",
                "name": "active_users_sum__div__users_sum",
                "fields": [
                    {"type": "fieldAccess", "fieldName": "active_users_sum", "name": "active_users_sum"},
                    {"type": "fieldAccess", "fieldName": "users_sum", "name": "users_sum"}
                ],
                "fn": "/"
            })
        );
        assert_eq!(active.divide(&users, None).unwrap(), ratio);
    }

    #[test]
    fn test_constant_on_either_side() {
        let users = Aggregation::long_sum("users", Some("users_sum"));
        let halved = users.divide(2, None).unwrap();
        assert_eq!(halved.name(), Some("users_sum__div__constant__2"));

        let inverse = divide(1, &users, Some("inverse")).unwrap();
        let fields = inverse.get("fields").and_then(Value::as_array).unwrap();
        assert_eq!(fields[0], json!({"type": "constant", "name": "constant__1", "value": 1}));
        assert_eq!(inverse.name(), Some("inverse"));
    }

    #[test]
    fn test_post_aggregations_are_nested_as_is() {
        let clicks = Aggregation::long_sum("clicks", None);
        let views = Aggregation::long_sum("views", None);
        let ctr = clicks.divide(&views, Some("ctr")).unwrap();
        let percent = ctr.multiply(100, None).unwrap();
        assert_eq!(percent.name(), Some("ctr__mul__constant__100"));
        let fields = percent.get("fields").and_then(Value::as_array).unwrap();
        assert_eq!(fields[0], Value::from(ctr));
        assert_eq!(percent.get_str("fn"), Some("*"));
    }

    #[test]
    fn test_subtract_and_add() {
        let a = Aggregation::long_sum("a", None);
        let b = Aggregation::long_sum("b", None);
        assert_eq!(subtract(&a, &b, None).unwrap().name(), Some("a__sub__b"));
        assert_eq!(add(&a, &b, None).unwrap().get_str("fn"), Some("+"));
        assert_eq!(multiply(&a, 1.5, None).unwrap().name(), Some("a__mul__constant__1.5"));
    }

    #[test]
    fn test_remove_duplicates_last_value_wins() {
        let first = Aggregation::long_sum("users", Some("users"));
        let other = Aggregation::count("rows");
        let second = Aggregation::double_sum("users", Some("users"));

        let unique = remove_duplicates(vec![first, other.clone(), second.clone()]);
        assert_eq!(unique, vec![second, other]);
    }
}
