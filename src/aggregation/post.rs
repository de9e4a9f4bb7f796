//! Post-aggregation family

use serde_json::{json, Map, Value};

use super::aggregation::Aggregation;
use super::arithmetic::{arithmetic, ArithmeticOp, Operand};
use crate::record::{FieldSpec, RecordFamily, SchemaError, TypedRecord, VariantSchema, LIST, STRING};

/// Marker for the post-aggregation record family
#[derive(Debug, Clone, Copy)]
pub struct PostAggregationFamily;

/// A validated post-aggregation record
pub type PostAggregation = TypedRecord<PostAggregationFamily>;

static ARITHMETIC: VariantSchema = VariantSchema {
    required: &[
        FieldSpec::of("name", STRING),
        FieldSpec::of("fields", LIST),
        FieldSpec::of("fn", STRING),
    ],
    optional: &[FieldSpec::of("ordering", STRING)],
};
static CONSTANT: VariantSchema = VariantSchema {
    required: &[FieldSpec::of("name", STRING), FieldSpec::any("value")],
    optional: &[],
};
static FIELD_ACCESS: VariantSchema = VariantSchema {
    required: &[FieldSpec::of("fieldName", STRING)],
    optional: &[FieldSpec::of("name", STRING)],
};
static JAVASCRIPT: VariantSchema = VariantSchema {
    required: &[
        FieldSpec::of("fieldNames", LIST),
        FieldSpec::of("function", STRING),
        FieldSpec::of("name", STRING),
    ],
    optional: &[],
};

impl RecordFamily for PostAggregationFamily {
    const FAMILY: &'static str = "post-aggregation";
    const VARIANTS: &'static [&'static str] = &[
        "arithmetic",
        "constant",
        "fieldAccess",
        "hyperUniqueCardinality",
        "javascript",
    ];

    fn schema(variant: &str) -> Option<&'static VariantSchema> {
        match variant {
            "arithmetic" => Some(&ARITHMETIC),
            "constant" => Some(&CONSTANT),
            "fieldAccess" | "hyperUniqueCardinality" => Some(&FIELD_ACCESS),
            "javascript" => Some(&JAVASCRIPT),
            _ => None,
        }
    }

    fn finish(variant: &str, fields: &mut Map<String, Value>) {
        if !matches!(variant, "fieldAccess" | "hyperUniqueCardinality") {
            return;
        }
        let unnamed = fields.get("name").and_then(Value::as_str).map_or(true, str::is_empty);
        if unnamed {
            if let Some(field_name) = fields.get("fieldName").cloned() {
                fields.insert("name".to_string(), field_name);
            }
        }
    }
}

impl PostAggregation {
    /// Read an aggregated value by name; `name` defaults to `field_name`
    pub fn field_access(field_name: &str, name: Option<&str>) -> Self {
        let mut fields = Map::new();
        fields.insert("fieldName".to_string(), json!(field_name));
        if let Some(name) = name {
            fields.insert("name".to_string(), json!(name));
        }
        Self::assemble("fieldAccess", fields)
    }

    pub fn constant(name: &str, value: impl Into<Value>) -> Self {
        let mut fields = Map::new();
        fields.insert("name".to_string(), json!(name));
        fields.insert("value".to_string(), value.into());
        Self::assemble("constant", fields)
    }

    /// Field accessor for an aggregation's resolved name
    ///
    /// Filtered aggregations are looked through, so the accessor reads the
    /// name the aggregation reports under.
    pub fn from_aggregation(aggregation: &Aggregation, name: Option<&str>) -> Self {
        let field_name = aggregation.name().unwrap_or_default();
        Self::field_access(field_name, Some(name.unwrap_or(field_name)))
    }

    /// `numerator / denominator`, both read by field name
    pub fn rate(numerator: &str, denominator: &str, name: &str) -> Self {
        let fields = vec![
            Value::from(Self::field_access(numerator, None)),
            Value::from(Self::field_access(denominator, None)),
        ];
        let mut map = Map::new();
        map.insert("name".to_string(), json!(name));
        map.insert("fields".to_string(), Value::Array(fields));
        map.insert("fn".to_string(), json!(ArithmeticOp::Divide.symbol()));
        Self::assemble("arithmetic", map)
    }

    pub fn name(&self) -> Option<&str> {
        self.get_str("name")
    }

    pub fn divide(&self, other: impl Into<Operand>, name: Option<&str>) -> Result<Self, SchemaError> {
        arithmetic(ArithmeticOp::Divide, self, other, name)
    }

    pub fn multiply(&self, other: impl Into<Operand>, name: Option<&str>) -> Result<Self, SchemaError> {
        arithmetic(ArithmeticOp::Multiply, self, other, name)
    }

    pub fn add(&self, other: impl Into<Operand>, name: Option<&str>) -> Result<Self, SchemaError> {
        arithmetic(ArithmeticOp::Add, self, other, name)
    }

    pub fn subtract(&self, other: impl Into<Operand>, name: Option<&str>) -> Result<Self, SchemaError> {
        arithmetic(ArithmeticOp::Subtract, self, other, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_access_name_defaults() {
        let access = PostAggregation::new("fieldAccess", json!({"field_name": "users"})).unwrap();
        assert_eq!(access, json!({"type": "fieldAccess", "fieldName": "users", "name": "users"}));
        let cardinality =
            PostAggregation::new("hyperUniqueCardinality", json!({"fieldName": "uniques"})).unwrap();
        assert_eq!(cardinality.name(), Some("uniques"));
    }

    #[test]
    fn test_from_aggregation_references_resolved_name() {
        let agg = Aggregation::long_sum("users", Some("users_sum"));
        let access = PostAggregation::from_aggregation(&agg, None);
        assert_eq!(
            access,
            json!({"type": "fieldAccess", "fieldName": "users_sum", "name": "users_sum"})
        );
        let renamed = PostAggregation::from_aggregation(&agg, Some("total"));
        assert_eq!(renamed.get_str("fieldName"), Some("users_sum"));
        assert_eq!(renamed.name(), Some("total"));
    }

    #[test]
    fn test_rate() {
        let rate = PostAggregation::rate("clicks", "impressions", "ctr");
        assert_eq!(
            rate,
            json!({
                "type": "arithmetic",
                "name": "ctr",
                "fields": [
                    {"type": "fieldAccess", "fieldName": "clicks", "name": "clicks"},
                    {"type": "fieldAccess", "fieldName": "impressions", "name": "impressions"}
                ],
                "fn": "/"
            })
        );
    }
}
