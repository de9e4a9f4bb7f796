//! Aggregation family

use serde_json::{json, Map, Value};

use super::arithmetic::{arithmetic, ArithmeticOp, Operand};
use super::post::PostAggregation;
use crate::filter::Filter;
use crate::record::{
    FieldSpec, RecordFamily, SchemaError, TypedRecord, VariantSchema, BOOL, LIST, OBJECT, STRING,
};

/// Marker for the aggregation record family
#[derive(Debug, Clone, Copy)]
pub struct AggregationFamily;

/// A validated aggregation record
pub type Aggregation = TypedRecord<AggregationFamily>;

/// Variants sharing the `fieldName` + optional `name` shape
pub const MATHEMATICAL_TYPES: &[&str] = &[
    "doubleMin",
    "doubleMax",
    "doubleSum",
    "hyperUnique",
    "longMin",
    "longMax",
    "longSum",
];

static MATHEMATICAL: VariantSchema = VariantSchema {
    required: &[FieldSpec::of("fieldName", STRING)],
    optional: &[FieldSpec::of("name", STRING)],
};
static CARDINALITY: VariantSchema = VariantSchema {
    required: &[
        FieldSpec::of("byRow", BOOL),
        FieldSpec::of("fieldNames", LIST),
        FieldSpec::of("name", STRING),
    ],
    optional: &[],
};
static COUNT: VariantSchema = VariantSchema {
    required: &[FieldSpec::of("name", STRING)],
    optional: &[],
};
static FILTERED: VariantSchema = VariantSchema {
    required: &[FieldSpec::of("filter", OBJECT), FieldSpec::of("aggregator", OBJECT)],
    optional: &[FieldSpec::of("name", STRING)],
};
static JAVASCRIPT: VariantSchema = VariantSchema {
    required: &[
        FieldSpec::of("fieldNames", LIST),
        FieldSpec::of("fnAggregate", STRING),
        FieldSpec::of("fnCombine", STRING),
        FieldSpec::of("fnReset", STRING),
        FieldSpec::of("name", STRING),
    ],
    optional: &[],
};

impl RecordFamily for AggregationFamily {
    const FAMILY: &'static str = "aggregation";
    const VARIANTS: &'static [&'static str] = &[
        "cardinality",
        "count",
        "doubleMin",
        "doubleMax",
        "doubleSum",
        "filtered",
        "hyperUnique",
        "javascript",
        "longMin",
        "longMax",
        "longSum",
    ];

    fn schema(variant: &str) -> Option<&'static VariantSchema> {
        match variant {
            v if MATHEMATICAL_TYPES.contains(&v) => Some(&MATHEMATICAL),
            "cardinality" => Some(&CARDINALITY),
            "count" => Some(&COUNT),
            "filtered" => Some(&FILTERED),
            "javascript" => Some(&JAVASCRIPT),
            _ => None,
        }
    }

    fn finish(variant: &str, fields: &mut Map<String, Value>) {
        if MATHEMATICAL_TYPES.contains(&variant) {
            if !fields.contains_key("name") {
                if let Some(field_name) = fields.get("fieldName").cloned() {
                    fields.insert("name".to_string(), field_name);
                }
            }
            return;
        }
        if variant != "filtered" {
            return;
        }

        // Wrapper name, else the inner name, else the inner fieldName
        let wrapper_name = fields.get("name").cloned();
        let Some(Value::Object(inner)) = fields.get_mut("aggregator") else {
            return;
        };
        let resolved = wrapper_name
            .or_else(|| inner.get("name").cloned())
            .or_else(|| inner.get("fieldName").cloned());
        if let Some(name) = resolved {
            inner.insert("name".to_string(), name.clone());
            fields.entry("name").or_insert(name);
        }
    }
}

fn math(variant: &str, field_name: &str, name: Option<&str>) -> Aggregation {
    let mut fields = Map::new();
    fields.insert("fieldName".to_string(), json!(field_name));
    if let Some(name) = name {
        fields.insert("name".to_string(), json!(name));
    }
    Aggregation::assemble(variant, fields)
}

impl Aggregation {
    pub fn long_sum(field_name: &str, name: Option<&str>) -> Self {
        math("longSum", field_name, name)
    }

    pub fn double_sum(field_name: &str, name: Option<&str>) -> Self {
        math("doubleSum", field_name, name)
    }

    pub fn long_min(field_name: &str, name: Option<&str>) -> Self {
        math("longMin", field_name, name)
    }

    pub fn long_max(field_name: &str, name: Option<&str>) -> Self {
        math("longMax", field_name, name)
    }

    pub fn double_min(field_name: &str, name: Option<&str>) -> Self {
        math("doubleMin", field_name, name)
    }

    pub fn double_max(field_name: &str, name: Option<&str>) -> Self {
        math("doubleMax", field_name, name)
    }

    pub fn hyper_unique(field_name: &str, name: Option<&str>) -> Self {
        math("hyperUnique", field_name, name)
    }

    pub fn count(name: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("name".to_string(), json!(name));
        Self::assemble("count", fields)
    }

    pub fn cardinality(field_names: &[&str], by_row: bool, name: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("byRow".to_string(), json!(by_row));
        fields.insert("fieldNames".to_string(), json!(field_names));
        fields.insert("name".to_string(), json!(name));
        Self::assemble("cardinality", fields)
    }

    pub fn is_filtered(&self) -> bool {
        self.variant() == "filtered"
    }

    /// The plain aggregator: the nested one for filtered aggregations
    pub fn aggregator(&self) -> &Map<String, Value> {
        if self.is_filtered() {
            if let Some(Value::Object(inner)) = self.get("aggregator") {
                return inner;
            }
        }
        self.fields()
    }

    /// Resolved name, looking through a filtered wrapper
    pub fn name(&self) -> Option<&str> {
        self.aggregator().get("name").and_then(Value::as_str)
    }

    /// Resolved field name, looking through a filtered wrapper
    pub fn field_name(&self) -> Option<&str> {
        self.aggregator().get("fieldName").and_then(Value::as_str)
    }

    /// Copy renamed; a filtered wrapper renames its aggregator too
    pub fn with_name(&self, name: &str) -> Result<Self, SchemaError> {
        if !self.is_filtered() {
            return self.extend(json!({"name": name}));
        }
        let mut inner = self.aggregator().clone();
        inner.insert("name".to_string(), json!(name));
        self.extend(json!({"name": name, "aggregator": inner}))
    }

    /// Wrap in a filtered aggregation, ANDing with any existing filter
    ///
    /// The result's name is `name` if given, otherwise this aggregation's
    /// resolved name.
    pub fn filter<I>(&self, filters: I, name: Option<&str>) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = Filter>,
    {
        filter_aggregation(self, filters, name)
    }

    /// Field accessor post-aggregation referencing this aggregation
    pub fn to_field_access(&self, name: Option<&str>) -> PostAggregation {
        PostAggregation::from_aggregation(self, name)
    }

    pub fn divide(
        &self,
        other: impl Into<Operand>,
        name: Option<&str>,
    ) -> Result<PostAggregation, SchemaError> {
        arithmetic(ArithmeticOp::Divide, self, other, name)
    }

    pub fn multiply(
        &self,
        other: impl Into<Operand>,
        name: Option<&str>,
    ) -> Result<PostAggregation, SchemaError> {
        arithmetic(ArithmeticOp::Multiply, self, other, name)
    }

    pub fn add(
        &self,
        other: impl Into<Operand>,
        name: Option<&str>,
    ) -> Result<PostAggregation, SchemaError> {
        arithmetic(ArithmeticOp::Add, self, other, name)
    }

    pub fn subtract(
        &self,
        other: impl Into<Operand>,
        name: Option<&str>,
    ) -> Result<PostAggregation, SchemaError> {
        arithmetic(ArithmeticOp::Subtract, self, other, name)
    }
}

/// Apply filters to an aggregation, filtered or not
pub fn filter_aggregation<I>(
    aggregation: &Aggregation,
    filters: I,
    name: Option<&str>,
) -> Result<Aggregation, SchemaError>
where
    I: IntoIterator<Item = Filter>,
{
    let existing = match aggregation.get("filter") {
        Some(value) if aggregation.is_filtered() => Some(Filter::try_from(value.clone())?),
        _ => None,
    };
    let combined = Filter::join(existing.into_iter().chain(filters).map(Some));

    let mut fields = Map::new();
    if let Some(filter) = combined {
        fields.insert("filter".to_string(), filter.into());
    }
    let mut inner = aggregation.aggregator().clone();
    if let Some(name) = name {
        inner.insert("name".to_string(), json!(name));
        fields.insert("name".to_string(), json!(name));
    }
    fields.insert("aggregator".to_string(), Value::Object(inner));
    Aggregation::from_map("filtered", fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mathematical_name_defaults_to_field_name() {
        let agg = Aggregation::new("longSum", json!({"field_name": "users"})).unwrap();
        assert_eq!(agg, json!({"type": "longSum", "fieldName": "users", "name": "users"}));
        assert_eq!(agg.name(), Some("users"));
    }

    #[test]
    fn test_unknown_type() {
        let err = Aggregation::new("median", json!({"fieldName": "x"})).unwrap_err();
        assert!(err.to_string().contains("median"));
    }

    #[test]
    fn test_javascript_reports_all_missing_fields() {
        let err = Aggregation::new("javascript", json!({"name": "js"})).unwrap_err();
        assert_eq!(err.violations.len(), 4);
    }

    #[test]
    fn test_filtered_name_from_inner_field_name() {
        let agg = Aggregation::new(
            "filtered",
            json!({
                "filter": {"type": "selector", "dimension": "a", "value": 1},
                "aggregator": {"type": "longSum", "fieldName": "users"}
            }),
        )
        .unwrap();
        assert_eq!(agg.name(), Some("users"));
        assert_eq!(agg.get_str("name"), Some("users"));
    }

    #[test]
    fn test_filtered_wrapper_name_wins() {
        let agg = Aggregation::new(
            "filtered",
            json!({
                "name": "outer",
                "filter": {"type": "selector", "dimension": "a", "value": 1},
                "aggregator": {"type": "longSum", "fieldName": "users", "name": "inner"}
            }),
        )
        .unwrap();
        assert_eq!(agg.name(), Some("outer"));
    }

    #[test]
    fn test_with_name_on_filtered() {
        let filtered = Aggregation::long_sum("users", Some("users_sum"))
            .filter([Filter::selector("active", true)], None)
            .unwrap();
        let renamed = filtered.with_name("active_users").unwrap();
        assert_eq!(renamed.name(), Some("active_users"));
        assert_eq!(renamed.get_str("name"), Some("active_users"));
    }

    #[test]
    fn test_filter_twice_merges_filters() {
        let users = Aggregation::long_sum("users", Some("users_sum"));
        let active = Filter::selector("active", true);
        let returning = Filter::selector("returning", true);

        let once = users.filter([active.clone()], Some("active_users")).unwrap();
        let twice = once.filter([returning.clone()], None).unwrap();

        assert_eq!(twice.name(), Some("active_users"));
        assert_eq!(
            twice.get("filter"),
            Some(&Value::from(Filter::and(vec![active, returning])))
        );
        assert_eq!(twice.aggregator().get("fieldName"), Some(&json!("users")));
    }
}
