//! Filter family and its typed constructors

use serde_json::{json, Map, Value};

use crate::record::{
    FieldSpec, RecordFamily, TypedRecord, VariantSchema, LIST, OBJECT, STRING,
    STRING_OR_NUMBER, BOOL,
};
use crate::time::Interval;

/// Marker for the filter record family
#[derive(Debug, Clone, Copy)]
pub struct FilterFamily;

/// A validated filter record
pub type Filter = TypedRecord<FilterFamily>;

const EXTRACTION_FN: FieldSpec = FieldSpec::of("extractionFn", OBJECT);

static LOGICAL: VariantSchema = VariantSchema {
    required: &[FieldSpec::of("fields", LIST)],
    optional: &[],
};
static NOT: VariantSchema = VariantSchema {
    required: &[FieldSpec::of("field", OBJECT)],
    optional: &[],
};
static SELECTOR: VariantSchema = VariantSchema {
    required: &[FieldSpec::of("dimension", STRING), FieldSpec::any("value")],
    optional: &[EXTRACTION_FN],
};
static BOUND: VariantSchema = VariantSchema {
    required: &[FieldSpec::of("dimension", STRING)],
    optional: &[
        FieldSpec::of("lower", STRING_OR_NUMBER),
        FieldSpec::of("upper", STRING_OR_NUMBER),
        FieldSpec::of("lowerStrict", BOOL),
        FieldSpec::of("upperStrict", BOOL),
        FieldSpec::of("ordering", STRING),
        EXTRACTION_FN,
    ],
};
static IN: VariantSchema = VariantSchema {
    required: &[FieldSpec::of("dimension", STRING), FieldSpec::of("values", LIST)],
    optional: &[EXTRACTION_FN],
};
static LIKE: VariantSchema = VariantSchema {
    required: &[FieldSpec::of("dimension", STRING), FieldSpec::of("pattern", STRING)],
    optional: &[FieldSpec::of("escape", STRING), EXTRACTION_FN],
};
static REGEX: VariantSchema = VariantSchema {
    required: &[FieldSpec::of("dimension", STRING), FieldSpec::of("pattern", STRING)],
    optional: &[EXTRACTION_FN],
};
static COLUMN_COMPARISON: VariantSchema = VariantSchema {
    required: &[FieldSpec::of("dimensions", LIST)],
    optional: &[],
};
static INTERVAL: VariantSchema = VariantSchema {
    required: &[FieldSpec::of("dimension", STRING), FieldSpec::of("intervals", LIST)],
    optional: &[EXTRACTION_FN],
};
static JAVASCRIPT: VariantSchema = VariantSchema {
    required: &[FieldSpec::of("dimension", STRING), FieldSpec::of("function", STRING)],
    optional: &[EXTRACTION_FN],
};
static SEARCH: VariantSchema = VariantSchema {
    required: &[FieldSpec::of("dimension", STRING), FieldSpec::of("query", OBJECT)],
    optional: &[EXTRACTION_FN],
};
static EXTRACTION: VariantSchema = VariantSchema {
    required: &[
        FieldSpec::of("dimension", STRING),
        FieldSpec::any("value"),
        FieldSpec::of("extractionFn", OBJECT),
    ],
    optional: &[],
};

impl RecordFamily for FilterFamily {
    const FAMILY: &'static str = "filter";
    const VARIANTS: &'static [&'static str] = &[
        "and",
        "or",
        "not",
        "selector",
        "bound",
        "in",
        "like",
        "regex",
        "columnComparison",
        "interval",
        "javascript",
        "search",
        "extraction",
    ];

    fn schema(variant: &str) -> Option<&'static VariantSchema> {
        match variant {
            "and" | "or" => Some(&LOGICAL),
            "not" => Some(&NOT),
            "selector" => Some(&SELECTOR),
            "bound" => Some(&BOUND),
            "in" => Some(&IN),
            "like" => Some(&LIKE),
            "regex" => Some(&REGEX),
            "columnComparison" => Some(&COLUMN_COMPARISON),
            "interval" => Some(&INTERVAL),
            "javascript" => Some(&JAVASCRIPT),
            "search" => Some(&SEARCH),
            "extraction" => Some(&EXTRACTION),
            _ => None,
        }
    }

    fn finish(variant: &str, fields: &mut Map<String, Value>) {
        // The store compares booleans by their "t"/"f" spelling
        if variant == "selector" {
            if let Some(Value::Bool(flag)) = fields.get("value") {
                let spelled = if *flag { "t" } else { "f" };
                fields.insert("value".to_string(), Value::String(spelled.to_string()));
            }
        }
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

impl Filter {
    /// `dimension == value`; booleans become `"t"` / `"f"`
    pub fn selector(dimension: impl Into<String>, value: impl Into<Value>) -> Self {
        let fields = json!({"dimension": dimension.into(), "value": value.into()});
        Self::assemble("selector", object(fields))
    }

    /// `dimension` is any of `values`
    pub fn in_values<I, V>(dimension: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        let fields = json!({"dimension": dimension.into(), "values": values});
        Self::assemble("in", object(fields))
    }

    /// SQL LIKE match with `%` and `_` wildcards
    pub fn like(dimension: impl Into<String>, pattern: impl Into<String>) -> Self {
        let fields = json!({"dimension": dimension.into(), "pattern": pattern.into()});
        Self::assemble("like", object(fields))
    }

    /// LIKE match where `escape` protects literal wildcards in `pattern`
    pub fn like_escaped(
        dimension: impl Into<String>,
        pattern: impl Into<String>,
        escape: char,
    ) -> Self {
        let fields = json!({
            "dimension": dimension.into(),
            "pattern": pattern.into(),
            "escape": escape.to_string(),
        });
        Self::assemble("like", object(fields))
    }

    /// Java regular expression match
    pub fn regex(dimension: impl Into<String>, pattern: impl Into<String>) -> Self {
        let fields = json!({"dimension": dimension.into(), "pattern": pattern.into()});
        Self::assemble("regex", object(fields))
    }

    /// Two dimensions hold equal values
    pub fn column_comparison(left: impl Into<String>, right: impl Into<String>) -> Self {
        let fields = json!({"dimensions": [left.into(), right.into()]});
        Self::assemble("columnComparison", object(fields))
    }

    /// `dimension` (usually `__time`) falls in any of `intervals`
    pub fn interval(dimension: impl Into<String>, intervals: Vec<Interval>) -> Self {
        let fields = json!({"dimension": dimension.into(), "intervals": intervals});
        Self::assemble("interval", object(fields))
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Self::logical("and", filters)
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Self::logical("or", filters)
    }

    pub fn not(filter: Filter) -> Self {
        let mut fields = Map::new();
        fields.insert("field".to_string(), filter.into());
        Self::assemble("not", fields)
    }

    fn logical(variant: &str, filters: Vec<Filter>) -> Self {
        let fields: Vec<Value> = filters.into_iter().map(Value::from).collect();
        let mut map = Map::new();
        map.insert("fields".to_string(), Value::Array(fields));
        Self::assemble(variant, map)
    }

    /// Wrap in `not`, without simplifying double negation
    pub fn negate(&self) -> Self {
        Self::not(self.clone())
    }

    /// AND of the present filters
    ///
    /// Absent filters are dropped. Nothing left gives `None`; a single
    /// filter is returned unwrapped.
    pub fn join<I>(filters: I) -> Option<Filter>
    where
        I: IntoIterator,
        I::Item: Into<Option<Filter>>,
    {
        Self::combine("and", filters)
    }

    /// OR of the present filters, collapsing like `join`
    pub fn disjoin<I>(filters: I) -> Option<Filter>
    where
        I: IntoIterator,
        I::Item: Into<Option<Filter>>,
    {
        Self::combine("or", filters)
    }

    fn combine<I>(variant: &str, filters: I) -> Option<Filter>
    where
        I: IntoIterator,
        I::Item: Into<Option<Filter>>,
    {
        let mut present: Vec<Filter> = filters.into_iter().filter_map(Into::into).collect();
        match present.len() {
            0 => None,
            1 => present.pop(),
            _ => Some(Self::logical(variant, present)),
        }
    }

    /// The filtered dimension, for single-dimension variants
    pub fn dimension(&self) -> Option<&str> {
        self.get_str("dimension")
    }

    /// Sub-filters of an `and` / `or` filter
    pub fn children(&self) -> Vec<Filter> {
        self.get("fields")
            .and_then(Value::as_array)
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(|f| Filter::try_from(f.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_spells_booleans() {
        assert_eq!(Filter::selector("is_new", true).get("value"), Some(&json!("t")));
        assert_eq!(Filter::selector("is_new", false).get("value"), Some(&json!("f")));
        assert_eq!(Filter::selector("country", "nl").get("value"), Some(&json!("nl")));
    }

    #[test]
    fn test_dynamic_selector_spells_booleans() {
        let filter = Filter::new("selector", json!({"dimension": "robot", "value": true})).unwrap();
        assert_eq!(filter, json!({"type": "selector", "dimension": "robot", "value": "t"}));
    }

    #[test]
    fn test_join_collapses() {
        let a = Filter::selector("a", 1);
        let b = Filter::selector("b", 2);

        assert_eq!(Filter::join(Vec::<Option<Filter>>::new()), None);
        assert_eq!(Filter::join([None::<Filter>, None]), None);
        assert_eq!(Filter::join([a.clone()]), Some(a.clone()));
        assert_eq!(Filter::join([None, Some(a.clone())]), Some(a.clone()));

        let joined = Filter::join([a.clone(), b.clone()]).unwrap();
        assert_eq!(joined.variant(), "and");
        assert_eq!(joined.children(), vec![a.clone(), b.clone()]);

        let disjoined = Filter::disjoin([Some(a), None, Some(b)]).unwrap();
        assert_eq!(disjoined.variant(), "or");
    }

    #[test]
    fn test_negate_always_wraps() {
        let a = Filter::selector("a", 1);
        let twice = a.negate().negate();
        assert_eq!(twice, json!({"type": "not", "field": {"type": "not", "field": a}}));
    }

    #[test]
    fn test_column_comparison_and_in() {
        let cmp = Filter::column_comparison("first", "second");
        assert_eq!(cmp, json!({"type": "columnComparison", "dimensions": ["first", "second"]}));
        let within = Filter::in_values("country", ["nl", "be"]);
        assert_eq!(within, json!({"type": "in", "dimension": "country", "values": ["nl", "be"]}));
    }

    #[test]
    fn test_dynamic_construction_reports_every_missing_field() {
        let err = Filter::new("like", json!({})).unwrap_err();
        assert!(err.is_missing("dimension"));
        assert!(err.is_missing("pattern"));
    }

    #[test]
    fn test_extraction_matches_on_value() {
        let lookup = json!({"type": "lookup", "lookup": {"type": "map", "map": {"en": "English"}}});
        let filter = Filter::new(
            "extraction",
            json!({"dimension": "language", "value": "English", "extractionFn": lookup.clone()}),
        )
        .unwrap();
        assert_eq!(filter.get("value"), Some(&json!("English")));

        let err = Filter::new(
            "extraction",
            json!({"dimension": "language", "outputName": "English", "extractionFn": lookup}),
        )
        .unwrap_err();
        assert!(err.is_missing("value"));
    }
}
