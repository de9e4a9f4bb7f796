//! Query family and its typed constructors

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::aggregation::{Aggregation, PostAggregation};
use crate::filter::Filter;
use crate::record::{
    FieldSpec, RecordFamily, SchemaError, TypedRecord, VariantSchema, BOOL, INTEGER, LIST,
    LIST_OR_STRING, OBJECT, STRING, STRING_OR_OBJECT,
};
use crate::time::{Granularity, Intervals};

/// Marker for the query record family
#[derive(Debug, Clone, Copy)]
pub struct QueryFamily;

/// A query document
///
/// `dataSource` and `context` are accepted on every query type but not
/// checked at construction; context processors may still supply them.
/// Call `validate` before sending.
pub type Query = TypedRecord<QueryFamily>;

const GRANULARITY: FieldSpec = FieldSpec::of("granularity", STRING_OR_OBJECT);
const AGGREGATIONS: FieldSpec = FieldSpec::of("aggregations", LIST);
const INTERVALS: FieldSpec = FieldSpec::of("intervals", LIST_OR_STRING);
const FILTER: FieldSpec = FieldSpec::of("filter", OBJECT);
const POST_AGGREGATIONS: FieldSpec = FieldSpec::of("postAggregations", LIST);

static TIMESERIES: VariantSchema = VariantSchema {
    required: &[GRANULARITY, AGGREGATIONS, INTERVALS],
    optional: &[FieldSpec::of("descending", BOOL), FILTER, POST_AGGREGATIONS],
};
static GROUP_BY: VariantSchema = VariantSchema {
    required: &[FieldSpec::of("dimensions", LIST), GRANULARITY, AGGREGATIONS, INTERVALS],
    optional: &[
        FILTER,
        POST_AGGREGATIONS,
        FieldSpec::of("having", OBJECT),
        FieldSpec::of("limitSpec", OBJECT),
    ],
};
static TOP_N: VariantSchema = VariantSchema {
    required: &[
        AGGREGATIONS,
        FieldSpec::of("dimension", STRING_OR_OBJECT),
        GRANULARITY,
        FieldSpec::of("metric", STRING_OR_OBJECT),
        INTERVALS,
        FieldSpec::of("threshold", INTEGER),
    ],
    optional: &[FILTER, POST_AGGREGATIONS],
};
static SCAN: VariantSchema = VariantSchema {
    required: &[INTERVALS],
    optional: &[
        FILTER,
        FieldSpec::of("batchSize", INTEGER),
        FieldSpec::of("limit", INTEGER),
        FieldSpec::of("resultFormat", STRING),
        FieldSpec::of("columns", LIST),
    ],
};
static SEGMENT_METADATA: VariantSchema = VariantSchema {
    required: &[],
    optional: &[
        FieldSpec::of("analysisTypes", LIST),
        INTERVALS,
        FieldSpec::of("lenientAggregatorMerge", BOOL),
        FieldSpec::of("merge", BOOL),
        FieldSpec::of("toInclude", OBJECT),
    ],
};
static TIME_BOUNDARY: VariantSchema = VariantSchema {
    required: &[],
    optional: &[FieldSpec::of("bound", STRING), FILTER],
};
static DATA_SOURCE_METADATA: VariantSchema = VariantSchema { required: &[], optional: &[] };

impl RecordFamily for QueryFamily {
    const FAMILY: &'static str = "query";
    const TAG: &'static str = "queryType";
    const VARIANTS: &'static [&'static str] = &[
        "dataSourceMetadata",
        "groupBy",
        "scan",
        "segmentMetadata",
        "timeBoundary",
        "timeseries",
        "topN",
    ];
    const COMMON: &'static [FieldSpec] =
        &[FieldSpec::any("dataSource"), FieldSpec::of("context", OBJECT)];

    fn schema(variant: &str) -> Option<&'static VariantSchema> {
        match variant {
            "timeseries" => Some(&TIMESERIES),
            "groupBy" => Some(&GROUP_BY),
            "topN" => Some(&TOP_N),
            "scan" => Some(&SCAN),
            "segmentMetadata" => Some(&SEGMENT_METADATA),
            "timeBoundary" => Some(&TIME_BOUNDARY),
            "dataSourceMetadata" => Some(&DATA_SOURCE_METADATA),
            _ => None,
        }
    }
}

impl QueryFamily {
    /// True if queries of `variant` take a `filter`
    pub fn accepts_filter(variant: &str) -> bool {
        Self::schema(variant)
            .map(|schema| schema.optional.iter().any(|spec| spec.name == "filter"))
            .unwrap_or(false)
    }
}

fn aggregation_list(aggregations: Vec<Aggregation>) -> Value {
    Value::Array(aggregations.into_iter().map(Value::from).collect())
}

fn intervals_value(intervals: Intervals) -> Value {
    match intervals {
        Intervals::One(interval) => Value::String(interval.into()),
        Intervals::Many(many) => {
            Value::Array(many.into_iter().map(|i| Value::String(i.into())).collect())
        }
    }
}

impl Query {
    /// Aggregates per time bucket
    pub fn timeseries(
        aggregations: Vec<Aggregation>,
        granularity: impl Into<Granularity>,
        intervals: impl Into<Intervals>,
    ) -> Self {
        let mut fields = Map::new();
        fields.insert("granularity".into(), granularity.into().to_value());
        fields.insert("aggregations".into(), aggregation_list(aggregations));
        fields.insert("intervals".into(), intervals_value(intervals.into()));
        Self::assemble("timeseries", fields)
    }

    /// Aggregates per time bucket and combination of `dimensions`
    pub fn group_by(
        dimensions: Vec<String>,
        aggregations: Vec<Aggregation>,
        granularity: impl Into<Granularity>,
        intervals: impl Into<Intervals>,
    ) -> Self {
        let mut fields = Map::new();
        fields.insert("dimensions".into(), json!(dimensions));
        fields.insert("granularity".into(), granularity.into().to_value());
        fields.insert("aggregations".into(), aggregation_list(aggregations));
        fields.insert("intervals".into(), intervals_value(intervals.into()));
        Self::assemble("groupBy", fields)
    }

    /// The `threshold` values of `dimension` ranked by `metric`
    pub fn top_n(
        dimension: &str,
        metric: &str,
        threshold: u64,
        aggregations: Vec<Aggregation>,
        granularity: impl Into<Granularity>,
        intervals: impl Into<Intervals>,
    ) -> Self {
        let mut fields = Map::new();
        fields.insert("aggregations".into(), aggregation_list(aggregations));
        fields.insert("dimension".into(), json!(dimension));
        fields.insert("granularity".into(), granularity.into().to_value());
        fields.insert("metric".into(), json!(metric));
        fields.insert("intervals".into(), intervals_value(intervals.into()));
        fields.insert("threshold".into(), json!(threshold));
        Self::assemble("topN", fields)
    }

    /// Raw rows
    pub fn scan(intervals: impl Into<Intervals>) -> Self {
        let mut fields = Map::new();
        fields.insert("intervals".into(), intervals_value(intervals.into()));
        Self::assemble("scan", fields)
    }

    pub fn time_boundary() -> Self {
        Self::assemble("timeBoundary", Map::new())
    }

    pub fn segment_metadata() -> Self {
        Self::assemble("segmentMetadata", Map::new())
    }

    pub fn data_source_metadata() -> Self {
        Self::assemble("dataSourceMetadata", Map::new())
    }

    pub fn query_type(&self) -> &str {
        self.variant()
    }

    pub fn data_source(&self) -> Option<&Value> {
        self.get("dataSource")
    }

    /// The nested query when `dataSource` is a sub-query
    pub fn subquery(&self) -> Option<&Map<String, Value>> {
        self.data_source()
            .and_then(Value::as_object)
            .and_then(|data_source| data_source.get("query"))
            .and_then(Value::as_object)
    }

    /// Configured `context.timeout`, in milliseconds
    pub fn timeout(&self) -> Option<u64> {
        self.get("context")
            .and_then(|context| context.get("timeout"))
            .and_then(Value::as_u64)
    }

    /// The bucketing granularity, read back into its typed form
    pub fn granularity(&self) -> Result<Option<Granularity>, SchemaError> {
        self.get("granularity").map(Granularity::from_value).transpose()
    }

    pub fn intervals(&self) -> Result<Option<Intervals>, SchemaError> {
        let Some(value) = self.get("intervals") else {
            return Ok(None);
        };
        Intervals::deserialize(value).map(Some).map_err(|e| {
            SchemaError::invalid_value(QueryFamily::FAMILY, self.variant(), "intervals", e.to_string())
        })
    }

    pub fn with_intervals(&self, intervals: impl Into<Intervals>) -> Result<Self, SchemaError> {
        self.extend(json!({"intervals": intervals_value(intervals.into())}))
    }

    pub fn with_data_source(&self, data_source: impl Into<Value>) -> Result<Self, SchemaError> {
        self.extend(json!({"dataSource": data_source.into()}))
    }

    pub fn with_post_aggregations(
        &self,
        post_aggregations: Vec<PostAggregation>,
    ) -> Result<Self, SchemaError> {
        let list: Vec<Value> = post_aggregations.into_iter().map(Value::from).collect();
        self.extend(json!({"postAggregations": list}))
    }

    /// Merge `entries` into the query context
    pub fn with_context(&self, entries: Map<String, Value>) -> Result<Self, SchemaError> {
        let mut context = self
            .get("context")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        context.extend(entries);
        self.extend(json!({"context": context}))
    }

    /// Restrict the query further, ANDing with any filter it has
    pub fn filter(&self, filter: Filter) -> Result<Self, SchemaError> {
        if !QueryFamily::accepts_filter(self.variant()) {
            return Err(SchemaError::invalid_value(
                QueryFamily::FAMILY,
                self.variant(),
                "filter",
                format!("{} queries do not take a filter", self.variant()),
            ));
        }
        let existing = self.get("filter").cloned().map(Filter::try_from).transpose()?;
        let mut fields = Map::new();
        if let Some(combined) = Filter::join([existing, Some(filter)]) {
            fields.insert("filter".into(), combined.into());
        }
        self.extend(Value::Object(fields))
    }
}
