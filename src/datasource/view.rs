//! Data-source views and query building

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::dimension::Dimension;
use super::error::ViewError;
use super::metric::ComplexMetric;
use crate::aggregation::{remove_duplicates, Aggregation, Named, PostAggregation};
use crate::client::{Client, Transport};
use crate::filter::Filter;
use crate::query::Query;
use crate::result::QueryResult;
use crate::time::{DurationUnits, Granularity, Interval, IntervalPoint, Intervals};
use crate::translate::{translate_filter, FilterExpr};

/// What to ask a view for
///
/// The time range is `intervals` if given. Otherwise it runs from `start`
/// (or `duration` before `end`) to `end`, which defaults to now.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub start: Option<IntervalPoint>,
    pub end: Option<IntervalPoint>,
    pub duration: Option<DurationUnits>,
    pub intervals: Option<Intervals>,
    pub metrics: Vec<String>,
    /// Dimensions to group by; none gives a timeseries query
    pub splits: Vec<String>,
    pub granularity: Granularity,
    pub filters: Option<FilterExpr>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            duration: None,
            intervals: None,
            metrics: Vec::new(),
            splits: Vec::new(),
            granularity: Granularity::all(),
            filters: None,
        }
    }
}

/// An explicit description of one data source
///
/// Dimensions and metrics are kept in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSourceView {
    /// Set as the query `dataSource` when present
    pub data_source: Option<String>,
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
    #[serde(default)]
    pub metrics: Vec<ComplexMetric>,
}

impl DataSourceView {
    pub fn new(data_source: impl Into<String>) -> Self {
        Self {
            data_source: Some(data_source.into()),
            ..Self::default()
        }
    }

    pub fn dimension(mut self, dimension: Dimension) -> Self {
        self.dimensions.push(dimension);
        self
    }

    pub fn metric(mut self, metric: ComplexMetric) -> Self {
        self.metrics.push(metric);
        self
    }

    pub fn get_metric(&self, metric: &str) -> Option<&ComplexMetric> {
        self.metrics.iter().find(|m| m.metric == metric)
    }

    /// Look up by name, then by column
    pub fn get_dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions
            .iter()
            .find(|d| d.name() == name)
            .or_else(|| self.dimensions.iter().find(|d| d.dimension == name))
    }

    fn requested(&self, metrics: &[String]) -> Result<Vec<&ComplexMetric>, ViewError> {
        metrics
            .iter()
            .map(|m| self.get_metric(m).ok_or_else(|| ViewError::UnknownMetric(m.clone())))
            .collect()
    }

    /// Aggregations of the requested metrics, deduplicated and sorted by name
    pub fn aggregations(&self, metrics: &[String]) -> Result<Vec<Aggregation>, ViewError> {
        let all = self
            .requested(metrics)?
            .into_iter()
            .flat_map(|m| m.aggregations.iter().cloned());
        Ok(sorted_by_name(remove_duplicates(all)))
    }

    /// Post-aggregations of the requested metrics, deduplicated and sorted by name
    pub fn post_aggregations(&self, metrics: &[String]) -> Result<Vec<PostAggregation>, ViewError> {
        let all = self
            .requested(metrics)?
            .into_iter()
            .flat_map(|m| m.post_aggregations.iter().cloned());
        Ok(sorted_by_name(remove_duplicates(all)))
    }

    pub fn get_filters(&self, filters: Option<&FilterExpr>) -> Result<Option<Filter>, ViewError> {
        Ok(translate_filter(filters)?)
    }

    /// Build a timeseries query, or a groupBy query when splitting
    pub fn get_query(&self, options: QueryOptions) -> Result<Query, ViewError> {
        let filter = self.get_filters(options.filters.as_ref())?;
        let intervals = match options.intervals {
            Some(intervals) => intervals,
            None => Intervals::One(time_range(options.start, options.end, options.duration)?),
        };

        let dimensions = options
            .splits
            .iter()
            .map(|split| {
                self.get_dimension(split)
                    .map(|d| d.dimension.clone())
                    .ok_or_else(|| ViewError::UnknownDimension(split.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let aggregations = self.aggregations(&options.metrics)?;
        let post_aggregations = self.post_aggregations(&options.metrics)?;

        let query = if dimensions.is_empty() {
            Query::timeseries(aggregations, options.granularity, intervals)
        } else {
            Query::group_by(dimensions, aggregations, options.granularity, intervals)
        };
        let mut query = query.with_post_aggregations(post_aggregations)?;
        if let Some(data_source) = &self.data_source {
            query = query.with_data_source(data_source.as_str())?;
        }
        if let Some(filter) = filter {
            query = query.filter(filter)?;
        }
        debug!(query_type = query.query_type(), metrics = ?options.metrics, "built view query");
        Ok(query)
    }

    /// Build, execute and wrap the result
    pub async fn execute<T: Transport>(
        &self,
        client: &Client<T>,
        options: QueryOptions,
    ) -> Result<QueryResult, ViewError> {
        let query = self.get_query(options)?;
        let result = client.execute(query.clone()).await?;
        Ok(QueryResult::new(query, result)?)
    }
}

fn sorted_by_name<T: Named>(mut records: Vec<T>) -> Vec<T> {
    records.sort_by(|a, b| a.resolved_name().cmp(&b.resolved_name()));
    records
}

fn time_range(
    start: Option<IntervalPoint>,
    end: Option<IntervalPoint>,
    duration: Option<DurationUnits>,
) -> Result<Interval, ViewError> {
    let end = end.unwrap_or_else(|| IntervalPoint::DateTime(Local::now().naive_local()));
    let builder = Interval::builder().end(end);
    let builder = match (start, duration) {
        (Some(start), _) => builder.start(start),
        (None, Some(units)) if !units.is_empty() => builder.units(units),
        _ => return Err(ViewError::MissingTimeRange),
    };
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    use crate::translate::Operator;

    fn wikipedia() -> DataSourceView {
        let is_anonymous = Dimension::categorical("isAnonymous", ["true", "false"]).with_name("is_anonymous");
        let user_count = Aggregation::long_sum("count", Some("user_count"));
        let anonymous_user_count = user_count
            .filter([is_anonymous.create_selector("true")], Some("anonymous_user_count"))
            .unwrap();
        let anonymous_rate = anonymous_user_count.divide(&user_count, Some("anonymous_rate")).unwrap();

        DataSourceView::new("wikipedia")
            .dimension(Dimension::categorical("channel", ["email", "web", "mobile"]))
            .dimension(is_anonymous)
            .metric(
                ComplexMetric::new("anonymous_rate")
                    .with_name("Anonymous rate")
                    .aggregation(user_count)
                    .aggregation(anonymous_user_count)
                    .post_aggregation(anonymous_rate),
            )
    }

    fn january() -> QueryOptions {
        let day = |d| IntervalPoint::Date(NaiveDate::from_ymd_opt(2017, 1, d).unwrap());
        QueryOptions {
            start: Some(day(1)),
            end: Some(day(8)),
            metrics: vec!["anonymous_rate".into()],
            ..QueryOptions::default()
        }
    }

    #[test]
    fn test_get_query() {
        let query = wikipedia().get_query(january()).unwrap();
        assert_eq!(
            query,
            json!({
                "queryType": "timeseries",
                "dataSource": "wikipedia",
                "granularity": "all",
                "intervals": "2017-01-01/2017-01-08",
                "aggregations": [
                    {
                        "type": "filtered",
                        "name": "anonymous_user_count",
                        "filter": {"type": "selector", "dimension": "isAnonymous", "value": "true"},
                        "aggregator": {"type": "longSum", "fieldName": "count", "name": "anonymous_user_count"},
                    },
                    {"type": "longSum", "fieldName": "count", "name": "user_count"},
                ],
                "postAggregations": [{
                    "type": "arithmetic",
                    "name": "anonymous_rate",
                    "fn": "/",
                    "fields": [
                        {"type": "fieldAccess", "name": "anonymous_user_count", "fieldName": "anonymous_user_count"},
                        {"type": "fieldAccess", "name": "user_count", "fieldName": "user_count"},
                    ],
                }],
            })
        );
        assert!(query.validate().is_ok());
    }

    #[test]
    fn test_splits_and_filters() {
        let options = QueryOptions {
            splits: vec!["is_anonymous".into()],
            filters: Some(FilterExpr::field_op("channel", Operator::Eq, "web")),
            ..january()
        };
        let query = wikipedia().get_query(options).unwrap();
        assert_eq!(query.query_type(), "groupBy");
        assert_eq!(query.get("dimensions"), Some(&json!(["isAnonymous"])));
        assert_eq!(query.get("filter"), Some(&json!({"type": "selector", "dimension": "channel", "value": "web"})));
    }

    #[test]
    fn test_duration_before_end() {
        let options = QueryOptions {
            start: None,
            duration: Some(DurationUnits::days(7)),
            ..january()
        };
        let query = wikipedia().get_query(options).unwrap();
        assert_eq!(query.get("intervals"), Some(&json!("P7D/2017-01-08")));
    }

    #[test]
    fn test_errors() {
        let view = wikipedia();
        let unknown = QueryOptions { metrics: vec!["nope".into()], ..january() };
        assert!(matches!(view.get_query(unknown), Err(ViewError::UnknownMetric(m)) if m == "nope"));

        let no_range = QueryOptions { start: None, ..january() };
        assert!(matches!(view.get_query(no_range), Err(ViewError::MissingTimeRange)));

        let huge = QueryOptions { start: None, duration: Some(DurationUnits::days(u64::MAX)), ..january() };
        assert!(matches!(view.get_query(huge), Err(ViewError::Schema(_))));

        let bad_split = QueryOptions { splits: vec!["browser".into()], ..january() };
        assert!(matches!(view.get_query(bad_split), Err(ViewError::UnknownDimension(_))));
    }

    #[test]
    fn test_dedup_across_metrics() {
        let total = Aggregation::long_sum("count", Some("total"));
        let view = DataSourceView::default()
            .metric(ComplexMetric::new("a").aggregation(total.clone()))
            .metric(ComplexMetric::new("b").aggregation(total).aggregation(Aggregation::count("rows")));
        let names: Vec<_> = view
            .aggregations(&["a".into(), "b".into()])
            .unwrap()
            .iter()
            .map(|a| a.name().unwrap_or_default().to_string())
            .collect();
        assert_eq!(names, vec!["rows", "total"]);
    }
}
