//! Stock query processors
//!
//! Each returns a `QueryProcessor` under a fixed key, so entering the
//! same concern twice in one context fails.

use serde_json::{json, Map, Value};

use super::stack::QueryProcessor;
use crate::filter::Filter;
use crate::query::Query;

pub const DATA_SOURCE_KEY: &str = "dataSource";
pub const TIMEOUT_KEY: &str = "timeout";
pub const PADDING_KEY: &str = "interval-padding";

/// Point queries at `name`
///
/// When the query reads from a sub-query, the innermost query is the one
/// redirected.
pub fn data_source(name: impl Into<String>) -> QueryProcessor {
    let name: String = name.into();
    QueryProcessor::new(DATA_SOURCE_KEY, move |query: Query| {
        let data_source = match query.data_source() {
            Some(Value::Object(outer)) if is_query_source(outer) => {
                let mut outer = outer.clone();
                if let Some(Value::Object(inner)) = outer.get_mut("query") {
                    inner.insert("dataSource".into(), json!(name));
                }
                Value::Object(outer)
            }
            _ => json!(name),
        };
        query.with_data_source(data_source)
    })
}

fn is_query_source(data_source: &Map<String, Value>) -> bool {
    data_source.get("type").and_then(Value::as_str) == Some("query")
}

/// Set `context.timeout`, keeping other context entries
pub fn timeout(timeout_ms: u64) -> QueryProcessor {
    QueryProcessor::new(TIMEOUT_KEY, move |query: Query| {
        let mut entries = Map::new();
        entries.insert("timeout".into(), json!(timeout_ms));
        query.with_context(entries)
    })
}

/// AND `filter` into every query under `key`
pub fn filter(key: impl Into<String>, filter: Filter) -> QueryProcessor {
    QueryProcessor::new(key, move |query: Query| query.filter(filter.clone()))
}

/// Widen intervals to whole granularity buckets
///
/// Queries without a granularity, or whose granularity has no fixed
/// width, pass through unchanged.
pub fn pad_intervals() -> QueryProcessor {
    QueryProcessor::new(PADDING_KEY, |query: Query| {
        let Some(width) = query.granularity()?.and_then(|g| g.width()) else {
            return Ok(query);
        };
        match query.intervals()? {
            Some(intervals) => query.with_intervals(intervals.pad(width)?),
            None => Ok(query),
        }
    })
}
