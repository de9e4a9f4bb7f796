//! Flattening of raw query results into rows and records

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use serde_json::{Map, Value};

use super::error::ResultError;
use crate::query::Query;
use crate::record::kind_name;

pub const TIMESTAMP: &str = "timestamp";
pub const SCAN_TIME: &str = "__time";

/// One flattened result row with its timestamp parsed
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub timestamp: Option<DateTime<FixedOffset>>,
    pub fields: Map<String, Value>,
}

/// A query together with its raw result
#[derive(Debug, Clone)]
pub struct QueryResult {
    query: Query,
    result: Vec<Value>,
}

impl QueryResult {
    /// Pair a query with its result; `timeBoundary` results are rejected
    pub fn new(query: Query, result: Value) -> Result<Self, ResultError> {
        if query.query_type() == "timeBoundary" {
            return Err(ResultError::UnsupportedQueryType("timeBoundary".to_string()));
        }
        match result {
            Value::Array(result) => Ok(Self { query, result }),
            other => Err(ResultError::NotAList(kind_name(&other))),
        }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    /// The result exactly as returned
    pub fn raw(&self) -> &[Value] {
        &self.result
    }

    pub fn len(&self) -> usize {
        self.result.len()
    }

    pub fn is_empty(&self) -> bool {
        self.result.is_empty()
    }

    /// Columns identifying a row
    ///
    /// `timestamp` unless the granularity is `all`, then the grouping
    /// dimensions. Scans are indexed by `__time` when they return it.
    pub fn index(&self) -> Vec<String> {
        let query_type = self.query.query_type();
        if query_type == "scan" {
            let columns = self.query.get("columns").and_then(Value::as_array);
            let has_time = match columns {
                Some(columns) if !columns.is_empty() => columns.iter().any(|c| c == SCAN_TIME),
                _ => true,
            };
            return if has_time { vec![SCAN_TIME.to_string()] } else { Vec::new() };
        }

        let mut index = Vec::new();
        if self.query.get("granularity").and_then(Value::as_str) != Some("all") {
            index.push(TIMESTAMP.to_string());
        }
        match query_type {
            "groupBy" => {
                let dimensions = self.query.get("dimensions").and_then(Value::as_array);
                index.extend(dimensions.into_iter().flatten().filter_map(dimension_name));
            }
            "topN" => index.extend(self.query.get("dimension").and_then(dimension_name)),
            _ => {}
        }
        index
    }

    /// Key holding each row's values
    pub fn record_key(&self) -> Option<&'static str> {
        match self.query.query_type() {
            "groupBy" => Some("event"),
            "timeseries" | "topN" => Some("result"),
            _ => None,
        }
    }

    /// Result rows; topN buckets expand to one row per entry and scan
    /// batches to one row per event
    pub fn rows(&self) -> Result<Vec<Map<String, Value>>, ResultError> {
        match self.query.query_type() {
            "topN" => self.top_n_rows(),
            "scan" => self.scan_rows(),
            _ => self
                .result
                .iter()
                .enumerate()
                .map(|(row, value)| object(row, value).cloned())
                .collect(),
        }
    }

    fn top_n_rows(&self) -> Result<Vec<Map<String, Value>>, ResultError> {
        let mut rows = Vec::new();
        for (row, bucket) in self.result.iter().enumerate() {
            let bucket = object(row, bucket)?;
            let entries = bucket
                .get("result")
                .and_then(Value::as_array)
                .ok_or_else(|| malformed(row, "missing result list"))?;
            for entry in entries {
                let mut flat = Map::new();
                if let Some(timestamp) = bucket.get(TIMESTAMP) {
                    flat.insert(TIMESTAMP.to_string(), timestamp.clone());
                }
                flat.insert("result".to_string(), entry.clone());
                rows.push(flat);
            }
        }
        Ok(rows)
    }

    fn scan_rows(&self) -> Result<Vec<Map<String, Value>>, ResultError> {
        let mut rows = Vec::new();
        for (row, batch) in self.result.iter().enumerate() {
            let batch = object(row, batch)?;
            let columns: Vec<&str> = batch
                .get("columns")
                .and_then(Value::as_array)
                .map(|columns| columns.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            let events = batch
                .get("events")
                .and_then(Value::as_array)
                .ok_or_else(|| malformed(row, "missing events list"))?;
            for event in events {
                match event {
                    // compactedList: positional values
                    Value::Array(values) => rows.push(
                        columns
                            .iter()
                            .map(|c| c.to_string())
                            .zip(values.iter().cloned())
                            .collect(),
                    ),
                    Value::Object(event) => rows.push(event.clone()),
                    other => return Err(malformed(row, format!("event is a {}", kind_name(other)))),
                }
            }
        }
        Ok(rows)
    }

    /// Rows reduced to their values, with timestamps parsed
    pub fn records(&self) -> Result<Vec<Record>, ResultError> {
        let key = self.record_key();
        self.rows()?
            .into_iter()
            .enumerate()
            .map(|(row, values)| self.to_record(row, key, values))
            .collect()
    }

    fn to_record(
        &self,
        row: usize,
        key: Option<&str>,
        mut values: Map<String, Value>,
    ) -> Result<Record, ResultError> {
        let timestamp = values.get(TIMESTAMP).map(parse_time).transpose()?;
        let fields = match key {
            Some(key) => match values.remove(key) {
                Some(Value::Object(fields)) => fields,
                _ => return Err(malformed(row, format!("missing {key} object"))),
            },
            None => values,
        };
        let timestamp = match timestamp {
            Some(timestamp) => Some(timestamp),
            None => fields.get(SCAN_TIME).map(parse_time).transpose()?,
        };
        Ok(Record { timestamp, fields })
    }
}

impl<'a> IntoIterator for &'a QueryResult {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.result.iter()
    }
}

fn object(row: usize, value: &Value) -> Result<&Map<String, Value>, ResultError> {
    value
        .as_object()
        .ok_or_else(|| malformed(row, format!("expected an object, found {}", kind_name(value))))
}

fn malformed(row: usize, message: impl Into<String>) -> ResultError {
    ResultError::MalformedRow { row, message: message.into() }
}

/// Dimension specs may be plain names or objects with an output name
fn dimension_name(spec: &Value) -> Option<String> {
    match spec {
        Value::String(name) => Some(name.clone()),
        Value::Object(spec) => spec
            .get("outputName")
            .or_else(|| spec.get("dimension"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

/// RFC 3339 text, or epoch milliseconds as scans return them
fn parse_time(value: &Value) -> Result<DateTime<FixedOffset>, ResultError> {
    let parsed = match value {
        Value::String(text) => DateTime::parse_from_rfc3339(text).ok(),
        Value::Number(millis) => millis
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .map(|utc| utc.fixed_offset()),
        _ => None,
    };
    parsed.ok_or_else(|| ResultError::InvalidTimestamp(value.to_string()))
}
