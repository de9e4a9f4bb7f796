//! druidkit - Typed, validated query documents for Druid
//!
//! This library provides:
//! - Validated JSON records for filters, aggregations, post-aggregations and queries
//! - Filter and aggregation composition (join, negate, arithmetic naming)
//! - ISO-8601 durations, intervals and granularities, with granularity selection
//! - Translation of generic boolean expressions into filters
//! - Data-source views that build queries from metrics and splits
//! - Scoped query pre-processing and an HTTP client
//!
//! # Architecture
//!
//! **Noun modules** (data structures):
//! - `record/` - the validated record core (TypedRecord, RecordFamily, SchemaError)
//! - `filter/` - filter records and combinators
//! - `aggregation/` - aggregations, post-aggregations, arithmetic
//! - `time/` - durations, intervals, granularities
//! - `query/` - query documents and validation
//! - `datasource/` - dimension and metric declarations (DataSourceView)
//! - `result/` - decoded query results
//!
//! **Verb modules** (transformations):
//! - `translate/` - FilterExpr → Filter
//! - `context/` - Query → Query pre-processing under scoped processors
//! - `parser/` - YAML → DataSourceView, ClientConfig
//! - `client/` - Query → HTTP → JSON
//!
//! # Example
//!
//! ```ignore
//! use druidkit::{Aggregation, Client, ClientConfig, Interval, Query, SimpleGranularity};
//!
//! let users = Aggregation::long_sum("user_count", Some("users_sum"));
//! let query = Query::timeseries(
//!     vec![users],
//!     SimpleGranularity::Day,
//!     Interval::parse("2014-09-24/2014-09-30")?,
//! );
//! let client = Client::new(ClientConfig::new("localhost", 8082).with_data_source("users"));
//! let rows = client.execute(query).await?;
//! ```

pub mod record;
pub mod filter;
pub mod aggregation;
pub mod time;
pub mod query;
pub mod datasource;
pub mod result;
pub mod translate;
pub mod context;
pub mod parser;
pub mod client;
pub mod error;

// Re-export commonly used types
pub use record::{RecordFamily, SchemaError, TypedRecord, Violation};
pub use filter::{BoundFilter, BoundOrdering, Filter};
pub use aggregation::{divide, multiply, add, subtract, remove_duplicates, Aggregation, Operand, PostAggregation};
pub use time::{select_granularity, DurationUnits, Granularity, Interval, Intervals, IsoDuration, PeriodGranularity, SimpleGranularity};
pub use query::{Query, ValidationError};
pub use datasource::{ComplexMetric, DataSourceView, Dimension, QueryOptions, ViewError};
pub use result::{QueryResult, ResultError};
pub use translate::{translate_filter, ExprOperand, FilterExpr, Operator, TranslateError};
pub use context::{ContextError, QueryContext, QueryProcessor};
pub use client::{Client, ClientConfig, ExecutionError, Transport};
pub use error::{Error, ParseError};
