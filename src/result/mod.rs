//! Query results (noun module)
//!
//! Decodes the result shapes returned for each query type into flat
//! rows and timestamped records.

mod decode;
mod error;

pub use decode::{QueryResult, Record, SCAN_TIME, TIMESTAMP};
pub use error::ResultError;
