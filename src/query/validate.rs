//! Document-level query validation

use serde_json::Value;
use tracing::debug;

use super::error::ValidationError;
use super::request::{Query, QueryFamily};
use crate::record::RecordFamily;

type Check = fn(&Query) -> Option<String>;

const CHECKS: &[Check] = &[check_serializable, check_data_source, check_query_type];

/// Run every check, reporting all failures together
pub fn validate_query(query: &Query) -> Result<(), ValidationError> {
    let failures: Vec<String> = CHECKS.iter().filter_map(|check| check(query)).collect();
    if failures.is_empty() {
        return Ok(());
    }
    debug!(query_type = query.query_type(), failures = failures.len(), "query failed validation");
    Err(ValidationError { query: query.to_value(), failures })
}

fn check_serializable(query: &Query) -> Option<String> {
    serde_json::to_string(query)
        .err()
        .map(|e| format!("Queries must be JSON serializable. {e}"))
}

fn check_data_source(query: &Query) -> Option<String> {
    match query.data_source() {
        Some(Value::String(_)) => None,
        Some(_) if valid_subquery(query) => None,
        Some(other) => Some(format!("Invalid dataSource: {other}")),
        None => Some("Invalid dataSource: null".to_string()),
    }
}

fn valid_subquery(query: &Query) -> bool {
    query
        .subquery()
        .and_then(|sub| Query::try_from(Value::Object(sub.clone())).ok())
        .is_some_and(|sub| validate_query(&sub).is_ok())
}

fn check_query_type(query: &Query) -> Option<String> {
    let query_type = query.query_type();
    if QueryFamily::VARIANTS.contains(&query_type) {
        return None;
    }
    Some(format!(
        "Invalid queryType \"{query_type}\". Valid query types: {}",
        QueryFamily::VARIANTS.join(", ")
    ))
}

impl Query {
    /// Check the document is ready to send
    ///
    /// Runs separately from construction: dataSource and context may be
    /// filled in after a query is built.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_query(self)
    }
}
