//! Integration tests for filter and aggregation records
//!
//! Records built through typed constructors must equal the same records
//! authored as plain JSON and decoded.

mod common;

use druidkit::aggregation::filter_aggregation;
use druidkit::{divide, Aggregation, BoundFilter, Filter, PostAggregation, SchemaError, Violation};
use serde_json::json;

#[test]
fn test_typed_and_plain_records_agree() {
    common::init_test_logging();

    let typed = Filter::and(vec![
        Filter::selector("page", "Home"),
        BoundFilter::new("added").lower(10).lower_strict(true).build().unwrap(),
    ]);
    let plain: Filter = serde_json::from_value(json!({
        "type": "and",
        "fields": [
            {"type": "selector", "dimension": "page", "value": "Home"},
            {"type": "bound", "dimension": "added", "lower": 10, "lowerStrict": true},
        ],
    }))
    .unwrap();
    assert_eq!(typed, plain);
    assert_eq!(serde_json::to_value(&typed).unwrap(), serde_json::to_value(&plain).unwrap());
}

#[test]
fn test_snake_case_keys_are_normalized() {
    let aggregation = Aggregation::new("longSum", json!({"field_name": "count", "name": "total"})).unwrap();
    assert_eq!(aggregation, Aggregation::long_sum("count", Some("total")));
}

#[test]
fn test_all_missing_fields_reported() {
    let err: SchemaError = Filter::new("bound", json!({})).unwrap_err();
    assert_eq!(err.violations.len(), 1);

    let err = PostAggregation::new("arithmetic", json!({"name": "ratio"})).unwrap_err();
    assert!(err.is_missing("fields"));
    assert!(err.is_missing("fn"));
    assert_eq!(err.violations.len(), 2);
}

#[test]
fn test_unknown_variant() {
    let err = Filter::new("fuzzy", json!({"dimension": "page"})).unwrap_err();
    assert!(matches!(&err.violations[0], Violation::UnknownVariant { variant, .. } if variant == "fuzzy"));
    assert!(err.to_string().starts_with("Invalid filter:"));
}

#[test]
fn test_extend_is_idempotent() {
    let selector = Filter::selector("page", "Home");
    let once = selector.extend(json!({"value": "About"})).unwrap();
    let twice = once.extend(json!({"value": "About"})).unwrap();
    assert_eq!(once, twice);
    assert_eq!(once.get("value"), Some(&json!("About")));
}

#[test]
fn test_join_collapses() {
    let page = Filter::selector("page", "Home");
    assert_eq!(Filter::join([Some(page.clone())]), Some(page.clone()));
    assert_eq!(Filter::join([None::<Filter>, None]), None);
    assert_eq!(
        Filter::disjoin([Some(page.clone()), None, Some(page.negate())]),
        Some(Filter::or(vec![page.clone(), page.negate()]))
    );
}

#[test]
fn test_filtered_name_delegation() {
    let users = Aggregation::long_sum("user_count", Some("users_sum"));
    let active = Filter::selector("active", true);

    let inherited = filter_aggregation(&users, [active.clone()], None).unwrap();
    assert_eq!(inherited.name(), Some("users_sum"));
    assert_eq!(inherited.get("name"), Some(&json!("users_sum")));

    let renamed = filter_aggregation(&users, [active], Some("x")).unwrap();
    assert_eq!(renamed.name(), Some("x"));
}

#[test]
fn test_filtering_twice_ands_filters() {
    let users = Aggregation::long_sum("user_count", Some("users_sum"));
    let once = users.filter([Filter::selector("a", 1)], None).unwrap();
    let twice = once.filter([Filter::selector("b", 2)], None).unwrap();
    assert_eq!(
        twice.get("filter"),
        Some(&json!({"type": "and", "fields": [
            {"type": "selector", "dimension": "a", "value": 1},
            {"type": "selector", "dimension": "b", "value": 2},
        ]}))
    );
    assert_eq!(twice.name(), Some("users_sum"));
}

#[test]
fn test_arithmetic_naming() {
    let users = Aggregation::long_sum("user_count", Some("users_sum"));
    let active = users
        .filter([Filter::selector("active", true)], Some("active_users_sum"))
        .unwrap();

    let ratio = divide(&active, &users, None).unwrap();
    assert_eq!(
        ratio,
        json!({
            "type": "arithmetic",
            "name": "active_users_sum__div__users_sum",
            "fn": "/",
            "fields": [
                {"type": "fieldAccess", "fieldName": "active_users_sum", "name": "active_users_sum"},
                {"type": "fieldAccess", "fieldName": "users_sum", "name": "users_sum"},
            ],
        })
    );
}

#[test]
fn test_constant_operands() {
    let users = Aggregation::long_sum("user_count", Some("users_sum"));
    let percent = users.multiply(100, None).unwrap();
    assert_eq!(percent.name(), Some("users_sum__mul__constant__100"));
    assert_eq!(
        percent.get("fields").unwrap()[1],
        json!({"type": "constant", "name": "constant__100", "value": 100})
    );
}
