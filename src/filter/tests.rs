//! Tests for filter compilation and MongoDB rendering
//!
//! Predicates are evaluated against the 20-item fixture catalog so each
//! assertion reads as a row count.

use serde_json::json;

use super::{FilterCompiler, FilterNode, Predicate};
use crate::catalog::fixtures;
use crate::error::{ExportError, ValidationError};
use crate::fields::FieldRegistry;

fn compile(registry: &FieldRegistry, node: &FilterNode) -> crate::error::Result<Predicate> {
    FilterCompiler::new(registry).compile(node)
}

fn matching_ids(node: &FilterNode) -> Vec<i64> {
    let registry = fixtures::registry();
    let predicate = compile(&registry, node).unwrap();
    fixtures::products()
        .iter()
        .filter(|p| predicate.matches(p))
        .map(|p| p.id)
        .collect()
}

fn single(field: &str, op: &str, value: serde_json::Value) -> FilterNode {
    FilterNode::and(vec![FilterNode::condition(field, op, value)])
}

#[test]
fn test_empty_and_matches_everything() {
    assert_eq!(matching_ids(&FilterNode::and(vec![])).len(), 20);
    assert!(FilterNode::default().is_match_all());
}

#[test]
fn test_empty_or_matches_nothing() {
    assert!(matching_ids(&FilterNode::or(vec![])).is_empty());
}

#[test]
fn test_is_new_selects_eight() {
    assert_eq!(matching_ids(&single("is_new", "equals", json!(true))).len(), 8);
}

#[test]
fn test_stored_aliases_deserialize() {
    let node: FilterNode = serde_json::from_value(json!({
        "logic": "AND",
        "children": [{"field": "is_new", "op": "equals", "value": true}]
    }))
    .unwrap();
    assert_eq!(node, single("is_new", "equals", json!(true)));
}

#[test]
fn test_nested_groups() {
    let node = FilterNode::or(vec![
        FilterNode::condition("id", "lte", json!(2)),
        FilterNode::and(vec![
            FilterNode::condition("id", "gte", json!(19)),
            FilterNode::condition("is_bestseller", "equals", json!(true)),
        ]),
    ]);
    assert_eq!(matching_ids(&node), vec![1, 2, 20]);
}

#[test]
fn test_non_filterable_field_rejected() {
    let registry = fixtures::registry();
    for key in ["discounted_price", "category_path", "stock.regional_available"] {
        let err = compile(&registry, &single(key, "equals", json!("x"))).unwrap_err();
        assert!(
            matches!(err, ExportError::Validation(ValidationError::FieldNotFilterable(ref k)) if k == key),
            "{key}: {err}"
        );
    }
}

#[test]
fn test_every_filterable_field_compiles() {
    let registry = fixtures::registry();
    for field in registry.filterable() {
        let value = match field.value_type {
            crate::fields::ValueType::Text => json!("a"),
            crate::fields::ValueType::Numeric => json!(1),
            crate::fields::ValueType::Boolean => json!(true),
            crate::fields::ValueType::Date => json!("2024-01-01"),
        };
        let node = single(&field.key, "equals", value);
        assert!(compile(&registry, &node).is_ok(), "{}", field.key);
    }
}

#[test]
fn test_operator_gated_by_value_type() {
    let registry = fixtures::registry();
    let err = compile(&registry, &single("is_new", "gt", json!(true))).unwrap_err();
    assert!(matches!(
        err,
        ExportError::Validation(ValidationError::InvalidOperator { .. })
    ));
    let err = compile(&registry, &single("name", "between", json!(["a", "b"]))).unwrap_err();
    assert!(matches!(
        err,
        ExportError::Validation(ValidationError::InvalidOperator { .. })
    ));
}

#[test]
fn test_malformed_values_rejected() {
    let registry = fixtures::registry();
    for node in [
        single("base_price", "between", json!([500])),
        single("base_price", "between", json!([900, 100])),
        single("base_price", "gt", json!("cheap")),
        single("created_at", "before", json!("yesterday")),
        single("is_new", "equals", json!("maybe")),
    ] {
        let err = compile(&registry, &node).unwrap_err();
        assert!(
            matches!(err, ExportError::Validation(ValidationError::InvalidValue { .. })),
            "{node:?}: {err}"
        );
    }
}

#[test]
fn test_unknown_field_is_config_error() {
    let registry = fixtures::registry();
    let err = compile(&registry, &single("colour", "equals", json!("red"))).unwrap_err();
    assert!(matches!(err, ExportError::Config(_)));
}

#[test]
fn test_numeric_between_inclusive() {
    let ids = matching_ids(&single("base_price", "between", json!([500, "700"])));
    assert_eq!(ids, vec![5, 6, 7]);
}

#[test]
fn test_text_contains_case_insensitive() {
    let ids = matching_ids(&single("name", "contains", json!("ТОВАР 1")));
    assert_eq!(ids.len(), 11);
}

#[test]
fn test_date_day_granularity() {
    assert_eq!(matching_ids(&single("created_at", "equals", json!("2024-01-05"))), vec![5]);
    assert_eq!(matching_ids(&single("created_at", "before", json!("2024-01-03"))), vec![1, 2]);
    assert_eq!(matching_ids(&single("created_at", "after", json!("2024-01-18"))), vec![19, 20]);
}

#[test]
fn test_date_with_time_compares_exactly() {
    // created_at is 10:00 on day i
    let ids = matching_ids(&single("created_at", "after", json!("2024-01-05 09:00:00")));
    assert_eq!(ids.first(), Some(&5));
    assert_eq!(ids.len(), 16);
    let ids = matching_ids(&single("created_at", "equals", json!("2024-01-05T10:00:00")));
    assert_eq!(ids, vec![5]);
}

#[test]
fn test_relation_existence() {
    let ids = matching_ids(&single("brand.name", "equals", json!("Acme")));
    assert_eq!(ids, vec![1, 5, 7, 11, 13, 17, 19]);
    let ids = matching_ids(&single("warehouses.name", "equals", json!("North")));
    assert_eq!(ids.len(), 10);
}

#[test]
fn test_aggregate_total_stock() {
    let ids = matching_ids(&single("stock.total", "gte", json!(10)));
    assert_eq!(ids.len(), 12);
    assert!(ids.contains(&8));
    assert!(!ids.contains(&9));
}

#[test]
fn test_dynamic_attribute_filter() {
    let ids = matching_ids(&single("attribute.color", "equals", json!("синий")));
    assert_eq!(ids, vec![3, 6, 9, 12, 15, 18]);
}

#[test]
fn test_render_empty_groups() {
    assert_eq!(Predicate::All.to_document(), mongodb::bson::doc! {});
    let registry = fixtures::registry();
    let nothing = compile(&registry, &FilterNode::or(vec![])).unwrap();
    assert_eq!(nothing.to_document(), mongodb::bson::doc! { "$expr": false });
}

#[test]
fn test_render_column_and_contains() {
    let registry = fixtures::registry();
    let pred = compile(&registry, &single("sku", "contains", json!("A.1"))).unwrap();
    assert_eq!(
        pred.to_document(),
        mongodb::bson::doc! { "sku": { "$regex": "a\\.1", "$options": "i" } }
    );
}

#[test]
fn test_render_day_equals_as_range() {
    let registry = fixtures::registry();
    let pred = compile(&registry, &single("created_at", "equals", json!("2024-01-31"))).unwrap();
    assert_eq!(
        pred.to_document(),
        mongodb::bson::doc! { "created_at": { "$gte": "2024-01-31", "$lt": "2024-02-01" } }
    );
}

#[test]
fn test_render_related_and_aggregate() {
    let registry = fixtures::registry();
    let pred = compile(&registry, &single("categories.name", "equals", json!("Телефоны"))).unwrap();
    assert_eq!(
        pred.to_document(),
        mongodb::bson::doc! { "categories": { "$elemMatch": { "name": { "$eq": "Телефоны" } } } }
    );

    let pred = compile(&registry, &single("images_count", "gt", json!(1))).unwrap();
    let rendered = pred.to_document();
    let expr = rendered.get_document("$expr").unwrap();
    assert!(expr.contains_key("$gt"));
}
