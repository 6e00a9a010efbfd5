//! Integration test: `unevaluatedProperties` and `unevaluatedItems`.
//!
//! Both keywords see annotations from adjacent keywords and from every
//! valid subschema applied to the same instance location, including through
//! references and conditionals, but never from failed branches.

use jsev_core::Dialect;
use jsev_engine::{evaluate, EvaluationOptions, SchemaEvaluator};
use serde_json::{json, Value};

fn evaluator(schema: Value) -> SchemaEvaluator {
    SchemaEvaluator::new(&schema, EvaluationOptions::default()).unwrap()
}

#[test]
fn test_properties_from_any_of_count_only_for_matching_branches() {
    let evaluator = evaluator(json!({
        "anyOf": [
            {"properties": {"a": {"type": "string"}}, "required": ["a"]},
            {"properties": {"b": {"type": "integer"}}, "required": ["b"]}
        ],
        "unevaluatedProperties": false
    }));
    assert!(evaluator.is_valid(&json!({"a": "x"})).unwrap());
    assert!(evaluator.is_valid(&json!({"a": "x", "b": 1})).unwrap());
    // The second branch fails, so `b` is unevaluated.
    assert!(!evaluator.is_valid(&json!({"a": "x", "b": "y"})).unwrap());
}

#[test]
fn test_conditional_annotations() {
    let evaluator = evaluator(json!({
        "if": {"properties": {"kind": {"const": "circle"}}, "required": ["kind"]},
        "then": {"properties": {"radius": {"type": "number"}}},
        "else": {"properties": {"side": {"type": "number"}}},
        "unevaluatedProperties": false
    }));
    assert!(evaluator.is_valid(&json!({"kind": "circle", "radius": 1})).unwrap());
    assert!(!evaluator.is_valid(&json!({"kind": "circle", "side": 1})).unwrap());
    assert!(evaluator.is_valid(&json!({"side": 2})).unwrap());
    // `if` failed, so its `kind` annotation is not visible.
    assert!(!evaluator.is_valid(&json!({"kind": "square", "side": 2})).unwrap());
}

#[test]
fn test_annotations_through_references() {
    let evaluator = evaluator(json!({
        "$defs": {"named": {"properties": {"name": true}}},
        "$ref": "#/$defs/named",
        "properties": {"id": true},
        "unevaluatedProperties": false
    }));
    assert!(evaluator.is_valid(&json!({"id": 1, "name": "n"})).unwrap());
    assert!(!evaluator.is_valid(&json!({"id": 1, "extra": 0})).unwrap());
}

#[test]
fn test_additional_properties_counts_as_evaluated() {
    let evaluator = evaluator(json!({
        "additionalProperties": {"type": "integer"},
        "unevaluatedProperties": false
    }));
    assert!(evaluator.is_valid(&json!({"x": 1, "y": 2})).unwrap());
}

#[test]
fn test_unevaluated_properties_schema_applies_to_rest() {
    let results = evaluate(
        &json!({"properties": {"a": true}, "unevaluatedProperties": {"type": "string"}}),
        &json!({"a": 1, "b": "s", "c": "t"}),
        &EvaluationOptions::default(),
    )
    .unwrap();
    assert!(results.valid);
    assert_eq!(results.annotation("unevaluatedProperties"), Some(&json!(["b", "c"])));
}

#[test]
fn test_nested_unevaluated_is_independent() {
    let evaluator = evaluator(json!({
        "properties": {
            "inner": {"properties": {"x": true}, "unevaluatedProperties": false}
        },
        "unevaluatedProperties": false
    }));
    assert!(evaluator.is_valid(&json!({"inner": {"x": 1}})).unwrap());
    assert!(!evaluator.is_valid(&json!({"inner": {"x": 1, "y": 2}})).unwrap());
    assert!(!evaluator.is_valid(&json!({"inner": {}, "other": 1})).unwrap());
}

#[test]
fn test_unevaluated_items_after_prefix_items() {
    let evaluator = evaluator(json!({
        "allOf": [{"prefixItems": [{"type": "integer"}]}],
        "prefixItems": [true, true],
        "unevaluatedItems": false
    }));
    assert!(evaluator.is_valid(&json!([1, "a"])).unwrap());
    assert!(!evaluator.is_valid(&json!([1, "a", null])).unwrap());
}

#[test]
fn test_unevaluated_items_with_contains() {
    let schema = json!({"contains": {"type": "string"}, "unevaluatedItems": {"type": "integer"}});
    let evaluator = evaluator(schema.clone());
    assert!(evaluator.is_valid(&json!(["a", 1, "b", 2])).unwrap());
    assert!(!evaluator.is_valid(&json!(["a", 1, null])).unwrap());

    // 2019-09 `contains` does not mark items as evaluated.
    let legacy = EvaluationOptions::default().with_default_dialect(Dialect::Draft201909);
    assert!(!evaluate(&schema, &json!(["a", 1]), &legacy).unwrap().valid);
}

#[test]
fn test_unevaluated_items_with_schema_items() {
    let evaluator = evaluator(json!({"items": {"type": "integer"}, "unevaluatedItems": false}));
    assert!(evaluator.is_valid(&json!([1, 2, 3])).unwrap());
    assert!(evaluator.is_valid(&json!([])).unwrap());
}

#[test]
fn test_unevaluated_items_ignores_non_arrays() {
    let evaluator = evaluator(json!({"unevaluatedItems": false, "unevaluatedProperties": false}));
    assert!(evaluator.is_valid(&json!("string")).unwrap());
    assert!(evaluator.is_valid(&json!(12)).unwrap());
    assert!(!evaluator.is_valid(&json!([1])).unwrap());
    assert!(!evaluator.is_valid(&json!({"a": 1})).unwrap());
}
