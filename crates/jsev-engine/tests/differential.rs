//! Differential test: validity agrees with the `jsonschema` crate on
//! schemas both implementations support identically.
//!
//! Only the verdict is compared. Output structure, annotations and error
//! messages are specific to each implementation.

use jsev_engine::{EvaluationOptions, SchemaEvaluator};
use proptest::prelude::*;
use serde_json::{json, Value};

fn agree(schema: &Value, instances: &[Value]) {
    let ours = SchemaEvaluator::new(schema, EvaluationOptions::default()).unwrap();
    for instance in instances {
        let expected = jsonschema::is_valid(schema, instance);
        let actual = ours.is_valid(instance).unwrap();
        assert_eq!(
            actual, expected,
            "schema {schema} instance {instance}: jsev {actual}, oracle {expected}"
        );
    }
}

fn sample_instances() -> Vec<Value> {
    vec![
        json!(null),
        json!(true),
        json!(0),
        json!(7),
        json!(-3),
        json!(2.5),
        json!(10.0),
        json!(""),
        json!("abc"),
        json!("2024-01-31"),
        json!([]),
        json!([1, 2, 3]),
        json!([1, "a", 1]),
        json!({}),
        json!({"a": 1}),
        json!({"a": "x", "b": [true]}),
        json!({"name": "n", "age": 30}),
    ]
}

#[test]
fn test_agrees_on_assertion_keywords() {
    let schemas = [
        json!({"type": ["string", "null"]}),
        json!({"type": "integer"}),
        json!({"minimum": 0, "exclusiveMaximum": 10}),
        json!({"multipleOf": 2}),
        json!({"minLength": 1, "maxLength": 3}),
        json!({"pattern": "^[a-c]+$"}),
        json!({"enum": [1, "abc", null, [1, 2, 3]]}),
        json!({"const": {"a": 1}}),
        json!({"minItems": 1, "maxItems": 2}),
        json!({"uniqueItems": true}),
        json!({"minProperties": 1, "maxProperties": 1}),
        json!({"required": ["a"]}),
    ];
    for schema in &schemas {
        agree(schema, &sample_instances());
    }
}

// The oracle accepts some negative non-multiples of fractional divisors, so
// those verdicts are pinned here instead.
#[test]
fn test_fractional_multiple_of() {
    let evaluator =
        SchemaEvaluator::new(&json!({"multipleOf": 2.5}), EvaluationOptions::default()).unwrap();
    for (instance, expected) in [
        (json!(-3), false),
        (json!(-5), true),
        (json!(7), false),
        (json!(7.5), true),
        (json!(10.0), true),
        (json!(0), true),
        (json!("-3"), true),
    ] {
        assert_eq!(evaluator.is_valid(&instance).unwrap(), expected, "{instance}");
    }
}

#[test]
fn test_agrees_on_applicators() {
    let schemas = [
        json!({"allOf": [{"type": "number"}, {"minimum": 1}]}),
        json!({"anyOf": [{"type": "string"}, {"type": "array"}]}),
        json!({"oneOf": [{"type": "integer"}, {"minimum": 5}]}),
        json!({"not": {"type": "object"}}),
        json!({"if": {"type": "integer"}, "then": {"minimum": 5}, "else": {"type": "string"}}),
        json!({"properties": {"a": {"type": "integer"}}, "additionalProperties": false}),
        json!({"patternProperties": {"^a": {"type": "string"}}}),
        json!({"propertyNames": {"maxLength": 1}}),
        json!({"prefixItems": [{"type": "integer"}], "items": {"type": "string"}}),
        json!({"contains": {"type": "string"}}),
        json!({"contains": {"type": "integer"}, "minContains": 2, "maxContains": 2}),
        json!({"dependentRequired": {"name": ["age"]}}),
        json!({"dependentSchemas": {"a": {"required": ["b"]}}}),
        json!({"properties": {"name": true}, "unevaluatedProperties": false}),
        json!({"prefixItems": [true], "unevaluatedItems": false}),
    ];
    for schema in &schemas {
        agree(schema, &sample_instances());
    }
}

#[test]
fn test_agrees_on_draft7() {
    let schema = json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "items": [{"type": "integer"}],
        "additionalItems": {"type": "string"},
        "dependencies": {"a": ["b"]}
    });
    agree(&schema, &sample_instances());
}

proptest! {
    #[test]
    fn prop_numeric_bounds_agree(
        value in -1000i64..1000,
        minimum in -100i64..100,
        span in 0i64..200,
        divisor in 1u32..12,
    ) {
        let schema = json!({
            "minimum": minimum,
            "maximum": minimum + span,
            "multipleOf": divisor
        });
        let ours = SchemaEvaluator::new(&schema, EvaluationOptions::default()).unwrap();
        let instance = json!(value);
        prop_assert_eq!(
            ours.is_valid(&instance).unwrap(),
            jsonschema::is_valid(&schema, &instance)
        );
    }

    #[test]
    fn prop_string_length_agrees(text in "\\PC{0,8}", min in 0u32..5, extra in 0u32..5) {
        let schema = json!({"minLength": min, "maxLength": min + extra});
        let ours = SchemaEvaluator::new(&schema, EvaluationOptions::default()).unwrap();
        let instance = json!(text);
        prop_assert_eq!(
            ours.is_valid(&instance).unwrap(),
            jsonschema::is_valid(&schema, &instance)
        );
    }
}
