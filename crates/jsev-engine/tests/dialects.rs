//! Integration test: behavior that differs between dialects.
//!
//! Each supported dialect is selected either by `$schema` in the schema or
//! by the `defaultDialect` option, and the keyword set and semantics follow.

use std::sync::Arc;

use jsev_core::{Dialect, EvaluationError, FormatRegistry, JsevError};
use jsev_engine::{
    evaluate, EvaluationContext, EvaluationOptions, Keyword, KeywordEvaluation, KeywordRegistry,
    SchemaEvaluator,
};
use serde_json::{json, Value};

const DRAFT6: &str = "http://json-schema.org/draft-06/schema#";
const DRAFT7: &str = "http://json-schema.org/draft-07/schema#";
const DRAFT2019: &str = "https://json-schema.org/draft/2019-09/schema";
const DRAFT2020: &str = "https://json-schema.org/draft/2020-12/schema";

fn valid(schema: Value, instance: Value) -> bool {
    evaluate(&schema, &instance, &EvaluationOptions::default())
        .unwrap()
        .valid
}

fn valid_under(dialect: Dialect, schema: Value, instance: Value) -> bool {
    let options = EvaluationOptions::default().with_default_dialect(dialect);
    evaluate(&schema, &instance, &options).unwrap().valid
}

#[test]
fn test_array_items_by_dialect() {
    for meta in [DRAFT6, DRAFT7, DRAFT2019] {
        let schema = json!({
            "$schema": meta,
            "items": [{"type": "integer"}, {"type": "string"}],
            "additionalItems": false
        });
        assert!(valid(schema.clone(), json!([1, "a"])), "{meta}");
        assert!(!valid(schema.clone(), json!([1, "a", null])), "{meta}");
        assert!(!valid(schema, json!(["a", 1])), "{meta}");
    }

    let schema = json!({
        "$schema": DRAFT2020,
        "prefixItems": [{"type": "integer"}, {"type": "string"}],
        "items": false
    });
    assert!(valid(schema.clone(), json!([1, "a"])));
    assert!(!valid(schema, json!([1, "a", null])));
}

#[test]
fn test_array_form_items_is_malformed_in_2020() {
    let err = evaluate(
        &json!({"$schema": DRAFT2020, "items": [{"type": "integer"}]}),
        &json!([1]),
        &EvaluationOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        JsevError::Evaluation(EvaluationError::MalformedSchema { .. })
    ));
}

#[test]
fn test_legacy_ref_overrides_siblings() {
    let schema = |meta: &str| {
        json!({
            "$schema": meta,
            "definitions": {"str": {"type": "string"}},
            "$ref": "#/definitions/str",
            "maxLength": 2
        })
    };
    assert!(valid(schema(DRAFT7), json!("long string")));
    assert!(valid(schema(DRAFT6), json!("long string")));
    assert!(!valid(schema(DRAFT2019), json!("long string")));
}

#[test]
fn test_dependencies_versus_dependent_keywords() {
    let legacy = json!({
        "$schema": DRAFT7,
        "dependencies": {"card": ["billing"], "name": {"required": ["id"]}}
    });
    assert!(valid(legacy.clone(), json!({"card": 1, "billing": 2})));
    assert!(!valid(legacy.clone(), json!({"card": 1})));
    assert!(!valid(legacy, json!({"name": "x"})));

    let modern = json!({
        "dependentRequired": {"card": ["billing"]},
        "dependentSchemas": {"name": {"required": ["id"]}}
    });
    assert!(!valid(modern.clone(), json!({"card": 1})));
    assert!(!valid(modern.clone(), json!({"name": "x"})));
    assert!(valid(modern, json!({"name": "x", "id": 1})));
}

#[test]
fn test_keywords_outside_their_dialect_are_ignored() {
    // `if` arrived in draft-07.
    let conditional = json!({"if": {"type": "string"}, "then": {"minLength": 3}});
    assert!(valid_under(Dialect::Draft6, conditional.clone(), json!("ab")));
    assert!(!valid_under(Dialect::Draft7, conditional, json!("ab")));

    // `dependentRequired` arrived in 2019-09.
    let dependent = json!({"dependentRequired": {"a": ["b"]}});
    assert!(valid_under(Dialect::Draft7, dependent.clone(), json!({"a": 1})));
    assert!(!valid_under(Dialect::Draft201909, dependent, json!({"a": 1})));
}

#[test]
fn test_contains_bounds_since_2019() {
    let schema = json!({"contains": {"type": "integer"}, "minContains": 2, "maxContains": 3});
    assert!(!valid(schema.clone(), json!([1, "a"])));
    assert!(valid(schema.clone(), json!([1, 2, "a"])));
    assert!(!valid(schema.clone(), json!([1, 2, 3, 4])));

    let zero = json!({"contains": {"type": "integer"}, "minContains": 0});
    assert!(valid(zero, json!(["a"])));

    // Draft-07 has no minContains; plain contains applies.
    assert!(valid_under(Dialect::Draft7, schema, json!([1, "a"])));
}

#[test]
fn test_format_annotates_unless_required() {
    let schema = json!({"format": "email"});
    assert!(valid(schema.clone(), json!("not an email")));

    let strict = EvaluationOptions::default().with_require_format_validation(true);
    assert!(!evaluate(&schema, &json!("not an email"), &strict).unwrap().valid);
    assert!(evaluate(&schema, &json!("a@example.com"), &strict).unwrap().valid);
    assert!(evaluate(&schema, &json!(42), &strict).unwrap().valid);

    let unknown = json!({"format": "x-custom"});
    assert!(evaluate(&unknown, &json!("anything"), &strict).unwrap().valid);
}

#[test]
fn test_format_assertion_vocabulary() {
    let mut registry = jsev_engine::SchemaRegistry::with_parent(jsev_engine::SchemaRegistry::global());
    registry
        .register(json!({
            "$schema": DRAFT2020,
            "$id": "https://example.com/meta/strict-format",
            "$vocabulary": {
                "https://json-schema.org/draft/2020-12/vocab/core": true,
                "https://json-schema.org/draft/2020-12/vocab/validation": true,
                "https://json-schema.org/draft/2020-12/vocab/format-assertion": true
            },
            "$dynamicAnchor": "meta"
        }))
        .unwrap();
    let options = EvaluationOptions::default().with_schema_registry(Arc::new(registry));
    let schema = json!({
        "$schema": "https://example.com/meta/strict-format",
        "format": "ipv4",
        "minimum": 100
    });
    let evaluator = SchemaEvaluator::new(&schema, options).unwrap();
    assert!(!evaluator.is_valid(&json!("300.1.1.1")).unwrap());
    assert!(evaluator.is_valid(&json!("10.1.1.1")).unwrap());
    // No applicator vocabulary, but validation applies.
    assert!(!evaluator.is_valid(&json!(5)).unwrap());
}

#[test]
fn test_custom_format_checker() {
    let mut formats = FormatRegistry::with_builtin();
    formats.register("even-length", |s: &str| s.chars().count() % 2 == 0);
    let options = EvaluationOptions::default()
        .with_formats(Arc::new(formats))
        .with_require_format_validation(true);
    let schema = json!({"format": "even-length"});
    assert!(evaluate(&schema, &json!("ab"), &options).unwrap().valid);
    assert!(!evaluate(&schema, &json!("abc"), &options).unwrap().valid);
}

#[derive(Debug)]
struct Divides;

impl Keyword for Divides {
    fn name(&self) -> &str {
        "x-divides"
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        _evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        let Some(dividend) = value.as_u64() else {
            return Err(ctx.malformed("must be a positive integer"));
        };
        let Some(divisor) = ctx.instance().as_u64() else {
            return Ok(KeywordEvaluation::skip(self.name()));
        };
        Ok(KeywordEvaluation::assert(
            self.name(),
            divisor != 0 && dividend % divisor == 0,
            || format!("{divisor} does not divide {dividend}"),
        ))
    }
}

#[test]
fn test_extension_keyword_applies_under_vocabularies() {
    let mut keywords = KeywordRegistry::with_builtin();
    keywords.register(Arc::new(Divides)).unwrap();
    let options = EvaluationOptions::default().with_keyword_registry(Arc::new(keywords));
    let evaluator = SchemaEvaluator::new(&json!({"x-divides": 12}), options).unwrap();
    assert!(evaluator.is_valid(&json!(4)).unwrap());
    assert!(!evaluator.is_valid(&json!(5)).unwrap());
    assert!(evaluator.is_valid(&json!("n/a")).unwrap());
}

#[test]
fn test_unknown_keywords_are_ignored() {
    assert!(valid(json!({"x-unknown": {"type": "string"}}), json!(1)));
}

#[test]
fn test_exclusive_bounds_are_numbers_from_draft6() {
    let schema = json!({"exclusiveMinimum": 1, "exclusiveMaximum": 3});
    for dialect in Dialect::all() {
        assert!(!valid_under(*dialect, schema.clone(), json!(1)), "{dialect}");
        assert!(valid_under(*dialect, schema.clone(), json!(2)), "{dialect}");
        assert!(!valid_under(*dialect, schema.clone(), json!(3)), "{dialect}");
    }
}
