//! Array keywords.
//!
//! ## Item Coverage Annotations
//!
//! | Keyword | Annotation |
//! |---------|------------|
//! | `prefixItems`, array-form `items` | largest index applied, or `true` if every item was covered |
//! | schema-form `items`, `additionalItems`, `unevaluatedItems` | `true` if applied to any item |
//! | `contains` (2019-09+) | indices of matching items |
//!
//! `unevaluatedItems` combines these from its siblings and from every valid
//! results node at the same instance location. `contains` indices count as
//! evaluated only under 2020-12.

use std::collections::HashSet;
use std::sync::Arc;

use jsev_core::{json_equal, Dialect, EvaluationError};
use serde_json::Value;

use super::{
    non_negative_integer, require_schema, schema_array, sibling_annotation, sibling_evaluation,
    visible_annotations, Keyword, KeywordEvaluation,
};
use crate::context::EvaluationContext;
use crate::results::EvaluationResults;

pub fn handlers() -> Vec<Arc<dyn Keyword>> {
    vec![
        Arc::new(PrefixItems),
        Arc::new(Items),
        Arc::new(AdditionalItems),
        Arc::new(Contains),
        Arc::new(MinContains),
        Arc::new(MaxContains),
        Arc::new(UnevaluatedItems),
        Arc::new(MinItems),
        Arc::new(MaxItems),
        Arc::new(UniqueItems),
    ]
}

/// First index not covered by an item-coverage annotation.
fn next_index(annotation: Option<&Value>, len: usize) -> usize {
    match annotation {
        Some(Value::Bool(true)) => len,
        Some(Value::Number(n)) => n.as_u64().map_or(0, |i| i as usize + 1),
        _ => 0,
    }
}

fn failed_indices(children: &[EvaluationResults]) -> String {
    let indices: Vec<String> = children
        .iter()
        .filter(|c| !c.valid)
        .filter_map(|c| c.instance_location.last().map(ToString::to_string))
        .collect();
    indices.join(", ")
}

fn item_result(
    keyword: &str,
    annotation: Option<Value>,
    children: Vec<EvaluationResults>,
) -> KeywordEvaluation {
    let valid = children.iter().all(|c| c.valid);
    let mut evaluation = KeywordEvaluation::assert(keyword, valid, || {
        format!("invalid items at indices: {}", failed_indices(&children))
    });
    evaluation.annotation = annotation;
    evaluation.with_children(children)
}

/// Evaluate `schemas[i]` against `items[i]` for every shared index.
fn evaluate_tuple<'a>(
    ctx: &EvaluationContext<'a>,
    schemas: &'a [Value],
    items: &'a [Value],
) -> Result<(Option<Value>, Vec<EvaluationResults>), EvaluationError> {
    let count = schemas.len().min(items.len());
    let mut children = Vec::with_capacity(count);
    for (i, (schema, item)) in schemas.iter().zip(items).enumerate() {
        children.push(ctx.with_schema_path(i).with_instance(item, i).evaluate(schema)?);
    }
    let annotation = if count == items.len() {
        Value::Bool(true)
    } else {
        Value::from(count - 1)
    };
    Ok((Some(annotation), children))
}

/// Evaluate `schema` against every item from `start` on.
fn evaluate_rest<'a>(
    ctx: &EvaluationContext<'a>,
    schema: &'a Value,
    items: &'a [Value],
    start: usize,
    skip: &HashSet<usize>,
) -> Result<(Option<Value>, Vec<EvaluationResults>), EvaluationError> {
    let mut children = Vec::new();
    for (i, item) in items.iter().enumerate().skip(start) {
        if skip.contains(&i) {
            continue;
        }
        children.push(ctx.with_instance(item, i).evaluate(schema)?);
    }
    let annotation = (!children.is_empty()).then_some(Value::Bool(true));
    Ok((annotation, children))
}

// ---------------------------------------------------------------------------
// Applicators
// ---------------------------------------------------------------------------

/// `prefixItems` (2020-12).
#[derive(Debug)]
pub struct PrefixItems;

impl Keyword for PrefixItems {
    fn name(&self) -> &str {
        "prefixItems"
    }

    fn supports(&self, dialect: Dialect) -> bool {
        dialect == Dialect::Draft202012
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        _evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        let schemas = schema_array(ctx, value)?;
        let Value::Array(items) = ctx.instance() else {
            return Ok(KeywordEvaluation::skip(self.name()));
        };
        let (annotation, children) = evaluate_tuple(ctx, schemas, items)?;
        Ok(item_result(self.name(), annotation, children))
    }
}

/// `items`. Under 2020-12 it must be a single schema and starts after
/// `prefixItems`; earlier dialects also accept the tuple (array) form.
#[derive(Debug)]
pub struct Items;

impl Keyword for Items {
    fn name(&self) -> &str {
        "items"
    }

    fn dependencies(&self) -> &'static [&'static str] {
        &["prefixItems"]
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        let modern = ctx.dialect() >= Dialect::Draft202012;
        if value.is_array() {
            if modern {
                return Err(ctx.malformed("must be a schema; use prefixItems for tuples"));
            }
            let schemas = schema_array(ctx, value)?;
            let Value::Array(items) = ctx.instance() else {
                return Ok(KeywordEvaluation::skip(self.name()));
            };
            let (annotation, children) = evaluate_tuple(ctx, schemas, items)?;
            return Ok(item_result(self.name(), annotation, children));
        }

        require_schema(ctx, value)?;
        let Value::Array(items) = ctx.instance() else {
            return Ok(KeywordEvaluation::skip(self.name()));
        };
        let start = if modern {
            next_index(sibling_annotation(evaluated, "prefixItems"), items.len())
        } else {
            0
        };
        let (annotation, children) = evaluate_rest(ctx, value, items, start, &HashSet::new())?;
        Ok(item_result(self.name(), annotation, children))
    }
}

/// `additionalItems` (before 2020-12). Only acts alongside array-form
/// `items`.
#[derive(Debug)]
pub struct AdditionalItems;

impl Keyword for AdditionalItems {
    fn name(&self) -> &str {
        "additionalItems"
    }

    fn dependencies(&self) -> &'static [&'static str] {
        &["items"]
    }

    fn supports(&self, dialect: Dialect) -> bool {
        dialect < Dialect::Draft202012
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        require_schema(ctx, value)?;
        let tuple = ctx.sibling("items").is_some_and(Value::is_array);
        let (true, Value::Array(items)) = (tuple, ctx.instance()) else {
            return Ok(KeywordEvaluation::skip(self.name()));
        };
        let start = next_index(sibling_annotation(evaluated, "items"), items.len());
        let (annotation, children) = evaluate_rest(ctx, value, items, start, &HashSet::new())?;
        Ok(item_result(self.name(), annotation, children))
    }
}

/// `contains`. Validity is "at least one match" unless a sibling
/// `minContains` takes over the count check.
#[derive(Debug)]
pub struct Contains;

impl Keyword for Contains {
    fn name(&self) -> &str {
        "contains"
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        _evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        require_schema(ctx, value)?;
        let Value::Array(items) = ctx.instance() else {
            return Ok(KeywordEvaluation::skip(self.name()));
        };
        let mut matched = Vec::new();
        let mut children = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let child = ctx.with_instance(item, i).evaluate(value)?;
            if child.valid {
                matched.push(Value::from(i));
            }
            children.push(child);
        }

        let counted = ctx.dialect() >= Dialect::Draft201909;
        let deferred = counted && ctx.sibling("minContains").is_some();
        let valid = deferred || !matched.is_empty();
        let mut evaluation = KeywordEvaluation::assert(self.name(), valid, || {
            "no item matches the contains schema".to_string()
        })
        .with_children(children);
        if counted {
            evaluation = evaluation.with_annotation(Value::Array(matched));
        }
        Ok(evaluation)
    }
}

/// Matches recorded by the sibling `contains`, if it ran on an array.
fn contains_count(evaluated: &[KeywordEvaluation]) -> Option<u64> {
    sibling_evaluation(evaluated, "contains")
        .and_then(|e| e.annotation.as_ref())
        .and_then(Value::as_array)
        .map(|matched| matched.len() as u64)
}

/// `minContains` (2019-09+).
#[derive(Debug)]
pub struct MinContains;

impl Keyword for MinContains {
    fn name(&self) -> &str {
        "minContains"
    }

    fn dependencies(&self) -> &'static [&'static str] {
        &["contains"]
    }

    fn supports(&self, dialect: Dialect) -> bool {
        dialect >= Dialect::Draft201909
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        let limit = non_negative_integer(ctx, value)?;
        let Some(count) = contains_count(evaluated) else {
            return Ok(KeywordEvaluation::skip(self.name()));
        };
        Ok(KeywordEvaluation::assert(self.name(), count >= limit, || {
            format!("{count} items match contains, fewer than the minimum of {limit}")
        }))
    }
}

/// `maxContains` (2019-09+).
#[derive(Debug)]
pub struct MaxContains;

impl Keyword for MaxContains {
    fn name(&self) -> &str {
        "maxContains"
    }

    fn dependencies(&self) -> &'static [&'static str] {
        &["contains"]
    }

    fn supports(&self, dialect: Dialect) -> bool {
        dialect >= Dialect::Draft201909
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        let limit = non_negative_integer(ctx, value)?;
        let Some(count) = contains_count(evaluated) else {
            return Ok(KeywordEvaluation::skip(self.name()));
        };
        Ok(KeywordEvaluation::assert(self.name(), count <= limit, || {
            format!("{count} items match contains, more than the maximum of {limit}")
        }))
    }
}

/// `unevaluatedItems` (2019-09+).
#[derive(Debug)]
pub struct UnevaluatedItems;

impl Keyword for UnevaluatedItems {
    fn name(&self) -> &str {
        "unevaluatedItems"
    }

    fn supports(&self, dialect: Dialect) -> bool {
        dialect >= Dialect::Draft201909
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        require_schema(ctx, value)?;
        let Value::Array(items) = ctx.instance() else {
            return Ok(KeywordEvaluation::skip(self.name()));
        };
        let location = ctx.instance_location();
        let start = visible_annotations(
            evaluated,
            location,
            &["prefixItems", "items", "additionalItems", "unevaluatedItems"],
        )
        .into_iter()
        .map(|annotation| next_index(Some(annotation), items.len()))
        .max()
        .unwrap_or(0);

        let mut matched = HashSet::new();
        if ctx.dialect() >= Dialect::Draft202012 {
            matched.extend(
                visible_annotations(evaluated, location, &["contains"])
                    .into_iter()
                    .filter_map(Value::as_array)
                    .flatten()
                    .filter_map(Value::as_u64)
                    .map(|i| i as usize),
            );
        }
        let (annotation, children) = evaluate_rest(ctx, value, items, start, &matched)?;
        Ok(item_result(self.name(), annotation, children))
    }
}

// ---------------------------------------------------------------------------
// Assertions
// ---------------------------------------------------------------------------

/// `minItems`.
#[derive(Debug)]
pub struct MinItems;

impl Keyword for MinItems {
    fn name(&self) -> &str {
        "minItems"
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        _evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        let limit = non_negative_integer(ctx, value)?;
        let Value::Array(items) = ctx.instance() else {
            return Ok(KeywordEvaluation::skip(self.name()));
        };
        let count = items.len() as u64;
        Ok(KeywordEvaluation::assert(self.name(), count >= limit, || {
            format!("{count} items, fewer than the minimum of {limit}")
        }))
    }
}

/// `maxItems`.
#[derive(Debug)]
pub struct MaxItems;

impl Keyword for MaxItems {
    fn name(&self) -> &str {
        "maxItems"
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        _evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        let limit = non_negative_integer(ctx, value)?;
        let Value::Array(items) = ctx.instance() else {
            return Ok(KeywordEvaluation::skip(self.name()));
        };
        let count = items.len() as u64;
        Ok(KeywordEvaluation::assert(self.name(), count <= limit, || {
            format!("{count} items, more than the maximum of {limit}")
        }))
    }
}

/// `uniqueItems`.
#[derive(Debug)]
pub struct UniqueItems;

impl Keyword for UniqueItems {
    fn name(&self) -> &str {
        "uniqueItems"
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        _evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        let Some(unique) = value.as_bool() else {
            return Err(ctx.malformed("must be a boolean"));
        };
        let (true, Value::Array(items)) = (unique, ctx.instance()) else {
            return Ok(KeywordEvaluation::skip(self.name()));
        };
        let duplicate = items.iter().enumerate().find_map(|(i, a)| {
            items[i + 1..]
                .iter()
                .position(|b| json_equal(a, b))
                .map(|offset| (i, i + 1 + offset))
        });
        Ok(KeywordEvaluation::assert(self.name(), duplicate.is_none(), || {
            let (first, second) = duplicate.unwrap_or_default();
            format!("items at indices {first} and {second} are equal")
        }))
    }
}
