//! Object keywords.
//!
//! The applicators (`properties`, `patternProperties`,
//! `additionalProperties`, `unevaluatedProperties`) annotate with the names
//! of the properties they applied to. `additionalProperties` reads the first
//! two from its siblings; `unevaluatedProperties` reads all four from its
//! siblings and from every valid results node at the same instance location.
//!
//! All handlers skip non-object instances.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use jsev_core::{Dialect, EvaluationError};
use serde_json::{Map, Value};

use super::{
    is_schema, non_negative_integer, require_schema, schema_map, sibling_annotation,
    string_array, visible_annotations, Keyword, KeywordEvaluation,
};
use crate::context::EvaluationContext;
use crate::results::EvaluationResults;

pub fn handlers() -> Vec<Arc<dyn Keyword>> {
    vec![
        Arc::new(Properties),
        Arc::new(PatternProperties),
        Arc::new(AdditionalProperties),
        Arc::new(PropertyNames),
        Arc::new(UnevaluatedProperties),
        Arc::new(Required),
        Arc::new(DependentRequired),
        Arc::new(DependentSchemas),
        Arc::new(Dependencies),
        Arc::new(MinProperties),
        Arc::new(MaxProperties),
    ]
}

/// Names as a JSON array annotation.
fn name_list<'n>(names: impl IntoIterator<Item = &'n str>) -> Value {
    Value::Array(names.into_iter().map(|n| Value::String(n.to_string())).collect())
}

/// Property names carried by annotation arrays.
fn annotated_names<'v>(annotations: impl IntoIterator<Item = &'v Value>) -> HashSet<&'v str> {
    annotations
        .into_iter()
        .filter_map(Value::as_array)
        .flatten()
        .filter_map(Value::as_str)
        .collect()
}

fn failed_names(children: &[EvaluationResults]) -> String {
    let names: Vec<String> = children
        .iter()
        .filter(|c| !c.valid)
        .filter_map(|c| c.instance_location.last().map(|s| format!("'{s}'")))
        .collect();
    names.join(", ")
}

/// Applicator result over per-property children.
fn applied(keyword: &str, names: Value, children: Vec<EvaluationResults>) -> KeywordEvaluation {
    let valid = children.iter().all(|c| c.valid);
    KeywordEvaluation::assert(keyword, valid, || {
        format!("invalid properties: {}", failed_names(&children))
    })
    .with_annotation(names)
    .with_children(children)
}

fn missing_names<'v>(object: &Map<String, Value>, required: &[&'v str]) -> Vec<&'v str> {
    required
        .iter()
        .copied()
        .filter(|name| !object.contains_key(*name))
        .collect()
}

// ---------------------------------------------------------------------------
// Applicators
// ---------------------------------------------------------------------------

/// `properties`.
#[derive(Debug)]
pub struct Properties;

impl Keyword for Properties {
    fn name(&self) -> &str {
        "properties"
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        _evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        let schemas = schema_map(ctx, value)?;
        let Value::Object(instance) = ctx.instance() else {
            return Ok(KeywordEvaluation::skip(self.name()));
        };
        let mut names = Vec::new();
        let mut children = Vec::new();
        for (name, schema) in schemas {
            if let Some(member) = instance.get(name) {
                let child = ctx
                    .with_schema_path(name.as_str())
                    .with_instance(member, name.as_str())
                    .evaluate(schema)?;
                names.push(name.as_str());
                children.push(child);
            }
        }
        Ok(applied(self.name(), name_list(names), children))
    }
}

/// `patternProperties`.
#[derive(Debug)]
pub struct PatternProperties;

impl Keyword for PatternProperties {
    fn name(&self) -> &str {
        "patternProperties"
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        _evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        let schemas = schema_map(ctx, value)?;
        let Value::Object(instance) = ctx.instance() else {
            return Ok(KeywordEvaluation::skip(self.name()));
        };
        let mut names = BTreeSet::new();
        let mut children = Vec::new();
        for (pattern, schema) in schemas {
            let regex = ctx.pattern(pattern)?;
            for (name, member) in instance {
                if !ctx.pattern_matches(&regex, name)? {
                    continue;
                }
                let child = ctx
                    .with_schema_path(pattern.as_str())
                    .with_instance(member, name.as_str())
                    .evaluate(schema)?;
                names.insert(name.as_str());
                children.push(child);
            }
        }
        Ok(applied(self.name(), name_list(names), children))
    }
}

/// `additionalProperties`.
#[derive(Debug)]
pub struct AdditionalProperties;

impl Keyword for AdditionalProperties {
    fn name(&self) -> &str {
        "additionalProperties"
    }

    fn dependencies(&self) -> &'static [&'static str] {
        &["properties", "patternProperties"]
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        require_schema(ctx, value)?;
        let Value::Object(instance) = ctx.instance() else {
            return Ok(KeywordEvaluation::skip(self.name()));
        };
        let covered = annotated_names(
            ["properties", "patternProperties"]
                .into_iter()
                .filter_map(|k| sibling_annotation(evaluated, k)),
        );
        let mut names = Vec::new();
        let mut children = Vec::new();
        for (name, member) in instance.iter().filter(|(n, _)| !covered.contains(n.as_str())) {
            children.push(ctx.with_instance(member, name.as_str()).evaluate(value)?);
            names.push(name.as_str());
        }
        Ok(applied(self.name(), name_list(names), children))
    }
}

/// `propertyNames`. Each key is evaluated as a string instance.
#[derive(Debug)]
pub struct PropertyNames;

impl Keyword for PropertyNames {
    fn name(&self) -> &str {
        "propertyNames"
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        _evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        require_schema(ctx, value)?;
        let Value::Object(instance) = ctx.instance() else {
            return Ok(KeywordEvaluation::skip(self.name()));
        };
        let mut children = Vec::with_capacity(instance.len());
        for name in instance.keys() {
            let key = Value::String(name.clone());
            children.push(ctx.with_instance(&key, name.as_str()).evaluate(value)?);
        }
        let valid = children.iter().all(|c| c.valid);
        Ok(KeywordEvaluation::assert(self.name(), valid, || {
            format!("invalid property names: {}", failed_names(&children))
        })
        .with_children(children))
    }
}

/// `unevaluatedProperties` (2019-09+).
#[derive(Debug)]
pub struct UnevaluatedProperties;

impl Keyword for UnevaluatedProperties {
    fn name(&self) -> &str {
        "unevaluatedProperties"
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
        let Value::Object(instance) = ctx.instance() else {
            return Ok(KeywordEvaluation::skip(self.name()));
        };
        let seen = visible_annotations(
            evaluated,
            ctx.instance_location(),
            &[
                "properties",
                "patternProperties",
                "additionalProperties",
                "unevaluatedProperties",
            ],
        );
        let covered = annotated_names(seen);
        let mut names = Vec::new();
        let mut children = Vec::new();
        for (name, member) in instance.iter().filter(|(n, _)| !covered.contains(n.as_str())) {
            children.push(ctx.with_instance(member, name.as_str()).evaluate(value)?);
            names.push(name.as_str());
        }
        Ok(applied(self.name(), name_list(names), children))
    }
}

// ---------------------------------------------------------------------------
// Dependencies
// ---------------------------------------------------------------------------

/// `required`.
#[derive(Debug)]
pub struct Required;

impl Keyword for Required {
    fn name(&self) -> &str {
        "required"
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        _evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        let required = string_array(ctx, value)?;
        let Value::Object(instance) = ctx.instance() else {
            return Ok(KeywordEvaluation::skip(self.name()));
        };
        let missing = missing_names(instance, &required);
        Ok(KeywordEvaluation::assert(self.name(), missing.is_empty(), || {
            format!("missing required properties: {}", missing.join(", "))
        }))
    }
}

/// `dependentRequired` (2019-09+).
#[derive(Debug)]
pub struct DependentRequired;

impl Keyword for DependentRequired {
    fn name(&self) -> &str {
        "dependentRequired"
    }

    fn supports(&self, dialect: Dialect) -> bool {
        dialect >= Dialect::Draft201909
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        _evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        let Value::Object(dependencies) = value else {
            return Err(ctx.malformed("must be an object of string arrays"));
        };
        let dependencies = dependencies
            .iter()
            .map(|(name, required)| Ok((name.as_str(), string_array(ctx, required)?)))
            .collect::<Result<Vec<_>, EvaluationError>>()?;
        let Value::Object(instance) = ctx.instance() else {
            return Ok(KeywordEvaluation::skip(self.name()));
        };
        let problems: Vec<String> = dependencies
            .iter()
            .filter(|(name, _)| instance.contains_key(*name))
            .filter_map(|(name, required)| {
                let missing = missing_names(instance, required);
                (!missing.is_empty())
                    .then(|| format!("'{name}' requires {}", missing.join(", ")))
            })
            .collect();
        Ok(KeywordEvaluation::assert(self.name(), problems.is_empty(), || {
            problems.join("; ")
        }))
    }
}

/// `dependentSchemas` (2019-09+).
#[derive(Debug)]
pub struct DependentSchemas;

impl Keyword for DependentSchemas {
    fn name(&self) -> &str {
        "dependentSchemas"
    }

    fn supports(&self, dialect: Dialect) -> bool {
        dialect >= Dialect::Draft201909
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        _evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        let schemas = schema_map(ctx, value)?;
        let Value::Object(instance) = ctx.instance() else {
            return Ok(KeywordEvaluation::skip(self.name()));
        };
        let mut children = Vec::new();
        for (name, schema) in schemas.iter().filter(|(n, _)| instance.contains_key(*n)) {
            children.push(ctx.with_schema_path(name.as_str()).evaluate(schema)?);
        }
        let valid = children.iter().all(|c| c.valid);
        Ok(KeywordEvaluation::assert(self.name(), valid, || {
            "a dependent schema did not match".to_string()
        })
        .with_children(children))
    }
}

/// `dependencies` (draft-06 and draft-07): each value is either a list of
/// required names or a schema.
#[derive(Debug)]
pub struct Dependencies;

impl Keyword for Dependencies {
    fn name(&self) -> &str {
        "dependencies"
    }

    fn supports(&self, dialect: Dialect) -> bool {
        dialect <= Dialect::Draft7
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        _evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        let Value::Object(dependencies) = value else {
            return Err(ctx.malformed("must be an object"));
        };
        if !dependencies
            .values()
            .all(|d| is_schema(d) || d.as_array().is_some_and(|a| a.iter().all(Value::is_string)))
        {
            return Err(ctx.malformed("values must be schemas or arrays of strings"));
        }
        let Value::Object(instance) = ctx.instance() else {
            return Ok(KeywordEvaluation::skip(self.name()));
        };

        let mut problems = Vec::new();
        let mut children = Vec::new();
        for (name, dependency) in dependencies.iter().filter(|(n, _)| instance.contains_key(*n)) {
            if is_schema(dependency) {
                let child = ctx.with_schema_path(name.as_str()).evaluate(dependency)?;
                if !child.valid {
                    problems.push(format!("'{name}' dependent schema did not match"));
                }
                children.push(child);
            } else {
                let required = string_array(ctx, dependency)?;
                let missing = missing_names(instance, &required);
                if !missing.is_empty() {
                    problems.push(format!("'{name}' requires {}", missing.join(", ")));
                }
            }
        }
        Ok(KeywordEvaluation::assert(self.name(), problems.is_empty(), || {
            problems.join("; ")
        })
        .with_children(children))
    }
}

// ---------------------------------------------------------------------------
// Size
// ---------------------------------------------------------------------------

/// `minProperties`.
#[derive(Debug)]
pub struct MinProperties;

impl Keyword for MinProperties {
    fn name(&self) -> &str {
        "minProperties"
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        _evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        let limit = non_negative_integer(ctx, value)?;
        let Value::Object(instance) = ctx.instance() else {
            return Ok(KeywordEvaluation::skip(self.name()));
        };
        let count = instance.len() as u64;
        Ok(KeywordEvaluation::assert(self.name(), count >= limit, || {
            format!("{count} properties, fewer than the minimum of {limit}")
        }))
    }
}

/// `maxProperties`.
#[derive(Debug)]
pub struct MaxProperties;

impl Keyword for MaxProperties {
    fn name(&self) -> &str {
        "maxProperties"
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        _evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        let limit = non_negative_integer(ctx, value)?;
        let Value::Object(instance) = ctx.instance() else {
            return Ok(KeywordEvaluation::skip(self.name()));
        };
        let count = instance.len() as u64;
        Ok(KeywordEvaluation::assert(self.name(), count <= limit, || {
            format!("{count} properties, more than the maximum of {limit}")
        }))
    }
}
