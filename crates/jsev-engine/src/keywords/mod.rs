//! # Keyword Handlers
//!
//! Every schema keyword the engine understands is a type implementing
//! [`Keyword`]. A handler is a pure function of three inputs:
//!
//! 1. the keyword's value in the schema,
//! 2. an [`EvaluationContext`] positioned at the keyword,
//! 3. the [`KeywordEvaluation`]s its siblings in the same schema object have
//!    already produced.
//!
//! It returns a [`KeywordEvaluation`]: validity, an optional annotation, an
//! optional failure message, and the results nodes of any subschemas it
//! applied.
//!
//! ## Ordering
//!
//! A handler that reads a sibling's annotation declares that sibling in
//! [`Keyword::dependencies`]. The keyword registry turns those declarations
//! into priority tiers, so by the time `additionalProperties` runs, the
//! `properties` evaluation is already in the sibling slice.
//!
//! ## Handler Families
//!
//! | Module | Keywords |
//! |--------|----------|
//! | [`structural`] | `$schema`, `$id`, `$anchor`, `$dynamicAnchor`, `$recursiveAnchor`, `$vocabulary`, `$comment`, `$defs`, `definitions` |
//! | [`reference`] | `$ref`, `$dynamicRef`, `$recursiveRef` |
//! | [`logic`] | `allOf`, `anyOf`, `oneOf`, `not`, `if`, `then`, `else` |
//! | [`object`] | `properties`, `patternProperties`, `additionalProperties`, `propertyNames`, `unevaluatedProperties`, `required`, `dependentRequired`, `dependentSchemas`, `dependencies`, `minProperties`, `maxProperties` |
//! | [`array`] | `prefixItems`, `items`, `additionalItems`, `contains`, `minContains`, `maxContains`, `unevaluatedItems`, `minItems`, `maxItems`, `uniqueItems` |
//! | [`numeric`] | `multipleOf`, `maximum`, `exclusiveMaximum`, `minimum`, `exclusiveMinimum` |
//! | [`string`] | `minLength`, `maxLength`, `pattern` |
//! | [`generic`] | `type`, `enum`, `const` |
//! | [`metadata`] | `title`, `description`, `default`, `examples`, `deprecated`, `readOnly`, `writeOnly`, `contentEncoding`, `contentMediaType`, `contentSchema` |
//! | [`format`] | `format` (annotation and assertion variants) |

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, OnceLock};

use jsev_core::{Dialect, EvaluationError, JsonPointer};
use serde_json::Value;

use crate::context::EvaluationContext;
use crate::results::EvaluationResults;

pub mod array;
pub mod format;
pub mod generic;
pub mod logic;
pub mod metadata;
pub mod numeric;
pub mod object;
pub mod reference;
pub mod string;
pub mod structural;

/// Keyword name → handler, as selected by a vocabulary set.
pub type HandlerSet = HashMap<String, Arc<dyn Keyword>>;

/// A keyword handler.
pub trait Keyword: Send + Sync + fmt::Debug {
    /// The keyword this handler evaluates.
    fn name(&self) -> &str;

    /// Sibling keywords whose evaluations this handler reads.
    fn dependencies(&self) -> &'static [&'static str] {
        &[]
    }

    /// Whether the keyword exists in `dialect`. Outside its dialects a
    /// keyword is treated as unknown.
    fn supports(&self, _dialect: Dialect) -> bool {
        true
    }

    /// Evaluate the keyword.
    ///
    /// # Errors
    ///
    /// Only the three fatal conditions of [`EvaluationError`]. A failing
    /// constraint is `Ok` with `valid: false`.
    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError>;
}

// ---------------------------------------------------------------------------
// KeywordEvaluation
// ---------------------------------------------------------------------------

/// Outcome of evaluating one keyword.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordEvaluation {
    /// The keyword that produced this evaluation.
    pub keyword: String,
    /// Whether the keyword's constraint holds.
    pub valid: bool,
    /// Annotation value, if the keyword produced one.
    pub annotation: Option<Value>,
    /// Failure message, set only when `valid` is false.
    pub error: Option<String>,
    /// Results of subschemas the keyword applied.
    pub children: Vec<EvaluationResults>,
}

impl KeywordEvaluation {
    /// Valid, no annotation. Used when a keyword's type guard does not match.
    pub fn skip(keyword: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            valid: true,
            annotation: None,
            error: None,
            children: Vec::new(),
        }
    }

    /// Valid, annotated with `value`.
    pub fn annotate(keyword: &str, value: Value) -> Self {
        Self {
            annotation: Some(value),
            ..Self::skip(keyword)
        }
    }

    /// A plain assertion. `message` is only called on failure.
    pub fn assert(keyword: &str, valid: bool, message: impl FnOnce() -> String) -> Self {
        Self {
            valid,
            error: (!valid).then(message),
            ..Self::skip(keyword)
        }
    }

    /// Attach subschema results.
    pub fn with_children(mut self, children: Vec<EvaluationResults>) -> Self {
        self.children = children;
        self
    }

    /// Attach an annotation.
    pub fn with_annotation(mut self, annotation: Value) -> Self {
        self.annotation = Some(annotation);
        self
    }

    /// True if an annotation is present.
    pub fn has_annotation(&self) -> bool {
        self.annotation.is_some()
    }
}

/// The evaluation a sibling keyword produced, if it ran.
pub fn sibling_evaluation<'e>(
    evaluated: &'e [KeywordEvaluation],
    keyword: &str,
) -> Option<&'e KeywordEvaluation> {
    evaluated.iter().find(|e| e.keyword == keyword)
}

/// The annotation a sibling keyword produced, if any.
pub fn sibling_annotation<'e>(evaluated: &'e [KeywordEvaluation], keyword: &str) -> Option<&'e Value> {
    sibling_evaluation(evaluated, keyword).and_then(|e| e.annotation.as_ref())
}

/// Annotations of `keywords` that apply at `location`: those produced by
/// siblings, plus those recorded on every valid results node below the
/// siblings that still sits at `location`.
///
/// A node that failed contributes nothing, and neither does anything below
/// it; nodes at other instance locations describe other instances.
pub(crate) fn visible_annotations<'e>(
    evaluated: &'e [KeywordEvaluation],
    location: &JsonPointer,
    keywords: &[&str],
) -> Vec<&'e Value> {
    fn scan<'e>(
        node: &'e EvaluationResults,
        location: &JsonPointer,
        keywords: &[&str],
        out: &mut Vec<&'e Value>,
    ) {
        if !node.valid || node.instance_location != *location {
            return;
        }
        out.extend(keywords.iter().filter_map(|k| node.annotations.get(*k)));
        for child in &node.details {
            scan(child, location, keywords, out);
        }
    }

    let mut out: Vec<&'e Value> = evaluated
        .iter()
        .filter(|e| keywords.contains(&e.keyword.as_str()))
        .filter_map(|e| e.annotation.as_ref())
        .collect();
    for child in evaluated.iter().flat_map(|e| e.children.iter()) {
        scan(child, location, keywords, &mut out);
    }
    out
}

// ---------------------------------------------------------------------------
// Shape helpers
// ---------------------------------------------------------------------------

/// The keyword value as a non-negative integer (`2.0` qualifies).
pub(crate) fn non_negative_integer(
    ctx: &EvaluationContext<'_>,
    value: &Value,
) -> Result<u64, EvaluationError> {
    let n = value.as_number().filter(|n| jsev_core::number::is_integer(n));
    match n.and_then(|n| n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))) {
        Some(v) => Ok(v),
        None => Err(ctx.malformed("must be a non-negative integer")),
    }
}

/// The keyword value as an array of subschemas.
pub(crate) fn schema_array<'a>(
    ctx: &EvaluationContext<'_>,
    value: &'a Value,
) -> Result<&'a Vec<Value>, EvaluationError> {
    match value {
        Value::Array(items) if !items.is_empty() && items.iter().all(is_schema) => Ok(items),
        _ => Err(ctx.malformed("must be a non-empty array of schemas")),
    }
}

/// The keyword value as an object whose members are subschemas.
pub(crate) fn schema_map<'a>(
    ctx: &EvaluationContext<'_>,
    value: &'a Value,
) -> Result<&'a serde_json::Map<String, Value>, EvaluationError> {
    match value {
        Value::Object(map) if map.values().all(is_schema) => Ok(map),
        _ => Err(ctx.malformed("must be an object of schemas")),
    }
}

/// Reject keyword values that are not schemas.
pub(crate) fn require_schema(ctx: &EvaluationContext<'_>, value: &Value) -> Result<(), EvaluationError> {
    if is_schema(value) {
        Ok(())
    } else {
        Err(ctx.malformed("must be a schema (object or boolean)"))
    }
}

/// The keyword value as an array of unique strings.
pub(crate) fn string_array<'a>(
    ctx: &EvaluationContext<'_>,
    value: &'a Value,
) -> Result<Vec<&'a str>, EvaluationError> {
    let Value::Array(items) = value else {
        return Err(ctx.malformed("must be an array of strings"));
    };
    items
        .iter()
        .map(|item| item.as_str().ok_or_else(|| ctx.malformed("must be an array of strings")))
        .collect()
}

pub(crate) fn is_schema(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Bool(_))
}

/// Human-readable JSON kind of an instance.
pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if jsev_core::number::is_integer(n) => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Built-in population
// ---------------------------------------------------------------------------

/// Every built-in handler, in registration order.
///
/// `format` appears once, as the annotation variant; the assertion variant
/// is only reachable through the format-assertion vocabulary.
pub fn builtin() -> Vec<Arc<dyn Keyword>> {
    let mut handlers: Vec<Arc<dyn Keyword>> = Vec::new();
    handlers.extend(structural::handlers());
    handlers.extend(reference::handlers());
    handlers.extend(logic::handlers());
    handlers.extend(object::handlers());
    handlers.extend(array::handlers());
    handlers.extend(numeric::handlers());
    handlers.extend(string::handlers());
    handlers.extend(generic::handlers());
    handlers.extend(metadata::handlers());
    handlers.push(Arc::new(format::Format));
    handlers
}

/// True if `name` is one of the built-in keywords.
pub fn is_builtin(name: &str) -> bool {
    static NAMES: OnceLock<HashSet<String>> = OnceLock::new();
    NAMES
        .get_or_init(|| builtin().iter().map(|h| h.name().to_string()).collect())
        .contains(name)
}
