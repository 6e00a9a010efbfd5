//! Assertions that apply to every instance kind: `type`, `enum`, `const`.
//!
//! Equality is structural JSON equality, so `1` equals `1.0` and object
//! member order never matters.

use std::sync::Arc;

use jsev_core::{json_equal, EvaluationError};
use serde_json::Value;

use super::{kind_of, Keyword, KeywordEvaluation};
use crate::context::EvaluationContext;

pub fn handlers() -> Vec<Arc<dyn Keyword>> {
    vec![Arc::new(Type), Arc::new(Enum), Arc::new(Const)]
}

const TYPE_NAMES: &[&str] = &[
    "null", "boolean", "object", "array", "number", "string", "integer",
];

/// True if `instance` is of the named primitive type. `number` includes
/// integers; `integer` includes floats with a zero fractional part.
fn is_type(instance: &Value, name: &str) -> bool {
    let kind = kind_of(instance);
    kind == name || (name == "number" && kind == "integer")
}

/// `type`.
#[derive(Debug)]
pub struct Type;

impl Keyword for Type {
    fn name(&self) -> &str {
        "type"
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        _evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        let allowed: Vec<&str> = match value {
            Value::String(name) => vec![name.as_str()],
            Value::Array(names) => names
                .iter()
                .map(|n| n.as_str().ok_or_else(|| ctx.malformed("must contain only type names")))
                .collect::<Result<_, _>>()?,
            _ => return Err(ctx.malformed("must be a type name or an array of type names")),
        };
        if let Some(unknown) = allowed.iter().find(|n| !TYPE_NAMES.contains(*n)) {
            return Err(ctx.malformed(format!("unknown type {unknown:?}")));
        }
        let instance = ctx.instance();
        let valid = allowed.iter().any(|name| is_type(instance, name));
        Ok(KeywordEvaluation::assert(self.name(), valid, || {
            format!("expected {}, found {}", allowed.join(" or "), kind_of(instance))
        }))
    }
}

/// `enum`.
#[derive(Debug)]
pub struct Enum;

impl Keyword for Enum {
    fn name(&self) -> &str {
        "enum"
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        _evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        let Value::Array(options) = value else {
            return Err(ctx.malformed("must be an array"));
        };
        let instance = ctx.instance();
        let valid = options.iter().any(|option| json_equal(option, instance));
        Ok(KeywordEvaluation::assert(self.name(), valid, || {
            format!("{instance} is not one of the enumerated values")
        }))
    }
}

/// `const`.
#[derive(Debug)]
pub struct Const;

impl Keyword for Const {
    fn name(&self) -> &str {
        "const"
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        _evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        let instance = ctx.instance();
        Ok(KeywordEvaluation::assert(self.name(), json_equal(value, instance), || {
            format!("expected {value}, found {instance}")
        }))
    }
}
