//! Pure annotation keywords. Always valid; the annotation is the keyword's
//! raw value.
//!
//! `contentSchema` is not applied to decoded content: content assertion is
//! off by default in every supported dialect.

use std::sync::Arc;

use jsev_core::{Dialect, EvaluationError};
use serde_json::Value;

use super::{is_schema, Keyword, KeywordEvaluation};
use crate::context::EvaluationContext;

pub fn handlers() -> Vec<Arc<dyn Keyword>> {
    [
        ("title", Shape::String, Dialect::Draft6),
        ("description", Shape::String, Dialect::Draft6),
        ("default", Shape::Any, Dialect::Draft6),
        ("examples", Shape::Array, Dialect::Draft6),
        ("deprecated", Shape::Boolean, Dialect::Draft201909),
        ("readOnly", Shape::Boolean, Dialect::Draft7),
        ("writeOnly", Shape::Boolean, Dialect::Draft7),
        ("contentEncoding", Shape::String, Dialect::Draft7),
        ("contentMediaType", Shape::String, Dialect::Draft7),
        ("contentSchema", Shape::Schema, Dialect::Draft201909),
    ]
    .into_iter()
    .map(|(name, shape, since)| Arc::new(Annotation { name, shape, since }) as Arc<dyn Keyword>)
    .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Any,
    String,
    Array,
    Boolean,
    Schema,
}

impl Shape {
    fn admits(self, value: &Value) -> bool {
        match self {
            Self::Any => true,
            Self::String => value.is_string(),
            Self::Array => value.is_array(),
            Self::Boolean => value.is_boolean(),
            Self::Schema => is_schema(value),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::Any => "any value",
            Self::String => "a string",
            Self::Array => "an array",
            Self::Boolean => "a boolean",
            Self::Schema => "a schema (object or boolean)",
        }
    }
}

/// An annotation-only keyword.
#[derive(Debug)]
pub struct Annotation {
    name: &'static str,
    shape: Shape,
    since: Dialect,
}

impl Keyword for Annotation {
    fn name(&self) -> &str {
        self.name
    }

    fn supports(&self, dialect: Dialect) -> bool {
        dialect >= self.since
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        _evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        if !self.shape.admits(value) {
            return Err(ctx.malformed(format!("must be {}", self.shape.describe())));
        }
        Ok(KeywordEvaluation::annotate(self.name, value.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_gates() {
        let handlers = handlers();
        let get = |name: &str| handlers.iter().find(|h| h.name() == name).unwrap().clone();
        assert!(get("title").supports(Dialect::Draft6));
        assert!(!get("deprecated").supports(Dialect::Draft7));
        assert!(!get("readOnly").supports(Dialect::Draft6));
        assert!(get("contentSchema").supports(Dialect::Draft202012));
    }
}
