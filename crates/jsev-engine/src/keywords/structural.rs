//! Core structural keywords.
//!
//! These shape the schema graph (identifiers, anchors, definitions) and are
//! consumed by the schema registry at registration time. During evaluation
//! they only check that their value has the right shape, and never produce
//! annotations.

use std::sync::Arc;

use jsev_core::{Dialect, EvaluationError};
use serde_json::Value;

use super::{schema_map, Keyword, KeywordEvaluation};
use crate::context::EvaluationContext;

pub fn handlers() -> Vec<Arc<dyn Keyword>> {
    vec![
        Arc::new(Schema),
        Arc::new(Id),
        Arc::new(Anchor),
        Arc::new(DynamicAnchor),
        Arc::new(RecursiveAnchor),
        Arc::new(Vocabulary),
        Arc::new(Comment),
        Arc::new(Defs),
        Arc::new(Definitions),
    ]
}

fn is_anchor_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// `$schema`. The dialect switch itself happens in the context before any
/// keyword runs.
#[derive(Debug)]
pub struct Schema;

impl Keyword for Schema {
    fn name(&self) -> &str {
        "$schema"
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        _evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        match value {
            Value::String(_) => Ok(KeywordEvaluation::skip(self.name())),
            _ => Err(ctx.malformed("must be a URI string")),
        }
    }
}

/// `$id`.
#[derive(Debug)]
pub struct Id;

impl Keyword for Id {
    fn name(&self) -> &str {
        "$id"
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        _evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        match value {
            Value::String(_) => Ok(KeywordEvaluation::skip(self.name())),
            _ => Err(ctx.malformed("must be a URI-reference string")),
        }
    }
}

/// `$anchor` (2019-09+).
#[derive(Debug)]
pub struct Anchor;

impl Keyword for Anchor {
    fn name(&self) -> &str {
        "$anchor"
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
        match value.as_str() {
            Some(name) if is_anchor_name(name) => Ok(KeywordEvaluation::skip(self.name())),
            _ => Err(ctx.malformed("must be a plain-name anchor")),
        }
    }
}

/// `$dynamicAnchor` (2020-12).
#[derive(Debug)]
pub struct DynamicAnchor;

impl Keyword for DynamicAnchor {
    fn name(&self) -> &str {
        "$dynamicAnchor"
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
        match value.as_str() {
            Some(name) if is_anchor_name(name) => Ok(KeywordEvaluation::skip(self.name())),
            _ => Err(ctx.malformed("must be a plain-name anchor")),
        }
    }
}

/// `$recursiveAnchor` (2019-09).
#[derive(Debug)]
pub struct RecursiveAnchor;

impl Keyword for RecursiveAnchor {
    fn name(&self) -> &str {
        "$recursiveAnchor"
    }

    fn supports(&self, dialect: Dialect) -> bool {
        dialect == Dialect::Draft201909
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        _evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        match value {
            Value::Bool(_) => Ok(KeywordEvaluation::skip(self.name())),
            _ => Err(ctx.malformed("must be a boolean")),
        }
    }
}

/// `$vocabulary` (2019-09+). Only meaningful in meta-schemas.
#[derive(Debug)]
pub struct Vocabulary;

impl Keyword for Vocabulary {
    fn name(&self) -> &str {
        "$vocabulary"
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
        match value {
            Value::Object(map) if map.values().all(Value::is_boolean) => {
                Ok(KeywordEvaluation::skip(self.name()))
            }
            _ => Err(ctx.malformed("must be an object of URI → boolean")),
        }
    }
}

/// `$comment`.
#[derive(Debug)]
pub struct Comment;

impl Keyword for Comment {
    fn name(&self) -> &str {
        "$comment"
    }

    fn supports(&self, dialect: Dialect) -> bool {
        dialect >= Dialect::Draft7
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        _evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        match value {
            Value::String(_) => Ok(KeywordEvaluation::skip(self.name())),
            _ => Err(ctx.malformed("must be a string")),
        }
    }
}

/// `$defs` (2019-09+).
#[derive(Debug)]
pub struct Defs;

impl Keyword for Defs {
    fn name(&self) -> &str {
        "$defs"
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
        schema_map(ctx, value)?;
        Ok(KeywordEvaluation::skip(self.name()))
    }
}

/// `definitions`, kept in every dialect for compatibility.
#[derive(Debug)]
pub struct Definitions;

impl Keyword for Definitions {
    fn name(&self) -> &str {
        "definitions"
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        _evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        schema_map(ctx, value)?;
        Ok(KeywordEvaluation::skip(self.name()))
    }
}
