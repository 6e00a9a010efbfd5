//! String assertions. All skip non-string instances.
//!
//! Lengths count Unicode scalar values, not bytes or UTF-16 units.

use std::sync::Arc;

use jsev_core::EvaluationError;
use serde_json::Value;

use super::{non_negative_integer, Keyword, KeywordEvaluation};
use crate::context::EvaluationContext;

pub fn handlers() -> Vec<Arc<dyn Keyword>> {
    vec![Arc::new(MinLength), Arc::new(MaxLength), Arc::new(Pattern)]
}

/// `minLength`.
#[derive(Debug)]
pub struct MinLength;

impl Keyword for MinLength {
    fn name(&self) -> &str {
        "minLength"
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        _evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        let limit = non_negative_integer(ctx, value)?;
        let Value::String(s) = ctx.instance() else {
            return Ok(KeywordEvaluation::skip(self.name()));
        };
        let length = s.chars().count() as u64;
        Ok(KeywordEvaluation::assert(self.name(), length >= limit, || {
            format!("length {length} is shorter than {limit}")
        }))
    }
}

/// `maxLength`.
#[derive(Debug)]
pub struct MaxLength;

impl Keyword for MaxLength {
    fn name(&self) -> &str {
        "maxLength"
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        _evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        let limit = non_negative_integer(ctx, value)?;
        let Value::String(s) = ctx.instance() else {
            return Ok(KeywordEvaluation::skip(self.name()));
        };
        let length = s.chars().count() as u64;
        Ok(KeywordEvaluation::assert(self.name(), length <= limit, || {
            format!("length {length} is longer than {limit}")
        }))
    }
}

/// `pattern`. Unanchored search, as with ECMA-262 `RegExp.test`.
#[derive(Debug)]
pub struct Pattern;

impl Keyword for Pattern {
    fn name(&self) -> &str {
        "pattern"
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        _evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        let Some(source) = value.as_str() else {
            return Err(ctx.malformed("must be a regular expression string"));
        };
        let regex = ctx.pattern(source)?;
        let Value::String(s) = ctx.instance() else {
            return Ok(KeywordEvaluation::skip(self.name()));
        };
        let matched = ctx.pattern_matches(&regex, s)?;
        Ok(KeywordEvaluation::assert(self.name(), matched, || {
            format!("{s:?} does not match pattern {source:?}")
        }))
    }
}
