//! Reference keywords: `$ref`, `$dynamicRef`, `$recursiveRef`.
//!
//! Each resolves its target and evaluates it against the current instance.
//! The target's own resource URI becomes the pending base for that
//! evaluation, so relative references inside the target resolve against the
//! resource they were written in. An unresolvable target is fatal.

use std::sync::Arc;

use jsev_core::{Dialect, EvaluationError};
use serde_json::Value;

use super::{Keyword, KeywordEvaluation};
use crate::context::EvaluationContext;
use crate::results::EvaluationResults;

pub fn handlers() -> Vec<Arc<dyn Keyword>> {
    vec![Arc::new(Ref), Arc::new(DynamicRef), Arc::new(RecursiveRef)]
}

fn reference_result(keyword: &str, child: EvaluationResults) -> KeywordEvaluation {
    let valid = child.valid;
    KeywordEvaluation::assert(keyword, valid, || {
        format!("referenced schema {} does not match", child.schema_location)
    })
    .with_children(vec![child])
}

/// `$ref`.
#[derive(Debug)]
pub struct Ref;

impl Keyword for Ref {
    fn name(&self) -> &str {
        "$ref"
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        _evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        let Some(reference) = value.as_str() else {
            return Err(ctx.malformed("must be a URI-reference string"));
        };
        let target = ctx.resolve(reference)?;
        let child = ctx.evaluate_reference(target)?;
        Ok(reference_result(self.name(), child))
    }
}

/// `$dynamicRef` (2020-12).
#[derive(Debug)]
pub struct DynamicRef;

impl Keyword for DynamicRef {
    fn name(&self) -> &str {
        "$dynamicRef"
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
        let Some(reference) = value.as_str() else {
            return Err(ctx.malformed("must be a URI-reference string"));
        };
        let target = ctx.resolve_dynamic(reference)?;
        let child = ctx.evaluate_reference(target)?;
        Ok(reference_result(self.name(), child))
    }
}

/// `$recursiveRef` (2019-09). Its value is always `"#"`.
#[derive(Debug)]
pub struct RecursiveRef;

impl Keyword for RecursiveRef {
    fn name(&self) -> &str {
        "$recursiveRef"
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
        if value.as_str() != Some("#") {
            return Err(ctx.malformed("must be \"#\""));
        }
        let target = ctx.resolve_recursive()?;
        let child = ctx.evaluate_reference(target)?;
        Ok(reference_result(self.name(), child))
    }
}
