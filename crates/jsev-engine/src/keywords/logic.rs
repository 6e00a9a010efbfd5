//! In-place applicators: `allOf`, `anyOf`, `oneOf`, `not`, `if`, `then`,
//! `else`.
//!
//! Every branch is evaluated even when the outcome is already decided, so
//! the results tree and the annotations available to `unevaluated*` do not
//! depend on branch order.

use std::sync::Arc;

use jsev_core::{Dialect, EvaluationError};
use serde_json::Value;

use super::{require_schema, schema_array, sibling_evaluation, Keyword, KeywordEvaluation};
use crate::context::EvaluationContext;
use crate::results::EvaluationResults;

pub fn handlers() -> Vec<Arc<dyn Keyword>> {
    vec![
        Arc::new(AllOf),
        Arc::new(AnyOf),
        Arc::new(OneOf),
        Arc::new(Not),
        Arc::new(If),
        Arc::new(Then),
        Arc::new(Else),
    ]
}

fn evaluate_branches<'a>(
    ctx: &EvaluationContext<'a>,
    value: &'a Value,
) -> Result<Vec<EvaluationResults>, EvaluationError> {
    schema_array(ctx, value)?
        .iter()
        .enumerate()
        .map(|(i, branch)| ctx.with_schema_path(i).evaluate(branch))
        .collect()
}

fn count_valid(children: &[EvaluationResults]) -> usize {
    children.iter().filter(|c| c.valid).count()
}

/// `allOf`.
#[derive(Debug)]
pub struct AllOf;

impl Keyword for AllOf {
    fn name(&self) -> &str {
        "allOf"
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        _evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        let children = evaluate_branches(ctx, value)?;
        let failed = children.len() - count_valid(&children);
        Ok(KeywordEvaluation::assert(self.name(), failed == 0, || {
            format!("{failed} of {} subschemas did not match", children.len())
        })
        .with_children(children))
    }
}

/// `anyOf`.
#[derive(Debug)]
pub struct AnyOf;

impl Keyword for AnyOf {
    fn name(&self) -> &str {
        "anyOf"
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        _evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        let children = evaluate_branches(ctx, value)?;
        let valid = count_valid(&children) > 0;
        Ok(KeywordEvaluation::assert(self.name(), valid, || {
            "no subschema matched".to_string()
        })
        .with_children(children))
    }
}

/// `oneOf`.
#[derive(Debug)]
pub struct OneOf;

impl Keyword for OneOf {
    fn name(&self) -> &str {
        "oneOf"
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        _evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        let children = evaluate_branches(ctx, value)?;
        let matched = count_valid(&children);
        Ok(KeywordEvaluation::assert(self.name(), matched == 1, || {
            format!("expected exactly one subschema to match, {matched} matched")
        })
        .with_children(children))
    }
}

/// `not`.
#[derive(Debug)]
pub struct Not;

impl Keyword for Not {
    fn name(&self) -> &str {
        "not"
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        _evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        require_schema(ctx, value)?;
        let child = ctx.evaluate(value)?;
        let valid = !child.valid;
        Ok(KeywordEvaluation::assert(self.name(), valid, || {
            "instance matches a schema it must not match".to_string()
        })
        .with_children(vec![child]))
    }
}

/// `if`. Never fails by itself; `then` and `else` read its outcome.
#[derive(Debug)]
pub struct If;

impl Keyword for If {
    fn name(&self) -> &str {
        "if"
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
        require_schema(ctx, value)?;
        let child = ctx.evaluate(value)?;
        Ok(KeywordEvaluation::skip(self.name()).with_children(vec![child]))
    }
}

/// Outcome of the sibling `if`, when it ran.
fn condition(evaluated: &[KeywordEvaluation]) -> Option<bool> {
    sibling_evaluation(evaluated, "if")
        .and_then(|e| e.children.first())
        .map(|child| child.valid)
}

fn branch<'a>(
    keyword: &str,
    value: &'a Value,
    ctx: &EvaluationContext<'a>,
    taken: bool,
) -> Result<KeywordEvaluation, EvaluationError> {
    require_schema(ctx, value)?;
    if !taken {
        return Ok(KeywordEvaluation::skip(keyword));
    }
    let child = ctx.evaluate(value)?;
    let valid = child.valid;
    Ok(KeywordEvaluation::assert(keyword, valid, || {
        format!("'{keyword}' branch did not match")
    })
    .with_children(vec![child]))
}

/// `then`.
#[derive(Debug)]
pub struct Then;

impl Keyword for Then {
    fn name(&self) -> &str {
        "then"
    }

    fn dependencies(&self) -> &'static [&'static str] {
        &["if"]
    }

    fn supports(&self, dialect: Dialect) -> bool {
        dialect >= Dialect::Draft7
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        branch(self.name(), value, ctx, condition(evaluated) == Some(true))
    }
}

/// `else`.
#[derive(Debug)]
pub struct Else;

impl Keyword for Else {
    fn name(&self) -> &str {
        "else"
    }

    fn dependencies(&self) -> &'static [&'static str] {
        &["if"]
    }

    fn supports(&self, dialect: Dialect) -> bool {
        dialect >= Dialect::Draft7
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        branch(self.name(), value, ctx, condition(evaluated) == Some(false))
    }
}
