//! Numeric assertions. All skip non-number instances.
//!
//! Comparisons go through [`jsev_core::number`], which is exact for
//! integers and decimal-exact for `multipleOf`.

use std::cmp::Ordering;
use std::sync::Arc;

use jsev_core::number::{compare, is_multiple_of};
use jsev_core::EvaluationError;
use serde_json::{Number, Value};

use super::{Keyword, KeywordEvaluation};
use crate::context::EvaluationContext;

pub fn handlers() -> Vec<Arc<dyn Keyword>> {
    vec![
        Arc::new(MultipleOf),
        Arc::new(Bound::MAXIMUM),
        Arc::new(Bound::EXCLUSIVE_MAXIMUM),
        Arc::new(Bound::MINIMUM),
        Arc::new(Bound::EXCLUSIVE_MINIMUM),
    ]
}

fn number_value<'v>(ctx: &EvaluationContext<'_>, value: &'v Value) -> Result<&'v Number, EvaluationError> {
    value.as_number().ok_or_else(|| ctx.malformed("must be a number"))
}

/// `multipleOf`.
#[derive(Debug)]
pub struct MultipleOf;

impl Keyword for MultipleOf {
    fn name(&self) -> &str {
        "multipleOf"
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        _evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        let divisor = number_value(ctx, value)?;
        if divisor.as_f64().map_or(true, |d| d <= 0.0) {
            return Err(ctx.malformed("must be strictly greater than 0"));
        }
        let Value::Number(n) = ctx.instance() else {
            return Ok(KeywordEvaluation::skip(self.name()));
        };
        Ok(KeywordEvaluation::assert(self.name(), is_multiple_of(n, divisor), || {
            format!("{n} is not a multiple of {divisor}")
        }))
    }
}

/// One of the four range bounds, described by the orderings of
/// `compare(instance, limit)` that satisfy it.
#[derive(Debug)]
pub struct Bound {
    name: &'static str,
    accepts: &'static [Ordering],
    relation: &'static str,
}

impl Bound {
    pub const MAXIMUM: Bound = Bound {
        name: "maximum",
        accepts: &[Ordering::Less, Ordering::Equal],
        relation: "greater than the maximum",
    };
    pub const EXCLUSIVE_MAXIMUM: Bound = Bound {
        name: "exclusiveMaximum",
        accepts: &[Ordering::Less],
        relation: "not less than the exclusive maximum",
    };
    pub const MINIMUM: Bound = Bound {
        name: "minimum",
        accepts: &[Ordering::Greater, Ordering::Equal],
        relation: "less than the minimum",
    };
    pub const EXCLUSIVE_MINIMUM: Bound = Bound {
        name: "exclusiveMinimum",
        accepts: &[Ordering::Greater],
        relation: "not greater than the exclusive minimum",
    };
}

impl Keyword for Bound {
    fn name(&self) -> &str {
        self.name
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        _evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        let limit = number_value(ctx, value)?;
        let Value::Number(n) = ctx.instance() else {
            return Ok(KeywordEvaluation::skip(self.name));
        };
        let valid = self.accepts.contains(&compare(n, limit));
        Ok(KeywordEvaluation::assert(self.name, valid, || {
            format!("{n} is {} {limit}", self.relation)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bound_names() {
        let names: Vec<String> = handlers().iter().map(|h| h.name().to_string()).collect();
        assert_eq!(
            names,
            vec!["multipleOf", "maximum", "exclusiveMaximum", "minimum", "exclusiveMinimum"]
        );
    }
}
