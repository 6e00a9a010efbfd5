//! `format`, in its two variants.
//!
//! - [`Format`] annotates with the format name. It asserts only when
//!   `require_format_validation` is set.
//! - [`FormatAssertion`] always asserts. It is selected by the 2020-12
//!   format-assertion vocabulary.
//!
//! Both annotate. An unknown format name never fails an instance; asserting
//! it logs a warning instead.

use jsev_core::EvaluationError;
use serde_json::Value;

use super::{Keyword, KeywordEvaluation};
use crate::context::EvaluationContext;

fn check(
    keyword: &str,
    value: &Value,
    ctx: &EvaluationContext<'_>,
    asserting: bool,
) -> Result<KeywordEvaluation, EvaluationError> {
    let Some(name) = value.as_str() else {
        return Err(ctx.malformed("must be a format name"));
    };
    let annotation = KeywordEvaluation::annotate(keyword, value.clone());
    if !asserting {
        return Ok(annotation);
    }
    let instance = ctx.instance();
    match ctx.formats().check(name, instance) {
        Some(true) => Ok(annotation),
        Some(false) => Ok(KeywordEvaluation::assert(keyword, false, || {
            format!("{instance} is not a valid {name}")
        })),
        None => {
            tracing::warn!(format = name, schema = %ctx.schema_location(), "unknown format; not asserted");
            Ok(annotation)
        }
    }
}

/// Annotation-mode `format`.
#[derive(Debug)]
pub struct Format;

impl Keyword for Format {
    fn name(&self) -> &str {
        "format"
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        _evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        check(self.name(), value, ctx, ctx.options().require_format_validation)
    }
}

/// Assertion-mode `format`.
#[derive(Debug)]
pub struct FormatAssertion;

impl Keyword for FormatAssertion {
    fn name(&self) -> &str {
        "format"
    }

    fn evaluate<'a>(
        &self,
        value: &'a Value,
        ctx: &EvaluationContext<'a>,
        _evaluated: &[KeywordEvaluation],
    ) -> Result<KeywordEvaluation, EvaluationError> {
        check(self.name(), value, ctx, true)
    }
}
