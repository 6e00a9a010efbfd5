//! # Eval Subcommand
//!
//! Evaluates one or more instance documents against a schema and prints the
//! results in the requested output format.
//!
//! With a single instance the rendered results are printed as-is. With
//! several, the output is an array of `{"instance": path, "result": ...}`
//! entries in argument order. With none, the instance is read from stdin
//! as JSON.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::{json, Value};

use jsev_core::Dialect;
use jsev_engine::{load_document, DirectoryRetriever, EvaluationOptions, OutputFormat, SchemaEvaluator};

use crate::{write_json, EXIT_INVALID, EXIT_VALID};

/// Arguments for the `jsev eval` subcommand.
#[derive(Args, Debug)]
pub struct EvalArgs {
    /// Schema document (JSON, or YAML by extension).
    #[arg(long, short = 's', value_name = "FILE")]
    pub schema: PathBuf,

    /// Instance documents. Reads one JSON instance from stdin if omitted.
    #[arg(value_name = "INSTANCE")]
    pub instances: Vec<PathBuf>,

    /// Output format: flag, list or hierarchical.
    #[arg(long, short = 'o', default_value = "hierarchical")]
    pub output: OutputFormat,

    /// Dialect for schemas without `$schema` (name or meta-schema URI).
    #[arg(long)]
    pub dialect: Option<Dialect>,

    /// Make `format` assert instead of only annotating.
    #[arg(long)]
    pub require_format: bool,

    /// Directory of schema documents used to satisfy non-local `$ref`s.
    #[arg(long, value_name = "DIR")]
    pub schema_dir: Option<PathBuf>,
}

/// Apply the subcommand's flags on top of loaded options.
pub fn apply_flags(
    mut options: EvaluationOptions,
    dialect: Option<Dialect>,
    require_format: bool,
    schema_dir: Option<&Path>,
) -> Result<EvaluationOptions> {
    if let Some(dialect) = dialect {
        options = options.with_default_dialect(dialect);
    }
    if require_format {
        options = options.with_require_format_validation(true);
    }
    if let Some(dir) = schema_dir {
        let retriever = DirectoryRetriever::new(dir)
            .with_context(|| format!("failed to index schema directory {}", dir.display()))?;
        tracing::info!(dir = %dir.display(), documents = retriever.len(), "loaded schema directory");
        options = options.with_retriever(Arc::new(retriever));
    }
    Ok(options)
}

/// Execute the eval subcommand.
///
/// Returns exit code: 0 if every instance is valid, 1 if any is invalid.
/// Operational failures are errors.
pub fn run_eval(
    args: &EvalArgs,
    options: EvaluationOptions,
    stdin: &mut dyn Read,
    out: &mut dyn std::io::Write,
) -> Result<u8> {
    let options = apply_flags(
        options,
        args.dialect,
        args.require_format,
        args.schema_dir.as_deref(),
    )?;
    let schema = load_document(&args.schema)?;
    let evaluator = SchemaEvaluator::new(&schema, options)
        .with_context(|| format!("failed to prepare schema {}", args.schema.display()))?;
    tracing::debug!(schema = %args.schema.display(), root = %evaluator.root_uri(), "schema ready");

    if args.instances.is_empty() {
        let mut text = String::new();
        stdin
            .read_to_string(&mut text)
            .context("failed to read instance from stdin")?;
        let instance: Value =
            serde_json::from_str(&text).context("stdin is not a JSON document")?;
        let results = evaluator
            .evaluate(&instance)
            .context("evaluation of stdin failed")?;
        write_json(out, &results.render(args.output))?;
        return Ok(if results.valid { EXIT_VALID } else { EXIT_INVALID });
    }

    let mut all_valid = true;
    let mut rendered: Vec<(&PathBuf, Value)> = Vec::with_capacity(args.instances.len());
    for path in &args.instances {
        let instance = load_document(path)?;
        let results = evaluator
            .evaluate(&instance)
            .with_context(|| format!("evaluation of {} failed", path.display()))?;
        tracing::info!(instance = %path.display(), valid = results.valid, "evaluated");
        all_valid &= results.valid;
        rendered.push((path, results.render(args.output)));
    }

    let document = if rendered.len() == 1 {
        rendered.remove(0).1
    } else {
        Value::Array(
            rendered
                .into_iter()
                .map(|(path, result)| json!({"instance": path.display().to_string(), "result": result}))
                .collect(),
        )
    };
    write_json(out, &document)?;
    Ok(if all_valid { EXIT_VALID } else { EXIT_INVALID })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_loaded_options() {
        let options = apply_flags(
            EvaluationOptions::default(),
            Some(Dialect::Draft7),
            true,
            None,
        )
        .unwrap();
        assert_eq!(options.default_dialect, Dialect::Draft7);
        assert!(options.require_format_validation);
        assert!(options.retriever.is_none());
    }

    #[test]
    fn test_absent_flags_keep_loaded_options() {
        let loaded = EvaluationOptions::default()
            .with_default_dialect(Dialect::Draft201909)
            .with_require_format_validation(true);
        let options = apply_flags(loaded, None, false, None).unwrap();
        assert_eq!(options.default_dialect, Dialect::Draft201909);
        assert!(options.require_format_validation);
    }

    #[test]
    fn test_missing_schema_dir_is_an_error() {
        let err = apply_flags(
            EvaluationOptions::default(),
            None,
            false,
            Some(Path::new("/nonexistent/jsev-schemas")),
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("schema directory"));
    }
}
