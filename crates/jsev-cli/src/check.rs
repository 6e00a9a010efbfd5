//! # Check-Schema Subcommand
//!
//! Evaluates a schema document as an instance of its meta-schema: the one
//! named by its `$schema`, or the default dialect's.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use jsev_core::Dialect;
use jsev_engine::{load_document, validate_schema, EvaluationOptions, OutputFormat};

use crate::{write_json, EXIT_INVALID, EXIT_VALID};

/// Arguments for the `jsev check-schema` subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Schema document to check (JSON, or YAML by extension).
    #[arg(value_name = "FILE")]
    pub schema: PathBuf,

    /// Output format: flag, list or hierarchical.
    #[arg(long, short = 'o', default_value = "list")]
    pub output: OutputFormat,

    /// Dialect assumed when the schema has no `$schema`.
    #[arg(long)]
    pub dialect: Option<Dialect>,
}

/// Execute the check-schema subcommand.
///
/// Returns exit code: 0 if the schema conforms to its meta-schema, 1 if not.
pub fn run_check(
    args: &CheckArgs,
    mut options: EvaluationOptions,
    out: &mut dyn std::io::Write,
) -> Result<u8> {
    if let Some(dialect) = args.dialect {
        options = options.with_default_dialect(dialect);
    }
    let schema = load_document(&args.schema)?;
    let results = validate_schema(&schema, &options)
        .with_context(|| format!("failed to check {}", args.schema.display()))?;
    tracing::info!(schema = %args.schema.display(), valid = results.valid, "checked schema");
    write_json(out, &results.render(args.output))?;
    Ok(if results.valid { EXIT_VALID } else { EXIT_INVALID })
}
