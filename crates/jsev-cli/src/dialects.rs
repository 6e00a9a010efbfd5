//! # Dialects Subcommand
//!
//! Lists the supported dialects, their meta-schema URIs and, for dialects
//! with vocabularies, the vocabulary URIs the engine knows.

use std::io::Write;

use anyhow::Result;
use clap::Args;
use serde_json::{json, Value};

use jsev_core::Dialect;
use jsev_engine::VocabularyRegistry;

use crate::{write_json, EXIT_VALID};

/// Arguments for the `jsev dialects` subcommand.
#[derive(Args, Debug)]
pub struct DialectsArgs {
    /// Emit JSON instead of one line per dialect.
    #[arg(long)]
    pub json: bool,
}

/// The dialect listing as JSON.
pub fn listing() -> Value {
    let vocabularies = VocabularyRegistry::global();
    let entries: Vec<Value> = Dialect::all()
        .iter()
        .map(|dialect| {
            let ids: Vec<&str> = vocabularies
                .ids()
                .into_iter()
                .filter(|id| vocabularies.get(id).is_some_and(|v| v.dialect == *dialect))
                .collect();
            json!({
                "name": dialect.as_str(),
                "metaSchema": dialect.meta_schema_uri(),
                "vocabularies": ids,
            })
        })
        .collect();
    Value::Array(entries)
}

/// Execute the dialects subcommand. Always exits 0.
pub fn run_dialects(args: &DialectsArgs, out: &mut dyn Write) -> Result<u8> {
    if args.json {
        write_json(out, &listing())?;
    } else {
        for dialect in Dialect::all() {
            writeln!(out, "{:<10} {}", dialect.as_str(), dialect.meta_schema_uri())?;
        }
    }
    Ok(EXIT_VALID)
}
