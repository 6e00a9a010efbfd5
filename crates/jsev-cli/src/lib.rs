//! # jsev-cli — Command-line Front End
//!
//! Provides the `jsev` binary. Each subcommand lives in its own module and
//! exposes an `Args` struct plus a `run_*` function returning the process
//! exit code, so the command paths can be exercised without spawning a
//! process.
//!
//! ## Subcommands
//!
//! - `jsev eval` evaluates JSON/YAML instances against a schema.
//! - `jsev check-schema` evaluates a schema against its meta-schema.
//! - `jsev dialects` lists supported dialects and their meta-schema URIs.
//!
//! ```bash
//! jsev eval --schema person.json alice.json bob.yaml --output list
//! jsev check-schema person.json
//! ```
//!
//! ## Exit Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | every instance (or the schema) is valid |
//! | 1 | at least one is invalid |
//! | 2 | the command could not run: unreadable input, malformed schema, unresolvable reference |

pub mod check;
pub mod dialects;
pub mod eval;

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use jsev_engine::EvaluationOptions;

/// Exit code for a valid verdict.
pub const EXIT_VALID: u8 = 0;
/// Exit code for an invalid verdict.
pub const EXIT_INVALID: u8 = 1;
/// Exit code for an operational failure.
pub const EXIT_ERROR: u8 = 2;

/// Options from the `--config` file (if any), then `JSEV_*` environment
/// overrides. Subcommand flags are applied by the caller on top.
pub fn load_options(config: Option<&Path>) -> Result<EvaluationOptions> {
    let options = match config {
        Some(path) => EvaluationOptions::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EvaluationOptions::default(),
    };
    options
        .with_env_overrides()
        .context("invalid environment override")
}

/// Write `value` as pretty JSON followed by a newline.
pub(crate) fn write_json(out: &mut dyn Write, value: &serde_json::Value) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value).context("failed to serialize output")?;
    writeln!(out).context("failed to write output")?;
    Ok(())
}
