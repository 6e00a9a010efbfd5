//! # jsev CLI entry point
//!
//! Parses command-line arguments, initializes logging and dispatches to the
//! subcommand handlers in the library crate.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use jsev_cli::check::{run_check, CheckArgs};
use jsev_cli::dialects::{run_dialects, DialectsArgs};
use jsev_cli::eval::{run_eval, EvalArgs};
use jsev_cli::{load_options, EXIT_ERROR};

/// JSON Schema evaluation.
///
/// Evaluates JSON and YAML documents against draft-06, draft-07, 2019-09 and
/// 2020-12 schemas, and checks schemas against their meta-schemas.
#[derive(Parser, Debug)]
#[command(name = "jsev", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to an options file (JSON or YAML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate instances against a schema.
    Eval(EvalArgs),

    /// Check a schema against its meta-schema.
    CheckSchema(CheckArgs),

    /// List supported dialects.
    Dialects(DialectsArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over -v when set.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "jsev CLI starting");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let result = load_options(cli.config.as_deref()).and_then(|options| match &cli.command {
        Commands::Eval(args) => run_eval(args, options, &mut std::io::stdin().lock(), &mut out),
        Commands::CheckSchema(args) => run_check(args, options, &mut out),
        Commands::Dialects(args) => run_dialects(args, &mut out),
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}
