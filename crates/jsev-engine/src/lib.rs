//! # jsev-engine — JSON Schema Evaluation
//!
//! Evaluates a JSON instance against a JSON Schema and produces a verdict
//! plus a diagnostic tree of per-keyword results and annotations.
//!
//! ## Responsibilities
//!
//! - **Keyword dispatch:** a name → handler registry whose dependency
//!   declarations are layered into priority tiers ([`registry::keywords`]).
//! - **Recursive evaluation:** the frame/state machine in [`context`], with
//!   dynamic scope and a cycle guard.
//! - **Schema storage:** URI, anchor and dynamic-anchor resolution over
//!   registered documents and the embedded meta-schemas
//!   ([`registry::schemas`], [`metaschema`]).
//! - **Dialects:** draft-06, draft-07, 2019-09 and 2020-12, with
//!   `$vocabulary`-selected handler sets ([`registry::vocabulary`]).
//!
//! ## Usage
//!
//! ```no_run
//! use jsev_engine::{EvaluationOptions, SchemaEvaluator};
//! use serde_json::json;
//!
//! let evaluator = SchemaEvaluator::new(&json!({"type": "string"}), EvaluationOptions::default())?;
//! assert!(evaluator.is_valid(&json!("hello"))?);
//! # Ok::<(), jsev_core::JsevError>(())
//! ```
//!
//! ## Crate Policy
//!
//! - No network or file I/O during evaluation. Non-local references are
//!   satisfied up front through a [`Retrieve`] hook.
//! - No `.unwrap()` outside tests.

pub mod context;
pub mod evaluator;
pub mod keywords;
pub mod metaschema;
pub mod options;
pub mod registry;
pub mod results;
pub mod retrieve;

// Re-export primary types.
pub use context::EvaluationContext;
pub use evaluator::{evaluate, validate_schema, SchemaEvaluator};
pub use keywords::{Keyword, KeywordEvaluation};
pub use options::{ConfigError, EvaluationOptions};
pub use registry::{KeywordRegistry, SchemaRegistry, Vocabulary, VocabularyRegistry};
pub use results::{EvaluationResults, OutputFormat};
pub use retrieve::{load_document, DirectoryRetriever, InMemoryRetriever, LoadError, Retrieve};
