//! # Registries
//!
//! - [`keywords`]: keyword name → handler, with priority tiers.
//! - [`schemas`]: URI → schema resource, anchors and node identity.
//! - [`vocabulary`]: `$vocabulary` URI → handler subset.
//!
//! Keyword and schema registries each have a process-wide copy-on-write
//! instance; evaluations may also be given private instances through
//! [`EvaluationOptions`](crate::options::EvaluationOptions).

pub mod keywords;
pub mod schemas;
pub mod vocabulary;

pub use keywords::KeywordRegistry;
pub use schemas::{Resolved, SchemaRegistry};
pub use vocabulary::{Vocabulary, VocabularyRegistry};
