//! # jsev-core — Foundational Types for the Evaluation Engine
//!
//! This crate holds the value types that the evaluation engine produces and
//! consumes but that carry no evaluation logic of their own. Every other
//! `jsev-*` crate depends on `jsev-core`; it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Persistent path values.** `JsonPointer` appends in O(1) and shares
//!    its prefix, so three trails per results node cost almost nothing.
//!
//! 2. **Exact numbers.** `multipleOf`, `minimum` and friends go through
//!    [`number`], which compares integers exactly and computes divisibility
//!    on decimal text rather than binary floating point.
//!
//! 3. **One notion of JSON equality.** `const`, `enum` and `uniqueItems` all
//!    use [`canonical::json_equal`].
//!
//! 4. **`sha256_digest()` accepts only `&CanonicalBytes`.** Synthetic schema
//!    identifiers are always derived from RFC 8785 bytes.
//!
//! 5. **Single `Dialect` enum.** Exhaustive `match` wherever behavior differs
//!    between drafts.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `jsev-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod dialect;
pub mod digest;
pub mod error;
pub mod format;
pub mod number;
pub mod pointer;

// Re-export primary types for ergonomic imports.
pub use canonical::{json_equal, CanonicalBytes};
pub use dialect::Dialect;
pub use digest::{sha256_digest, ContentDigest, SYNTHETIC_ID_PREFIX};
pub use error::{
    CanonicalizationError, EvaluationError, JsevError, PointerError, RegistryError,
};
pub use format::{FormatCheck, FormatRegistry};
pub use pointer::{JsonPointer, PathSegment};
