//! # Error Types — Structured Error Hierarchy
//!
//! Defines the error types used throughout jsev. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - [`EvaluationError`] carries exactly the three fatal conditions that
//!   abort an evaluation. An instance that does not conform to its schema is
//!   never an error: it is a `valid: false` node in the results tree.
//! - [`RegistryError`] covers registry construction: identifier parsing,
//!   keyword dependency cycles, and retrieval of non-local resources.
//! - Pointer and canonicalization errors are leaf errors with full context.

use thiserror::Error;

/// Top-level error type for jsev.
#[derive(Error, Debug)]
pub enum JsevError {
    /// A fatal evaluation error.
    #[error("evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),

    /// Registry construction or mutation failed.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// A JSON pointer could not be parsed.
    #[error("pointer error: {0}")]
    Pointer(#[from] PointerError),

    /// Canonical serialization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// The named dialect is not one of the supported dialects.
    #[error("unknown dialect: {0:?}")]
    UnknownDialect(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fatal conditions that abort an evaluation.
///
/// These indicate that the schema (or the engine configuration) is broken,
/// independent of the instance being checked. They are never converted into
/// a failing results node.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    /// A keyword's value does not have the shape the keyword requires.
    #[error("malformed schema at '{location}': keyword '{keyword}' {reason}")]
    MalformedSchema {
        /// Absolute schema location of the offending keyword.
        location: String,
        /// The keyword whose value is malformed.
        keyword: String,
        /// What is wrong with the value.
        reason: String,
    },

    /// A reference target could not be located in the registry or the
    /// dynamic scope.
    #[error("unresolvable reference '{reference}' (base '{base}')")]
    UnresolvedReference {
        /// The reference as written, or the absolute URI that was looked up.
        reference: String,
        /// Base URI the reference was resolved against.
        base: String,
    },

    /// The same (schema, instance) pair was revisited on the active call
    /// path without the instance making progress.
    #[error("circular navigation: '{schema_location}' revisited at instance '{instance_location}'")]
    CircularNavigation {
        /// Absolute schema location that was re-entered.
        schema_location: String,
        /// Instance location at which the cycle was detected.
        instance_location: String,
    },
}

impl EvaluationError {
    /// Build a [`EvaluationError::MalformedSchema`].
    pub fn malformed(
        location: impl Into<String>,
        keyword: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedSchema {
            location: location.into(),
            keyword: keyword.into(),
            reason: reason.into(),
        }
    }

    /// Build a [`EvaluationError::UnresolvedReference`].
    pub fn unresolved(reference: impl Into<String>, base: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            reference: reference.into(),
            base: base.into(),
        }
    }

    /// Stable identifier of the error kind, for logs and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedSchema { .. } => "malformed_schema",
            Self::UnresolvedReference { .. } => "unresolved_reference",
            Self::CircularNavigation { .. } => "circular_navigation",
        }
    }
}

/// Error building or mutating a registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// An `$id` or registration URI is not a valid URI reference.
    #[error("invalid identifier '{identifier}': {reason}")]
    InvalidIdentifier {
        /// The identifier as written.
        identifier: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// Keyword dependency declarations form a cycle (or depend on a keyword
    /// that is pinned to run last).
    #[error("keyword dependency cycle among: {}", keywords.join(", "))]
    DependencyCycle {
        /// Keywords that could not be assigned a priority tier.
        keywords: Vec<String>,
    },

    /// A non-local resource could not be retrieved.
    #[error("failed to retrieve '{uri}': {reason}")]
    Retrieval {
        /// Absolute URI of the resource.
        uri: String,
        /// Retriever diagnostic.
        reason: String,
    },

    /// A document could not be canonicalized for identifier assignment.
    #[error("cannot derive identifier: {0}")]
    Canonicalization(String),
}

/// Error parsing a JSON pointer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PointerError {
    /// A non-empty pointer must start with `/`.
    #[error("pointer {0:?} must be empty or start with '/'")]
    MissingLeadingSlash(String),

    /// `~` must be followed by `0` or `1`.
    #[error("invalid escape sequence in pointer {0:?}")]
    InvalidEscape(String),

    /// A URI fragment contained an invalid percent-encoded sequence.
    #[error("invalid percent-encoding in fragment {0:?}")]
    InvalidPercentEncoding(String),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluation_error_kinds_are_distinct() {
        let errors = [
            EvaluationError::malformed("https://x/s#/maximum", "maximum", "must be a number"),
            EvaluationError::unresolved("#/nope", "https://x/s"),
            EvaluationError::CircularNavigation {
                schema_location: "https://x/s#".into(),
                instance_location: "".into(),
            },
        ];
        let kinds: Vec<_> = errors.iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec!["malformed_schema", "unresolved_reference", "circular_navigation"]
        );
    }

    #[test]
    fn malformed_message_names_keyword_and_location() {
        let err = EvaluationError::malformed("https://x/s#/maximum", "maximum", "must be a number");
        let msg = err.to_string();
        assert!(msg.contains("'maximum'"));
        assert!(msg.contains("https://x/s#/maximum"));
    }

    #[test]
    fn dependency_cycle_lists_keywords() {
        let err = RegistryError::DependencyCycle {
            keywords: vec!["alpha".into(), "beta".into()],
        };
        assert_eq!(err.to_string(), "keyword dependency cycle among: alpha, beta");
    }

    #[test]
    fn jsev_error_wraps_evaluation_error() {
        let err: JsevError = EvaluationError::unresolved("a.json", "https://x/").into();
        assert!(matches!(err, JsevError::Evaluation(_)));
    }
}
