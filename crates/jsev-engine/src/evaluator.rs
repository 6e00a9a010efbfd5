//! # Schema Evaluator — Public Entry Points
//!
//! [`SchemaEvaluator`] binds one root schema to the registries it is
//! evaluated with. Construction does all the fallible preparation:
//!
//! 1. A run-local [`SchemaRegistry`] is layered over the configured one (or
//!    the process-wide registry), so registering the root schema never
//!    touches shared state.
//! 2. The root schema is registered under its `$id`, or under a synthetic
//!    content-derived URI.
//! 3. If a retriever is configured, every referenced resource that no
//!    registry holds is fetched and registered.
//!
//! After that, [`SchemaEvaluator::evaluate`] can run any number of times.
//! Each call gets fresh per-evaluation state.
//!
//! The free functions [`evaluate`] and [`validate_schema`] cover one-shot
//! use.

use std::sync::Arc;

use jsev_core::{EvaluationError, FormatRegistry, JsevError};
use serde_json::Value;
use url::Url;

use crate::context::{EvaluationContext, EvaluationState};
use crate::options::EvaluationOptions;
use crate::registry::{KeywordRegistry, SchemaRegistry, VocabularyRegistry};
use crate::results::EvaluationResults;

/// A root schema ready for evaluation.
pub struct SchemaEvaluator {
    schemas: SchemaRegistry,
    keywords: Arc<KeywordRegistry>,
    vocabularies: Arc<VocabularyRegistry>,
    formats: Arc<FormatRegistry>,
    options: EvaluationOptions,
    root: Arc<Url>,
}

impl std::fmt::Debug for SchemaEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaEvaluator")
            .field("root", &self.root.as_str())
            .field("options", &self.options)
            .finish()
    }
}

impl SchemaEvaluator {
    /// Register `schema` and prepare it for evaluation.
    ///
    /// # Errors
    ///
    /// [`JsevError::Registry`] if the schema's `$id` is unusable or a
    /// referenced resource cannot be retrieved.
    pub fn new(schema: &Value, options: EvaluationOptions) -> Result<Self, JsevError> {
        let mut schemas = Self::run_registry(&options);
        let root = schemas.register(schema.clone())?;
        Self::prepare(schemas, root, options)
    }

    /// Prepare an already-registered resource, such as a meta-schema, for
    /// evaluation.
    ///
    /// # Errors
    ///
    /// [`JsevError::Evaluation`] with
    /// [`EvaluationError::UnresolvedReference`] if no registry holds `uri`.
    pub fn for_registered(uri: &Url, options: EvaluationOptions) -> Result<Self, JsevError> {
        let schemas = Self::run_registry(&options);
        let resolved = schemas
            .resolve(uri)
            .ok_or_else(|| EvaluationError::unresolved(uri.as_str(), uri.as_str()))?;
        let root = Arc::clone(&resolved.base);
        Self::prepare(schemas, root, options)
    }

    fn run_registry(options: &EvaluationOptions) -> SchemaRegistry {
        let parent = options
            .schema_registry
            .clone()
            .unwrap_or_else(SchemaRegistry::global);
        SchemaRegistry::with_parent(parent).with_default_dialect(options.default_dialect)
    }

    fn prepare(
        mut schemas: SchemaRegistry,
        root: Arc<Url>,
        options: EvaluationOptions,
    ) -> Result<Self, JsevError> {
        if let Some(retriever) = options.retriever.as_deref() {
            let added = schemas.retrieve_missing(retriever)?;
            if added > 0 {
                tracing::debug!(root = %root, added, "retrieved referenced resources");
            }
        }
        let keywords = options
            .keyword_registry
            .clone()
            .unwrap_or_else(KeywordRegistry::global);
        let vocabularies = options
            .vocabulary_registry
            .clone()
            .unwrap_or_else(VocabularyRegistry::global);
        let formats = options.formats.clone().unwrap_or_else(FormatRegistry::global);
        tracing::debug!(root = %root, dialect = %options.default_dialect, "prepared schema evaluator");
        Ok(Self {
            schemas,
            keywords,
            vocabularies,
            formats,
            options,
            root,
        })
    }

    /// URI the root schema is registered under.
    pub fn root_uri(&self) -> &Url {
        &self.root
    }

    /// The run-local registry holding the root schema and anything
    /// retrieved for it.
    pub fn registry(&self) -> &SchemaRegistry {
        &self.schemas
    }

    /// Evaluate `instance` against the root schema.
    ///
    /// # Errors
    ///
    /// One of the three fatal [`EvaluationError`] kinds. Constraint
    /// violations are not errors; they produce `valid: false` results.
    pub fn evaluate(&self, instance: &Value) -> Result<EvaluationResults, EvaluationError> {
        let target = self
            .schemas
            .resolve(&self.root)
            .ok_or_else(|| EvaluationError::unresolved(self.root.as_str(), self.root.as_str()))?;
        let state = EvaluationState::new(
            &self.schemas,
            &self.keywords,
            &self.vocabularies,
            &self.formats,
            &self.options,
        );
        let ctx = EvaluationContext::root(&state, instance, Arc::clone(&target.base));
        let results = ctx.evaluate(target.value)?;
        tracing::debug!(root = %self.root, valid = results.valid, "evaluation complete");
        Ok(results)
    }

    /// True if `instance` conforms to the root schema.
    ///
    /// # Errors
    ///
    /// As [`SchemaEvaluator::evaluate`].
    pub fn is_valid(&self, instance: &Value) -> Result<bool, EvaluationError> {
        self.evaluate(instance).map(|results| results.valid)
    }
}

/// Evaluate `instance` against `schema` in one call.
///
/// # Errors
///
/// As [`SchemaEvaluator::new`] and [`SchemaEvaluator::evaluate`].
pub fn evaluate(
    schema: &Value,
    instance: &Value,
    options: &EvaluationOptions,
) -> Result<EvaluationResults, JsevError> {
    let evaluator = SchemaEvaluator::new(schema, options.clone())?;
    Ok(evaluator.evaluate(instance)?)
}

/// Evaluate `schema` as an instance of its meta-schema: the one named by
/// its `$schema`, or the default dialect's.
///
/// # Errors
///
/// [`JsevError::Evaluation`] if the meta-schema is unknown or itself
/// malformed.
pub fn validate_schema(
    schema: &Value,
    options: &EvaluationOptions,
) -> Result<EvaluationResults, JsevError> {
    let declared = schema.get("$schema").and_then(Value::as_str);
    let meta = declared.unwrap_or_else(|| options.default_dialect.meta_schema_uri());
    let uri = Url::parse(meta).map_err(|_| EvaluationError::unresolved(meta, "$schema"))?;
    let evaluator = SchemaEvaluator::for_registered(&uri, options.clone())?;
    tracing::debug!(meta_schema = %uri, "checking schema against meta-schema");
    Ok(evaluator.evaluate(schema)?)
}
