//! # Vocabulary Registry — Handler Subsets Selected by `$vocabulary`
//!
//! From 2019-09 on, a meta-schema lists the vocabularies it uses in
//! `$vocabulary`, each marked required (`true`) or optional (`false`). The
//! handlers that apply to schemas written against that meta-schema are the
//! union of the listed vocabularies' handlers.
//!
//! A meta-schema without `$vocabulary` selects nothing here, and the caller
//! falls back to the full keyword registry. An unknown vocabulary marked
//! required makes the meta-schema unusable; an unknown optional one is
//! ignored.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use jsev_core::{Dialect, EvaluationError};
use serde_json::Value;
use url::Url;

use super::schemas::{Resolved, SchemaRegistry};
use crate::keywords::{self, format::FormatAssertion, HandlerSet, Keyword};

/// A named bundle of keyword handlers.
#[derive(Clone)]
pub struct Vocabulary {
    /// Vocabulary URI as it appears in `$vocabulary`.
    pub id: String,
    /// URI of the meta-schema describing the vocabulary's keywords. The
    /// document itself lives in the schema registry; see
    /// [`Vocabulary::meta_schema_document`].
    pub meta_schema: String,
    /// Dialect that defines the vocabulary.
    pub dialect: Dialect,
    handlers: Vec<Arc<dyn Keyword>>,
}

impl Vocabulary {
    /// A vocabulary with the given handlers.
    pub fn new(
        id: impl Into<String>,
        meta_schema: impl Into<String>,
        dialect: Dialect,
        handlers: Vec<Arc<dyn Keyword>>,
    ) -> Self {
        Self {
            id: id.into(),
            meta_schema: meta_schema.into(),
            dialect,
            handlers,
        }
    }

    /// Names of the keywords the vocabulary defines.
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.handlers.iter().map(|h| h.name())
    }

    /// The vocabulary's handlers.
    pub fn handlers(&self) -> &[Arc<dyn Keyword>] {
        &self.handlers
    }

    /// Resolve the vocabulary's meta-schema document in `schemas`.
    ///
    /// `None` if the URI is unparsable or no registry in the chain holds it.
    pub fn meta_schema_document<'r>(&self, schemas: &'r SchemaRegistry) -> Option<Resolved<'r>> {
        let uri = Url::parse(&self.meta_schema).ok()?;
        schemas.resolve(&uri)
    }
}

impl fmt::Debug for Vocabulary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vocabulary")
            .field("id", &self.id)
            .field("dialect", &self.dialect)
            .field("keywords", &self.keywords().collect::<Vec<_>>())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Built-in vocabularies
// ---------------------------------------------------------------------------

const CORE_2019: &[&str] = &[
    "$id", "$schema", "$anchor", "$ref", "$recursiveRef", "$recursiveAnchor", "$vocabulary",
    "$comment", "$defs",
];
const CORE_2020: &[&str] = &[
    "$id", "$schema", "$anchor", "$ref", "$dynamicRef", "$dynamicAnchor", "$vocabulary",
    "$comment", "$defs",
];
const APPLICATOR_2019: &[&str] = &[
    "additionalItems", "unevaluatedItems", "items", "contains", "additionalProperties",
    "unevaluatedProperties", "properties", "patternProperties", "dependentSchemas",
    "propertyNames", "if", "then", "else", "allOf", "anyOf", "oneOf", "not",
];
const APPLICATOR_2020: &[&str] = &[
    "prefixItems", "items", "contains", "additionalProperties", "properties",
    "patternProperties", "dependentSchemas", "propertyNames", "if", "then", "else", "allOf",
    "anyOf", "oneOf", "not",
];
const UNEVALUATED_2020: &[&str] = &["unevaluatedItems", "unevaluatedProperties"];
const VALIDATION: &[&str] = &[
    "multipleOf", "maximum", "exclusiveMaximum", "minimum", "exclusiveMinimum", "maxLength",
    "minLength", "pattern", "maxItems", "minItems", "uniqueItems", "maxContains", "minContains",
    "maxProperties", "minProperties", "required", "dependentRequired", "const", "enum", "type",
];
const META_DATA: &[&str] = &[
    "title", "description", "default", "deprecated", "readOnly", "writeOnly", "examples",
];
const FORMAT: &[&str] = &["format"];
const CONTENT: &[&str] = &["contentEncoding", "contentMediaType", "contentSchema"];

/// (vocabulary suffix, meta-schema suffix, keywords)
const VOCABULARIES_2019: &[(&str, &str, &[&str])] = &[
    ("core", "core", CORE_2019),
    ("applicator", "applicator", APPLICATOR_2019),
    ("validation", "validation", VALIDATION),
    ("meta-data", "meta-data", META_DATA),
    ("format", "format", FORMAT),
    ("content", "content", CONTENT),
];
const VOCABULARIES_2020: &[(&str, &str, &[&str])] = &[
    ("core", "core", CORE_2020),
    ("applicator", "applicator", APPLICATOR_2020),
    ("unevaluated", "unevaluated", UNEVALUATED_2020),
    ("validation", "validation", VALIDATION),
    ("meta-data", "meta-data", META_DATA),
    ("format-annotation", "format-annotation", FORMAT),
    ("content", "content", CONTENT),
];

/// Vocabulary URI → vocabulary.
#[derive(Debug, Clone, Default)]
pub struct VocabularyRegistry {
    vocabularies: HashMap<String, Vocabulary>,
}

impl VocabularyRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The 2019-09 and 2020-12 vocabularies over the built-in handlers.
    pub fn with_builtin() -> Self {
        let builtin: HashMap<String, Arc<dyn Keyword>> = keywords::builtin()
            .into_iter()
            .map(|h| (h.name().to_string(), h))
            .collect();
        let pick = |names: &[&str]| -> Vec<Arc<dyn Keyword>> {
            names.iter().filter_map(|n| builtin.get(*n).cloned()).collect()
        };

        let mut registry = Self::new();
        for (dialect, prefix, table) in [
            (Dialect::Draft201909, "https://json-schema.org/draft/2019-09", VOCABULARIES_2019),
            (Dialect::Draft202012, "https://json-schema.org/draft/2020-12", VOCABULARIES_2020),
        ] {
            for (vocab, meta, names) in table {
                registry.register(Vocabulary::new(
                    format!("{prefix}/vocab/{vocab}"),
                    format!("{prefix}/meta/{meta}"),
                    dialect,
                    pick(names),
                ));
            }
        }
        registry.register(Vocabulary::new(
            "https://json-schema.org/draft/2020-12/vocab/format-assertion",
            "https://json-schema.org/draft/2020-12/meta/format-assertion",
            Dialect::Draft202012,
            vec![Arc::new(FormatAssertion)],
        ));
        registry
    }

    /// The process-wide registry of built-in vocabularies.
    pub fn global() -> Arc<VocabularyRegistry> {
        static GLOBAL: OnceLock<Arc<VocabularyRegistry>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Self::with_builtin())))
    }

    /// Add or replace a vocabulary.
    pub fn register(&mut self, vocabulary: Vocabulary) {
        tracing::debug!(vocabulary = %vocabulary.id, "registered vocabulary");
        self.vocabularies.insert(vocabulary.id.clone(), vocabulary);
    }

    /// The vocabulary with URI `id`.
    pub fn get(&self, id: &str) -> Option<&Vocabulary> {
        self.vocabularies.get(id)
    }

    /// Known vocabulary URIs, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.vocabularies.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Handlers selected by a meta-schema's `$vocabulary`.
    ///
    /// Returns `Ok(None)` when the meta-schema declares no vocabularies.
    /// When both format vocabularies are declared, the assertion variant
    /// wins.
    ///
    /// # Errors
    ///
    /// [`EvaluationError::MalformedSchema`] if `$vocabulary` is not an
    /// object of booleans, or names an unknown vocabulary as required.
    pub fn handlers_for(
        &self,
        meta_schema: &Value,
        location: &str,
    ) -> Result<Option<HandlerSet>, EvaluationError> {
        let Some(declared) = meta_schema.get("$vocabulary") else {
            return Ok(None);
        };
        let malformed = |reason: String| EvaluationError::malformed(location, "$vocabulary", reason);
        let Value::Object(declared) = declared else {
            return Err(malformed("must be an object".into()));
        };

        let mut selected: Vec<&Vocabulary> = Vec::with_capacity(declared.len());
        for (id, required) in declared {
            let Some(required) = required.as_bool() else {
                return Err(malformed(format!("value for {id:?} must be a boolean")));
            };
            match self.vocabularies.get(id) {
                Some(vocabulary) => selected.push(vocabulary),
                None if required => {
                    return Err(malformed(format!("requires unsupported vocabulary {id:?}")))
                }
                None => tracing::debug!(vocabulary = %id, "ignoring unknown optional vocabulary"),
            }
        }
        selected.sort_by_key(|v| v.id.ends_with("/format-assertion"));

        let mut handlers = HandlerSet::new();
        for vocabulary in selected {
            for handler in &vocabulary.handlers {
                handlers.insert(handler.name().to_string(), Arc::clone(handler));
            }
        }
        Ok(Some(handlers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const V2020: &str = "https://json-schema.org/draft/2020-12/vocab";

    #[test]
    fn test_builtin_vocabularies_cover_their_keywords() {
        let registry = VocabularyRegistry::with_builtin();
        assert_eq!(registry.ids().len(), 14);
        let core = registry.get(&format!("{V2020}/core")).unwrap();
        assert_eq!(core.keywords().count(), CORE_2020.len());
        let validation = registry.get(&format!("{V2020}/validation")).unwrap();
        assert_eq!(validation.keywords().count(), VALIDATION.len());
    }

    #[test]
    fn test_builtin_meta_schema_documents_resolve() {
        let schemas = SchemaRegistry::global();
        let registry = VocabularyRegistry::with_builtin();
        for id in registry.ids() {
            let vocabulary = registry.get(id).unwrap();
            let document = vocabulary
                .meta_schema_document(&schemas)
                .unwrap_or_else(|| panic!("no meta-schema for {id}"));
            assert!(document.value.get("$vocabulary").is_some() || document.value.get("$schema").is_some());
        }
        let applicator = registry.get(&format!("{V2020}/applicator")).unwrap();
        let document = applicator.meta_schema_document(&schemas).unwrap();
        assert!(document.value["properties"].get("prefixItems").is_some());
    }

    #[test]
    fn test_no_vocabulary_selects_nothing() {
        let registry = VocabularyRegistry::with_builtin();
        assert!(registry.handlers_for(&json!({}), "m").unwrap().is_none());
    }

    #[test]
    fn test_union_of_declared_vocabularies() {
        let registry = VocabularyRegistry::with_builtin();
        let meta = json!({"$vocabulary": {
            format!("{V2020}/core"): true,
            format!("{V2020}/validation"): true
        }});
        let set = registry.handlers_for(&meta, "m").unwrap().unwrap();
        assert!(set.contains_key("type"));
        assert!(set.contains_key("$ref"));
        assert!(!set.contains_key("properties"));
        assert!(!set.contains_key("title"));
    }

    #[test]
    fn test_unknown_required_vocabulary_is_malformed() {
        let registry = VocabularyRegistry::with_builtin();
        let meta = json!({"$vocabulary": {"https://example.com/vocab/x": true}});
        let err = registry.handlers_for(&meta, "https://example.com/meta").unwrap_err();
        assert!(matches!(err, EvaluationError::MalformedSchema { ref keyword, .. } if keyword == "$vocabulary"));
    }

    #[test]
    fn test_unknown_optional_vocabulary_is_ignored() {
        let registry = VocabularyRegistry::with_builtin();
        let meta = json!({"$vocabulary": {
            "https://example.com/vocab/x": false,
            format!("{V2020}/core"): true
        }});
        let set = registry.handlers_for(&meta, "m").unwrap().unwrap();
        assert!(set.contains_key("$id"));
    }

    #[test]
    fn test_format_assertion_wins_over_annotation() {
        let registry = VocabularyRegistry::with_builtin();
        let meta = json!({"$vocabulary": {
            format!("{V2020}/format-annotation"): true,
            format!("{V2020}/format-assertion"): false
        }});
        let set = registry.handlers_for(&meta, "m").unwrap().unwrap();
        let format = set.get("format").unwrap();
        assert_eq!(format!("{format:?}"), "FormatAssertion");
    }
}
