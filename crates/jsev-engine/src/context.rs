//! # Evaluation Context — The Recursion State Machine
//!
//! Evaluation is a depth-first walk over the schema graph. State splits into
//! two groups with different lifetimes:
//!
//! - **Frame state** ([`EvaluationContext`]): instance node, the three path
//!   trails, base URI, active dialect, pending reference base. Cloned at
//!   every recursive call; a child frame never changes its parent.
//! - **Whole-evaluation state** ([`EvaluationState`]): registries, options,
//!   the dynamic scope stack, the cycle guard, and compiled-pattern and
//!   dialect caches. Created once per evaluation and referenced by every
//!   frame.
//!
//! ## Per-node Steps
//!
//! [`EvaluationContext::evaluate`] performs, in order:
//!
//! 1. Boolean schemas short-circuit to a leaf.
//! 2. Base URI: the node's own resource URI if it is a registered resource
//!    root, else the pending base set by a reference keyword, else inherited.
//!    A changed base is pushed onto the dynamic scope.
//! 3. Cycle guard on the (schema node, instance node) pair.
//! 4. `$schema` switches the active dialect and vocabulary handler set.
//! 5. Under draft-06 and draft-07, `$ref` hides all of its siblings.
//! 6. Keywords are ordered by registry priority.
//! 7. Each handler runs with the sibling evaluations produced so far.
//! 8. Scope and cycle-guard entries are released by RAII guards, on success
//!    and on every error path alike.
//! 9. The results node is composed; annotations survive only on valid nodes.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use fancy_regex::Regex;
use jsev_core::{Dialect, EvaluationError, FormatRegistry, JsonPointer, PathSegment};
use serde_json::{Map, Value};
use url::Url;

use crate::keywords::{HandlerSet, KeywordEvaluation};
use crate::options::EvaluationOptions;
use crate::registry::keywords::KeywordRegistry;
use crate::registry::schemas::{Resolved, SchemaRegistry};
use crate::registry::vocabulary::VocabularyRegistry;
use crate::results::EvaluationResults;

/// Bound on `$schema` chains followed to find a custom meta-schema's dialect.
const MAX_META_SCHEMA_DEPTH: usize = 8;

// ---------------------------------------------------------------------------
// SchemaLocation
// ---------------------------------------------------------------------------

/// Absolute location of a schema node: resource URI plus pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaLocation {
    /// Resource URI, without fragment.
    pub base: Arc<Url>,
    /// Pointer from the resource root.
    pub pointer: JsonPointer,
}

impl SchemaLocation {
    /// Location of a resource root.
    pub fn root(base: Arc<Url>) -> Self {
        Self {
            base,
            pointer: JsonPointer::root(),
        }
    }

    fn push(&self, segment: impl Into<PathSegment>) -> Self {
        Self {
            base: Arc::clone(&self.base),
            pointer: self.pointer.push(segment),
        }
    }
}

impl fmt::Display for SchemaLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.base, self.pointer.to_uri_fragment())
    }
}

// ---------------------------------------------------------------------------
// ActiveDialect
// ---------------------------------------------------------------------------

/// The dialect in force for a schema node.
#[derive(Debug, Clone)]
pub struct ActiveDialect {
    /// Built-in dialect the meta-schema derives from.
    pub dialect: Dialect,
    /// Meta-schema URI as written.
    pub meta_schema: Arc<str>,
    /// Handlers selected by the meta-schema's `$vocabulary`; `None` means
    /// the full keyword registry.
    pub handlers: Option<Arc<HandlerSet>>,
}

impl ActiveDialect {
    fn fallback(dialect: Dialect) -> Self {
        Self {
            dialect,
            meta_schema: Arc::from(dialect.meta_schema_uri()),
            handlers: None,
        }
    }
}

// ---------------------------------------------------------------------------
// EvaluationState
// ---------------------------------------------------------------------------

/// State shared by every frame of one evaluation.
#[derive(Debug)]
pub struct EvaluationState<'a> {
    schemas: &'a SchemaRegistry,
    keywords: &'a KeywordRegistry,
    vocabularies: &'a VocabularyRegistry,
    formats: &'a FormatRegistry,
    options: &'a EvaluationOptions,
    scope: RefCell<Vec<Arc<Url>>>,
    in_progress: RefCell<HashSet<(usize, usize)>>,
    patterns: RefCell<HashMap<String, Regex>>,
    dialects: RefCell<HashMap<String, ActiveDialect>>,
}

impl<'a> EvaluationState<'a> {
    /// Fresh state over the given registries.
    pub fn new(
        schemas: &'a SchemaRegistry,
        keywords: &'a KeywordRegistry,
        vocabularies: &'a VocabularyRegistry,
        formats: &'a FormatRegistry,
        options: &'a EvaluationOptions,
    ) -> Self {
        Self {
            schemas,
            keywords,
            vocabularies,
            formats,
            options,
            scope: RefCell::new(Vec::new()),
            in_progress: RefCell::new(HashSet::new()),
            patterns: RefCell::new(HashMap::new()),
            dialects: RefCell::new(HashMap::new()),
        }
    }

    /// Current dynamic scope, outermost first.
    pub fn dynamic_scope(&self) -> Vec<Arc<Url>> {
        self.scope.borrow().clone()
    }

    fn activate_dialect(&self, uri: &str, base: &Url) -> Result<ActiveDialect, EvaluationError> {
        if let Some(cached) = self.dialects.borrow().get(uri) {
            return Ok(cached.clone());
        }
        let unresolved = || EvaluationError::unresolved(uri, base.as_str());
        let meta_uri = base.join(uri).map_err(|_| unresolved())?;
        let meta = self.schemas.resolve(&meta_uri).ok_or_else(unresolved)?;
        let dialect = self.base_dialect(uri, meta.value);
        let handlers = self
            .vocabularies
            .handlers_for(meta.value, meta_uri.as_str())?
            .map(Arc::new);
        let active = ActiveDialect {
            dialect,
            meta_schema: Arc::from(uri),
            handlers,
        };
        tracing::debug!(meta_schema = uri, dialect = %dialect, "activated dialect");
        self.dialects
            .borrow_mut()
            .insert(uri.to_string(), active.clone());
        Ok(active)
    }

    fn base_dialect(&self, uri: &str, meta: &Value) -> Dialect {
        if let Some(dialect) = Dialect::from_uri(uri) {
            return dialect;
        }
        let mut current = meta;
        for _ in 0..MAX_META_SCHEMA_DEPTH {
            let Some(next) = current.get("$schema").and_then(Value::as_str) else {
                break;
            };
            if let Some(dialect) = Dialect::from_uri(next) {
                return dialect;
            }
            match Url::parse(next).ok().and_then(|u| self.schemas.resolve(&u)) {
                Some(resolved) => current = resolved.value,
                None => break,
            }
        }
        self.options.default_dialect
    }
}

// ---------------------------------------------------------------------------
// RAII guards
// ---------------------------------------------------------------------------

struct ScopeGuard<'s> {
    scope: &'s RefCell<Vec<Arc<Url>>>,
}

impl<'s> ScopeGuard<'s> {
    fn push(scope: &'s RefCell<Vec<Arc<Url>>>, base: Arc<Url>) -> Self {
        scope.borrow_mut().push(base);
        Self { scope }
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.scope.borrow_mut().pop();
    }
}

struct CycleGuard<'s> {
    in_progress: &'s RefCell<HashSet<(usize, usize)>>,
    key: (usize, usize),
}

impl<'s> CycleGuard<'s> {
    /// `None` if the pair is already on the active path.
    fn enter(in_progress: &'s RefCell<HashSet<(usize, usize)>>, key: (usize, usize)) -> Option<Self> {
        let inserted = in_progress.borrow_mut().insert(key);
        // A guard is only built for a fresh entry; its drop removes the key.
        inserted.then(|| Self { in_progress, key })
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.in_progress.borrow_mut().remove(&self.key);
    }
}

fn address(value: &Value) -> usize {
    value as *const Value as usize
}

// ---------------------------------------------------------------------------
// EvaluationContext
// ---------------------------------------------------------------------------

/// One recursion frame.
#[derive(Debug, Clone)]
pub struct EvaluationContext<'a> {
    state: &'a EvaluationState<'a>,
    instance: &'a Value,
    instance_location: JsonPointer,
    evaluation_path: JsonPointer,
    schema_location: SchemaLocation,
    base_uri: Arc<Url>,
    dialect: ActiveDialect,
    pending_base: Option<Arc<Url>>,
    schema: Option<&'a Map<String, Value>>,
    keyword: Option<&'a str>,
}

impl<'a> EvaluationContext<'a> {
    /// The root frame of an evaluation.
    ///
    /// `base` is the root schema's resource URI; it becomes the outermost
    /// dynamic scope entry for the lifetime of `state`.
    pub fn root(state: &'a EvaluationState<'a>, instance: &'a Value, base: Arc<Url>) -> Self {
        let default = state.options.default_dialect;
        let dialect = state
            .activate_dialect(default.meta_schema_uri(), &base)
            .unwrap_or_else(|err| {
                tracing::warn!(dialect = %default, error = %err, "default meta-schema unavailable; using full keyword registry");
                ActiveDialect::fallback(default)
            });
        state.scope.borrow_mut().push(Arc::clone(&base));
        Self {
            state,
            instance,
            instance_location: JsonPointer::root(),
            evaluation_path: JsonPointer::root(),
            schema_location: SchemaLocation::root(Arc::clone(&base)),
            base_uri: base,
            dialect,
            pending_base: None,
            schema: None,
            keyword: None,
        }
    }

    // -- Accessors ----------------------------------------------------------

    /// The instance node this frame checks.
    pub fn instance(&self) -> &'a Value {
        self.instance
    }

    /// Location of the instance node.
    pub fn instance_location(&self) -> &JsonPointer {
        &self.instance_location
    }

    /// Keyword path from the root schema.
    pub fn evaluation_path(&self) -> &JsonPointer {
        &self.evaluation_path
    }

    /// Absolute location of the current schema position.
    pub fn schema_location(&self) -> &SchemaLocation {
        &self.schema_location
    }

    /// Current base URI.
    pub fn base_uri(&self) -> &Arc<Url> {
        &self.base_uri
    }

    /// The dialect in force.
    pub fn dialect(&self) -> Dialect {
        self.dialect.dialect
    }

    /// The dialect in force, with its meta-schema and handler set.
    pub fn active_dialect(&self) -> &ActiveDialect {
        &self.dialect
    }

    /// Evaluation options.
    pub fn options(&self) -> &'a EvaluationOptions {
        self.state.options
    }

    /// Format validators.
    pub fn formats(&self) -> &'a FormatRegistry {
        self.state.formats
    }

    /// A sibling keyword's value in the current schema object.
    pub fn sibling(&self, name: &str) -> Option<&'a Value> {
        self.schema.and_then(|object| object.get(name))
    }

    // -- Frame derivation ---------------------------------------------------

    /// Frame positioned at keyword `name` of the current schema object.
    pub fn with_keyword(&self, name: &'a str) -> Self {
        let mut next = self.clone();
        next.evaluation_path = self.evaluation_path.push(name);
        next.schema_location = self.schema_location.push(name);
        next.pending_base = None;
        next.keyword = Some(name);
        next
    }

    /// Frame descended into a keyword's value (`allOf/0`, `properties/a`).
    pub fn with_schema_path(&self, segment: impl Into<PathSegment>) -> Self {
        let segment = segment.into();
        let mut next = self.clone();
        next.evaluation_path = self.evaluation_path.push(segment.clone());
        next.schema_location = self.schema_location.push(segment);
        next
    }

    /// Frame checking a different instance node.
    ///
    /// The returned frame may borrow a shorter-lived instance than `self`,
    /// which is how `propertyNames` evaluates object keys.
    pub fn with_instance<'b>(
        &self,
        instance: &'b Value,
        segment: impl Into<PathSegment>,
    ) -> EvaluationContext<'b>
    where
        'a: 'b,
    {
        EvaluationContext {
            state: self.state,
            instance,
            instance_location: self.instance_location.push(segment),
            evaluation_path: self.evaluation_path.clone(),
            schema_location: self.schema_location.clone(),
            base_uri: Arc::clone(&self.base_uri),
            dialect: self.dialect.clone(),
            pending_base: self.pending_base.clone(),
            schema: self.schema,
            keyword: self.keyword,
        }
    }

    // -- Evaluation ---------------------------------------------------------

    /// Evaluate `schema` against this frame's instance.
    ///
    /// # Errors
    ///
    /// Any of the three fatal [`EvaluationError`]s raised here or by a
    /// keyword handler below this node.
    pub fn evaluate(&self, schema: &'a Value) -> Result<EvaluationResults, EvaluationError> {
        let object = match schema {
            Value::Bool(valid) => return Ok(self.boolean_result(*valid)),
            Value::Object(object) => object,
            _ => return Err(self.malformed("must be a schema (object or boolean)")),
        };

        let mut frame = self.clone();
        frame.schema = Some(object);
        frame.keyword = None;

        let registered = self.state.schemas.resource_base(schema);
        let base = registered
            .clone()
            .or_else(|| self.pending_base.clone())
            .unwrap_or_else(|| Arc::clone(&self.base_uri));
        if let Some(resource) = registered {
            frame.schema_location = SchemaLocation::root(resource);
        }
        let _scope = (base != self.base_uri)
            .then(|| ScopeGuard::push(&self.state.scope, Arc::clone(&base)));
        frame.base_uri = base;
        frame.pending_base = None;

        let _cycle = CycleGuard::enter(
            &self.state.in_progress,
            (address(schema), address(self.instance)),
        )
        .ok_or_else(|| EvaluationError::CircularNavigation {
            schema_location: frame.schema_location.to_string(),
            instance_location: frame.instance_location.to_string(),
        })?;

        if let Some(meta) = object.get("$schema") {
            let Some(uri) = meta.as_str() else {
                return Err(frame.with_keyword("$schema").malformed("must be a URI string"));
            };
            frame.dialect = self.state.activate_dialect(uri, &frame.base_uri)?;
        }

        let dialect = frame.dialect.dialect;
        let handlers = frame.dialect.handlers.clone();
        let pairs = match object.get_key_value("$ref") {
            Some((name, value)) if dialect.ignores_ref_siblings() => vec![(
                name.as_str(),
                value,
                self.state.keywords.handler_for(name, handlers.as_deref(), dialect),
            )],
            _ => self
                .state
                .keywords
                .ordered_handlers_for(object, handlers.as_deref(), dialect),
        };

        tracing::trace!(
            schema = %frame.schema_location,
            instance = %frame.instance_location,
            keywords = pairs.len(),
            "evaluating schema node"
        );

        let mut evaluated: Vec<KeywordEvaluation> = Vec::with_capacity(pairs.len());
        for (name, value, handler) in pairs {
            let keyword_ctx = frame.with_keyword(name);
            let evaluation = match handler {
                Some(handler) => handler.evaluate(value, &keyword_ctx, &evaluated)?,
                None => KeywordEvaluation::annotate(name, value.clone()),
            };
            evaluated.push(evaluation);
        }

        Ok(frame.compose(evaluated))
    }

    fn boolean_result(&self, valid: bool) -> EvaluationResults {
        let mut results = EvaluationResults::leaf(
            valid,
            self.schema_location.to_string(),
            self.instance_location.clone(),
            self.evaluation_path.clone(),
        );
        if !valid {
            results
                .errors
                .insert("false".into(), "false schema rejects every instance".into());
        }
        results
    }

    fn compose(&self, evaluated: Vec<KeywordEvaluation>) -> EvaluationResults {
        let valid = evaluated.iter().all(|e| e.valid);
        let mut results = EvaluationResults::leaf(
            valid,
            self.schema_location.to_string(),
            self.instance_location.clone(),
            self.evaluation_path.clone(),
        );
        for evaluation in evaluated {
            let KeywordEvaluation {
                keyword,
                valid: keyword_valid,
                annotation,
                error,
                children,
            } = evaluation;
            if valid {
                if let Some(annotation) = annotation {
                    results.annotations.insert(keyword, annotation);
                }
            } else if !keyword_valid {
                let message = error.unwrap_or_else(|| format!("'{keyword}' is not satisfied"));
                results.errors.insert(keyword, message);
            }
            results.details.extend(children);
        }
        results
    }

    // -- References ---------------------------------------------------------

    /// Resolve a URI reference against the current base.
    ///
    /// # Errors
    ///
    /// [`EvaluationError::UnresolvedReference`] if the target is not
    /// registered.
    pub fn resolve(&self, reference: &str) -> Result<Resolved<'a>, EvaluationError> {
        let unresolved = |target: &str| EvaluationError::unresolved(target, self.base_uri.as_str());
        let uri = self
            .base_uri
            .join(reference)
            .map_err(|_| unresolved(reference))?;
        self.state
            .schemas
            .resolve(&uri)
            .ok_or_else(|| unresolved(uri.as_str()))
    }

    /// Resolve a `$dynamicRef`.
    ///
    /// The reference is resolved statically first. Only when that initial
    /// target's resource declares a matching `$dynamicAnchor` is the dynamic
    /// scope consulted, and then the outermost resource declaring the anchor
    /// wins.
    pub fn resolve_dynamic(&self, reference: &str) -> Result<Resolved<'a>, EvaluationError> {
        let initial = self.resolve(reference)?;
        let Ok(uri) = self.base_uri.join(reference) else {
            return Ok(initial);
        };
        let Some(anchor) = uri.fragment().filter(|f| !f.is_empty() && !f.starts_with('/')) else {
            return Ok(initial);
        };
        let mut resource = uri.clone();
        resource.set_fragment(None);
        if !self.state.schemas.has_dynamic_anchor(&resource, anchor) {
            return Ok(initial);
        }
        for entry in self.state.dynamic_scope() {
            if let Some(found) = self.state.schemas.dynamic_anchor(&entry, anchor) {
                return Ok(found);
            }
        }
        Ok(initial)
    }

    /// Resolve a `$recursiveRef` (whose value is always `"#"`).
    ///
    /// When the current resource has `$recursiveAnchor: true`, the outermost
    /// dynamic scope resource that also has it becomes the target.
    pub fn resolve_recursive(&self) -> Result<Resolved<'a>, EvaluationError> {
        let initial = self.resolve("#")?;
        if !self.state.schemas.has_recursive_anchor(&initial.base) {
            return Ok(initial);
        }
        for entry in self.state.dynamic_scope() {
            if self.state.schemas.has_recursive_anchor(&entry) {
                if let Some(found) = self.state.schemas.resolve(&entry) {
                    return Ok(found);
                }
            }
        }
        Ok(initial)
    }

    /// Evaluate a resolved reference target against this frame's instance.
    pub fn evaluate_reference(&self, target: Resolved<'a>) -> Result<EvaluationResults, EvaluationError> {
        let mut next = self.clone();
        next.schema_location = SchemaLocation {
            base: Arc::clone(&target.base),
            pointer: target.pointer,
        };
        next.pending_base = Some(target.base);
        next.evaluate(target.value)
    }

    // -- Helpers for handlers -----------------------------------------------

    /// Compile (or fetch from cache) a pattern from the schema.
    ///
    /// Patterns may use lookaround and backreferences, as ECMA-262 allows.
    ///
    /// # Errors
    ///
    /// [`EvaluationError::MalformedSchema`] if the pattern does not compile.
    pub fn pattern(&self, source: &str) -> Result<Regex, EvaluationError> {
        if let Some(regex) = self.state.patterns.borrow().get(source) {
            return Ok(regex.clone());
        }
        let regex = Regex::new(source)
            .map_err(|err| self.malformed(format!("invalid regular expression {source:?}: {err}")))?;
        self.state
            .patterns
            .borrow_mut()
            .insert(source.to_string(), regex.clone());
        Ok(regex)
    }

    /// Match `text` against a compiled pattern.
    ///
    /// # Errors
    ///
    /// [`EvaluationError::MalformedSchema`] if matching exceeds the
    /// backtracking limit.
    pub fn pattern_matches(&self, regex: &Regex, text: &str) -> Result<bool, EvaluationError> {
        regex
            .is_match(text)
            .map_err(|err| self.malformed(format!("pattern {:?} could not be matched: {err}", regex.as_str())))
    }

    /// A malformed-schema error at the current keyword.
    pub fn malformed(&self, reason: impl Into<String>) -> EvaluationError {
        EvaluationError::malformed(
            self.schema_location.to_string(),
            self.keyword.unwrap_or("schema"),
            reason,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::keywords::KeywordRegistry;
    use serde_json::json;

    struct Fixture {
        schemas: SchemaRegistry,
        keywords: KeywordRegistry,
        vocabularies: VocabularyRegistry,
        formats: FormatRegistry,
        options: EvaluationOptions,
    }

    impl Fixture {
        fn new(schema: Value) -> (Self, Arc<Url>) {
            let mut schemas = SchemaRegistry::with_parent(SchemaRegistry::global());
            let root = schemas.register(schema).unwrap();
            (
                Self {
                    schemas,
                    keywords: KeywordRegistry::with_builtin(),
                    vocabularies: VocabularyRegistry::with_builtin(),
                    formats: FormatRegistry::with_builtin(),
                    options: EvaluationOptions::default(),
                },
                root,
            )
        }

        fn state(&self) -> EvaluationState<'_> {
            EvaluationState::new(
                &self.schemas,
                &self.keywords,
                &self.vocabularies,
                &self.formats,
                &self.options,
            )
        }
    }

    fn run(schema: Value, instance: Value) -> Result<EvaluationResults, EvaluationError> {
        let (fixture, root) = Fixture::new(schema);
        let state = fixture.state();
        let target = fixture.schemas.resolve(&root).unwrap().value;
        let ctx = EvaluationContext::root(&state, &instance, root);
        ctx.evaluate(target)
    }

    #[test]
    fn test_boolean_schemas() {
        assert!(run(json!(true), json!(1)).unwrap().valid);
        let rejected = run(json!(false), json!(1)).unwrap();
        assert!(!rejected.valid);
        assert!(rejected.errors.contains_key("false"));
    }

    #[test]
    fn test_schema_location_uses_resource_uri() {
        let results = run(
            json!({"$id": "https://example.com/root", "properties": {"a": {"type": "string"}}}),
            json!({"a": 1}),
        )
        .unwrap();
        assert!(!results.valid);
        assert_eq!(results.schema_location, "https://example.com/root#");
        let child = &results.details[0];
        assert_eq!(child.schema_location, "https://example.com/root#/properties/a");
        assert_eq!(child.instance_location.to_string(), "/a");
    }

    #[test]
    fn test_self_reference_is_circular() {
        let err = run(json!({"$ref": "#"}), json!(1)).unwrap_err();
        assert!(matches!(err, EvaluationError::CircularNavigation { .. }));
    }

    #[test]
    fn test_guards_are_released_after_error() {
        let (fixture, root) = Fixture::new(json!({"$ref": "#"}));
        let state = fixture.state();
        let instance = json!(null);
        let target = fixture.schemas.resolve(&root).unwrap().value;
        let ctx = EvaluationContext::root(&state, &instance, Arc::clone(&root));
        assert!(ctx.evaluate(target).is_err());
        assert!(state.in_progress.borrow().is_empty());
        assert_eq!(state.dynamic_scope(), vec![root]);
    }

    #[test]
    fn test_rejected_cycle_entry_keeps_outer_record() {
        let in_progress = RefCell::new(HashSet::new());
        let outer = CycleGuard::enter(&in_progress, (1, 2)).unwrap();
        assert!(CycleGuard::enter(&in_progress, (1, 2)).is_none());
        assert!(in_progress.borrow().contains(&(1, 2)));
        drop(outer);
        assert!(in_progress.borrow().is_empty());
    }

    #[test]
    fn test_mutual_definitions_are_circular() {
        let schema = json!({
            "$defs": {"a": {"$ref": "#/$defs/b"}, "b": {"$ref": "#/$defs/a"}},
            "$ref": "#/$defs/a"
        });
        let err = run(schema, json!(1)).unwrap_err();
        assert!(matches!(err, EvaluationError::CircularNavigation { .. }));
    }

    #[test]
    fn test_patterns_allow_lookaround() {
        let schema = json!({"pattern": "^(?!foo)"});
        assert!(run(schema.clone(), json!("bar")).unwrap().valid);
        assert!(!run(schema, json!("foobar")).unwrap().valid);

        let schema = json!({
            "patternProperties": {"(?<=x-)id$": {"type": "integer"}},
            "unevaluatedProperties": false
        });
        assert!(run(schema.clone(), json!({"x-id": 1})).unwrap().valid);
        assert!(!run(schema.clone(), json!({"x-id": "1"})).unwrap().valid);
        assert!(!run(schema, json!({"id": 1})).unwrap().valid);
    }

    #[test]
    fn test_uncompilable_pattern_is_malformed() {
        let err = run(json!({"pattern": "^(abc"}), json!("abc")).unwrap_err();
        assert!(matches!(err, EvaluationError::MalformedSchema { .. }));
    }

    #[test]
    fn test_legacy_ref_hides_siblings() {
        let schema = json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "definitions": {"any": true},
            "$ref": "#/definitions/any",
            "type": "string"
        });
        assert!(run(schema, json!(5)).unwrap().valid);
    }

    #[test]
    fn test_modern_ref_keeps_siblings() {
        let schema = json!({
            "$defs": {"any": true},
            "$ref": "#/$defs/any",
            "type": "string"
        });
        assert!(!run(schema, json!(5)).unwrap().valid);
    }

    #[test]
    fn test_unknown_keyword_becomes_annotation() {
        let results = run(json!({"x-note": {"a": 1}}), json!(null)).unwrap();
        assert_eq!(results.annotation("x-note"), Some(&json!({"a": 1})));
    }

    #[test]
    fn test_invalid_node_drops_annotations() {
        let results = run(json!({"title": "T", "type": "string"}), json!(1)).unwrap();
        assert!(!results.valid);
        assert!(results.annotations.is_empty());
        assert!(results.errors.contains_key("type"));
    }

    #[test]
    fn test_unknown_meta_schema_is_unresolved() {
        let err = run(json!({"$schema": "https://example.com/no-such-meta"}), json!(1)).unwrap_err();
        assert!(matches!(err, EvaluationError::UnresolvedReference { .. }));
    }

    #[test]
    fn test_non_schema_value_is_malformed() {
        let err = run(json!({"not": 5}), json!(1)).unwrap_err();
        assert!(matches!(err, EvaluationError::MalformedSchema { .. }));
    }
}
