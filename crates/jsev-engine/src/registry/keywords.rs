//! # Keyword Registry — Handlers and Priority Tiers
//!
//! Maps keyword names to handlers and assigns every keyword a priority tier
//! derived from the handlers' declared dependencies.
//!
//! ## Priority Algorithm
//!
//! - `$schema` is pinned to tier 0: the dialect must be known before any
//!   other keyword is interpreted.
//! - `unevaluatedItems` and `unevaluatedProperties` are pinned to the last
//!   tier: they read annotations produced by every other keyword, including
//!   keywords nested inside applicators.
//! - Every other handler is placed in batches. Each round collects the
//!   handlers whose dependencies all already have a tier and gives them the
//!   next tier. A round that collects nothing while handlers remain means
//!   the declarations are cyclic, and registration fails.
//!
//! Keywords with no handler, and dependencies naming unregistered keywords,
//! sit in the default tier and never block anything. Within a tier there is
//! no ordering guarantee.
//!
//! ## Copy-on-write Global
//!
//! [`KeywordRegistry::global`] hands out an `Arc` snapshot. Registration via
//! [`KeywordRegistry::register_global`] builds a new snapshot and swaps it
//! in, so running evaluations never observe a half-updated table.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, OnceLock};

use jsev_core::{Dialect, RegistryError};
use parking_lot::RwLock;
use serde_json::{Map, Value};

use crate::keywords::{self, HandlerSet, Keyword};

/// Tier of the dialect-selecting keyword.
pub const FIRST_PRIORITY: u32 = 0;
/// Tier of unknown keywords and of the first computed batch.
pub const DEFAULT_PRIORITY: u32 = 1;
/// Tier of the unevaluated-* keywords.
pub const LAST_PRIORITY: u32 = u32::MAX;

const RUNS_FIRST: &[&str] = &["$schema"];
const RUNS_LAST: &[&str] = &["unevaluatedItems", "unevaluatedProperties"];

/// One schema member paired with its handler (`None` for unknown keywords).
pub type KeywordPair<'s> = (&'s str, &'s Value, Option<Arc<dyn Keyword>>);

/// Keyword name → handler, with computed priorities.
#[derive(Debug, Clone, Default)]
pub struct KeywordRegistry {
    handlers: HashMap<String, Arc<dyn Keyword>>,
    priorities: HashMap<String, u32>,
}

impl KeywordRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in handler.
    ///
    /// The built-in dependency declarations are acyclic; if that ever stops
    /// being true the failure is logged and an empty registry returned.
    pub fn with_builtin() -> Self {
        match Self::from_handlers(keywords::builtin()) {
            Ok(registry) => registry,
            Err(err) => {
                tracing::error!(error = %err, "built-in keyword handlers are inconsistent");
                Self::new()
            }
        }
    }

    /// Build a registry from a handler list. Later handlers replace earlier
    /// ones with the same name.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DependencyCycle`] if the declarations are cyclic.
    pub fn from_handlers(
        handlers: impl IntoIterator<Item = Arc<dyn Keyword>>,
    ) -> Result<Self, RegistryError> {
        let handlers: HashMap<String, Arc<dyn Keyword>> = handlers
            .into_iter()
            .map(|h| (h.name().to_string(), h))
            .collect();
        let priorities = compute_priorities(&handlers)?;
        Ok(Self {
            handlers,
            priorities,
        })
    }

    /// The handler for `name`.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Keyword>> {
        self.handlers.get(name).cloned()
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// True if no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Add or replace a handler and recompute priorities.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DependencyCycle`] if the new handler closes a cycle.
    /// The registry is unchanged on error.
    pub fn register(&mut self, handler: Arc<dyn Keyword>) -> Result<(), RegistryError> {
        let mut candidate = self.handlers.clone();
        let name = handler.name().to_string();
        candidate.insert(name.clone(), handler);
        let priorities = compute_priorities(&candidate)?;
        tracing::debug!(keyword = %name, tier = priorities.get(&name).copied().unwrap_or(DEFAULT_PRIORITY), "registered keyword handler");
        self.handlers = candidate;
        self.priorities = priorities;
        Ok(())
    }

    /// Priority tier of `name`.
    pub fn priority(&self, name: &str) -> u32 {
        self.priorities
            .get(name)
            .copied()
            .unwrap_or(DEFAULT_PRIORITY)
    }

    /// The handler that applies to `name` under a vocabulary selection and
    /// dialect, or `None` if the keyword is unknown there.
    ///
    /// A vocabulary selection only excludes built-in keywords; extension
    /// keywords registered here apply under every selection.
    pub fn handler_for(
        &self,
        name: &str,
        vocabulary: Option<&HandlerSet>,
        dialect: Dialect,
    ) -> Option<Arc<dyn Keyword>> {
        let handler = match vocabulary {
            Some(set) => set
                .get(name)
                .or_else(|| self.handlers.get(name).filter(|_| !keywords::is_builtin(name))),
            None => self.handlers.get(name),
        };
        handler.filter(|h| h.supports(dialect)).cloned()
    }

    /// Members of `schema` paired with their handlers, in priority order.
    pub fn ordered_handlers_for<'s>(
        &self,
        schema: &'s Map<String, Value>,
        vocabulary: Option<&HandlerSet>,
        dialect: Dialect,
    ) -> Vec<KeywordPair<'s>> {
        let mut pairs: Vec<KeywordPair<'s>> = schema
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str(),
                    value,
                    self.handler_for(name, vocabulary, dialect),
                )
            })
            .collect();
        pairs.sort_by_key(|(name, _, _)| self.priority(name));
        pairs
    }

    /// Snapshot of the process-wide registry.
    pub fn global() -> Arc<KeywordRegistry> {
        Arc::clone(&global_cell().read())
    }

    /// Register a handler in the process-wide registry.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DependencyCycle`]; the global registry is unchanged.
    pub fn register_global(handler: Arc<dyn Keyword>) -> Result<(), RegistryError> {
        let mut guard = global_cell().write();
        let mut next = KeywordRegistry::clone(&guard);
        next.register(handler)?;
        *guard = Arc::new(next);
        Ok(())
    }
}

fn global_cell() -> &'static RwLock<Arc<KeywordRegistry>> {
    static GLOBAL: OnceLock<RwLock<Arc<KeywordRegistry>>> = OnceLock::new();
    GLOBAL.get_or_init(|| RwLock::new(Arc::new(KeywordRegistry::with_builtin())))
}

/// Assign tiers by batched topological layering.
fn compute_priorities(
    handlers: &HashMap<String, Arc<dyn Keyword>>,
) -> Result<HashMap<String, u32>, RegistryError> {
    let mut priorities: HashMap<String, u32> = HashMap::new();
    for name in RUNS_FIRST {
        priorities.insert((*name).to_string(), FIRST_PRIORITY);
    }

    let mut remaining: BTreeSet<&str> = handlers
        .keys()
        .map(String::as_str)
        .filter(|name| !RUNS_FIRST.contains(name) && !RUNS_LAST.contains(name))
        .collect();

    let satisfied = |dep: &str, assigned: &HashMap<String, u32>| {
        if RUNS_LAST.contains(&dep) {
            return false;
        }
        assigned.contains_key(dep) || !handlers.contains_key(dep)
    };

    let mut tier = DEFAULT_PRIORITY;
    while !remaining.is_empty() {
        let ready: Vec<&str> = remaining
            .iter()
            .copied()
            .filter(|name| {
                handlers
                    .get(*name)
                    .map(|h| h.dependencies().iter().all(|dep| satisfied(dep, &priorities)))
                    .unwrap_or(true)
            })
            .collect();
        if ready.is_empty() {
            return Err(RegistryError::DependencyCycle {
                keywords: remaining.iter().map(|s| s.to_string()).collect(),
            });
        }
        for name in ready {
            remaining.remove(name);
            priorities.insert(name.to_string(), tier);
        }
        tier += 1;
    }

    for name in RUNS_LAST {
        priorities.insert((*name).to_string(), LAST_PRIORITY);
    }
    Ok(priorities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EvaluationContext;
    use crate::keywords::KeywordEvaluation;
    use jsev_core::EvaluationError;
    use serde_json::json;

    #[derive(Debug)]
    struct Probe {
        name: &'static str,
        deps: &'static [&'static str],
    }

    impl Keyword for Probe {
        fn name(&self) -> &str {
            self.name
        }

        fn dependencies(&self) -> &'static [&'static str] {
            self.deps
        }

        fn evaluate<'a>(
            &self,
            _value: &'a Value,
            _ctx: &EvaluationContext<'a>,
            _evaluated: &[KeywordEvaluation],
        ) -> Result<KeywordEvaluation, EvaluationError> {
            Ok(KeywordEvaluation::skip(self.name))
        }
    }

    fn probe(name: &'static str, deps: &'static [&'static str]) -> Arc<dyn Keyword> {
        Arc::new(Probe { name, deps })
    }

    #[test]
    fn test_dependencies_run_first() {
        let registry = KeywordRegistry::with_builtin();
        assert_eq!(registry.priority("$schema"), FIRST_PRIORITY);
        assert!(registry.priority("properties") < registry.priority("additionalProperties"));
        assert!(registry.priority("patternProperties") < registry.priority("additionalProperties"));
        assert!(registry.priority("prefixItems") < registry.priority("items"));
        assert!(registry.priority("items") < registry.priority("additionalItems"));
        assert!(registry.priority("contains") < registry.priority("minContains"));
        assert!(registry.priority("if") < registry.priority("then"));
        assert!(registry.priority("if") < registry.priority("else"));
    }

    #[test]
    fn test_unevaluated_runs_last() {
        let registry = KeywordRegistry::with_builtin();
        assert_eq!(registry.priority("unevaluatedItems"), LAST_PRIORITY);
        assert_eq!(registry.priority("unevaluatedProperties"), LAST_PRIORITY);
        assert!(registry.priority("additionalItems") < LAST_PRIORITY);
    }

    #[test]
    fn test_unknown_keyword_has_default_tier() {
        let registry = KeywordRegistry::with_builtin();
        assert_eq!(registry.priority("x-vendor"), DEFAULT_PRIORITY);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let err = KeywordRegistry::from_handlers(vec![
            probe("alpha", &["beta"]),
            probe("beta", &["alpha"]),
            probe("gamma", &[]),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            RegistryError::DependencyCycle {
                keywords: vec!["alpha".into(), "beta".into()]
            }
        );
    }

    #[test]
    fn test_depending_on_last_tier_is_a_cycle() {
        let result = KeywordRegistry::from_handlers(vec![
            probe("unevaluatedProperties", &[]),
            probe("eager", &["unevaluatedProperties"]),
        ]);
        assert!(matches!(result, Err(RegistryError::DependencyCycle { .. })));
    }

    #[test]
    fn test_register_failure_leaves_registry_unchanged() {
        let mut registry = KeywordRegistry::from_handlers(vec![probe("alpha", &["beta"])]).unwrap();
        let before = registry.priority("alpha");
        assert!(registry.register(probe("beta", &["alpha"])).is_err());
        assert!(registry.get("beta").is_none());
        assert_eq!(registry.priority("alpha"), before);
    }

    #[test]
    fn test_unregistered_dependency_does_not_block() {
        let registry = KeywordRegistry::from_handlers(vec![probe("alpha", &["missing"])]).unwrap();
        assert_eq!(registry.priority("alpha"), DEFAULT_PRIORITY);
    }

    #[test]
    fn test_ordered_handlers_for_sorts_by_tier() {
        let registry = KeywordRegistry::with_builtin();
        let schema = json!({
            "unevaluatedProperties": false,
            "additionalProperties": true,
            "properties": {},
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "x-unknown": 1
        });
        let map = schema.as_object().unwrap();
        let pairs = registry.ordered_handlers_for(map, None, Dialect::Draft202012);
        let names: Vec<&str> = pairs.iter().map(|(n, _, _)| *n).collect();
        assert_eq!(names.first(), Some(&"$schema"));
        assert_eq!(names.last(), Some(&"unevaluatedProperties"));
        let pos = |n: &str| names.iter().position(|x| *x == n).unwrap();
        assert!(pos("properties") < pos("additionalProperties"));
        assert!(pairs[pos("x-unknown")].2.is_none());
    }

    #[test]
    fn test_handler_for_respects_dialect() {
        let registry = KeywordRegistry::with_builtin();
        assert!(registry.handler_for("prefixItems", None, Dialect::Draft202012).is_some());
        assert!(registry.handler_for("prefixItems", None, Dialect::Draft7).is_none());
        assert!(registry.handler_for("$recursiveRef", None, Dialect::Draft202012).is_none());
    }

    #[test]
    fn test_handler_for_respects_vocabulary() {
        let registry = KeywordRegistry::with_builtin();
        let mut set = HandlerSet::new();
        set.insert("type".into(), registry.get("type").unwrap());
        assert!(registry.handler_for("type", Some(&set), Dialect::Draft202012).is_some());
        assert!(registry.handler_for("minimum", Some(&set), Dialect::Draft202012).is_none());
    }
}
