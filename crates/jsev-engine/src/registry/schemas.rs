//! # Schema Registry — Resources, Anchors and Node Identity
//!
//! Holds every schema document the engine can reach and answers the
//! questions reference resolution asks:
//!
//! - which value does an absolute URI (with or without fragment) name,
//! - what is the canonical resource URI and pointer of that value,
//! - is a given value the root of a resource (it carries `$id`),
//! - does a resource declare a dynamic or recursive anchor.
//!
//! ## Indexing
//!
//! Registering a document walks it once, following only keywords whose
//! values are subschemas. Every schema object visited is indexed by its
//! address inside the shared `Arc<Value>`; documents are never mutated after
//! registration, so addresses stay valid for the registry's lifetime. A
//! walk that fails (an `$id` that is not a URI reference) leaves the
//! registry unchanged.
//!
//! ## Layering
//!
//! A registry may have a parent. Lookups that miss locally fall through to
//! the parent, so a per-evaluation registry layered over [`SchemaRegistry::global`]
//! sees the built-in meta-schemas without copying them.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

use jsev_core::{sha256_digest, CanonicalBytes, Dialect, JsonPointer, RegistryError};
use parking_lot::RwLock;
use serde_json::Value;
use url::Url;

use crate::metaschema;
use crate::retrieve::Retrieve;

/// Keywords whose value is an object of subschemas.
const SCHEMA_MAP_KEYWORDS: &[&str] = &[
    "properties",
    "patternProperties",
    "$defs",
    "definitions",
    "dependentSchemas",
];

/// Keywords whose value is an array of subschemas.
const SCHEMA_ARRAY_KEYWORDS: &[&str] = &["allOf", "anyOf", "oneOf", "prefixItems"];

/// Keywords whose value is a single subschema.
const SCHEMA_KEYWORDS: &[&str] = &[
    "additionalProperties",
    "additionalItems",
    "not",
    "if",
    "then",
    "else",
    "contains",
    "propertyNames",
    "unevaluatedItems",
    "unevaluatedProperties",
    "contentSchema",
];

/// A value located by URI, with its canonical location.
#[derive(Debug, Clone)]
pub struct Resolved<'r> {
    /// The schema value.
    pub value: &'r Value,
    /// URI of the innermost resource containing the value.
    pub base: Arc<Url>,
    /// Pointer from that resource's root to the value.
    pub pointer: JsonPointer,
}

#[derive(Debug, Clone)]
struct Resource {
    document: Arc<Value>,
    /// Location of the resource root inside `document`.
    pointer: JsonPointer,
    base: Arc<Url>,
    recursive_anchor: bool,
}

#[derive(Debug, Clone)]
struct Anchor {
    document: Arc<Value>,
    pointer: JsonPointer,
    dynamic: bool,
}

#[derive(Debug, Clone)]
struct NodeInfo {
    base: Arc<Url>,
    pointer: JsonPointer,
    resource_root: bool,
}

/// Everything learned from walking documents.
#[derive(Debug, Clone, Default)]
struct Index {
    resources: HashMap<String, Resource>,
    anchors: HashMap<String, Anchor>,
    nodes: HashMap<usize, NodeInfo>,
    references: HashSet<String>,
    /// Keeps every registered document alive so indexed addresses are never
    /// reused, even after a resource URI is re-registered.
    documents: Vec<Arc<Value>>,
}

impl Index {
    fn merge(&mut self, other: Index) {
        for (uri, resource) in other.resources {
            if self.resources.insert(uri.clone(), resource).is_some() {
                tracing::debug!(uri = %uri, "replaced schema resource");
            }
        }
        self.anchors.extend(other.anchors);
        self.nodes.extend(other.nodes);
        self.references.extend(other.references);
        self.documents.extend(other.documents);
    }
}

/// Cursor of the registration walk.
struct Walk {
    document: Arc<Value>,
    base: Arc<Url>,
    /// Pointer from the current resource root.
    relative: JsonPointer,
    dialect: Dialect,
}

fn address(value: &Value) -> usize {
    value as *const Value as usize
}

fn without_fragment(uri: &Url) -> Url {
    let mut stripped = uri.clone();
    stripped.set_fragment(None);
    stripped
}

fn anchor_key(resource: &Url, name: &str) -> String {
    format!("{resource}#{name}")
}

// ---------------------------------------------------------------------------
// SchemaRegistry
// ---------------------------------------------------------------------------

/// URI → schema resource store.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    index: Index,
    parent: Option<Arc<SchemaRegistry>>,
    /// Dialect assumed while indexing documents without `$schema`.
    default_dialect: Option<Dialect>,
}

impl SchemaRegistry {
    /// An empty registry with no parent.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty registry whose misses fall through to `parent`.
    pub fn with_parent(parent: Arc<SchemaRegistry>) -> Self {
        Self {
            index: Index::default(),
            parent: Some(parent),
            default_dialect: None,
        }
    }

    /// Index documents without `$schema` under `dialect` instead of the
    /// parent's choice (2020-12 when nothing is set).
    pub fn with_default_dialect(mut self, dialect: Dialect) -> Self {
        self.default_dialect = Some(dialect);
        self
    }

    fn indexing_dialect(&self) -> Dialect {
        self.default_dialect
            .or_else(|| self.parent.as_ref().map(|parent| parent.indexing_dialect()))
            .unwrap_or(Dialect::Draft202012)
    }

    /// A registry holding the built-in meta-schemas of every dialect.
    pub fn with_metaschemas() -> Self {
        let mut registry = Self::new();
        for document in metaschema::documents() {
            if let Err(err) = registry.register(document) {
                tracing::error!(error = %err, "failed to register built-in meta-schema");
            }
        }
        registry
    }

    /// Register a document under its own `$id`, or under a synthetic
    /// content-derived URI if it has none. Returns the root resource URI.
    ///
    /// # Errors
    ///
    /// [`RegistryError::InvalidIdentifier`] for an `$id` that is not a URI
    /// reference; [`RegistryError::Canonicalization`] if the synthetic URI
    /// cannot be derived.
    pub fn register(&mut self, document: Value) -> Result<Arc<Url>, RegistryError> {
        let declared = document
            .get("$id")
            .and_then(Value::as_str)
            .filter(|id| !id.starts_with('#'))
            .and_then(|id| Url::parse(id).ok());
        let initial = match declared {
            Some(url) => url,
            None => synthetic_uri(&document)?,
        };
        self.insert_document(Arc::new(document), initial)
    }

    /// Register a document under `uri`. A root `$id` is resolved against
    /// `uri`; the document then answers to both.
    ///
    /// # Errors
    ///
    /// [`RegistryError::InvalidIdentifier`] if `uri` or any `$id` in the
    /// document is not a valid URI reference.
    pub fn register_with_uri(&mut self, uri: &str, document: Value) -> Result<Arc<Url>, RegistryError> {
        let initial = Url::parse(uri).map_err(|err| RegistryError::InvalidIdentifier {
            identifier: uri.to_string(),
            reason: err.to_string(),
        })?;
        self.insert_document(Arc::new(document), initial)
    }

    fn insert_document(&mut self, document: Arc<Value>, initial: Url) -> Result<Arc<Url>, RegistryError> {
        let initial = Arc::new(without_fragment(&initial));
        let mut staged = Index::default();
        staged.resources.insert(
            initial.to_string(),
            Resource {
                document: Arc::clone(&document),
                pointer: JsonPointer::root(),
                base: Arc::clone(&initial),
                recursive_anchor: false,
            },
        );
        let walk = Walk {
            document: Arc::clone(&document),
            base: Arc::clone(&initial),
            relative: JsonPointer::root(),
            dialect: self.indexing_dialect(),
        };
        index_schema(&mut staged, &walk, &document, JsonPointer::root(), true)?;

        let root = staged
            .nodes
            .get(&address(&document))
            .map(|node| Arc::clone(&node.base))
            .unwrap_or(initial);
        let recursive = staged
            .resources
            .get(root.as_str())
            .is_some_and(|r| r.recursive_anchor);
        if recursive {
            // The registration alias shares the root's recursive anchor.
            for alias in staged.resources.values_mut().filter(|r| r.pointer.is_empty()) {
                alias.recursive_anchor = true;
            }
        }
        staged.documents.push(document);
        tracing::debug!(uri = %root, resources = staged.resources.len(), "registered schema document");
        self.index.merge(staged);
        Ok(root)
    }

    /// True if a resource is registered at `uri` (fragment ignored), here
    /// or in a parent.
    pub fn contains(&self, uri: &Url) -> bool {
        self.resource(&without_fragment(uri)).is_some()
    }

    /// URIs of resources registered directly in this registry.
    pub fn uris(&self) -> Vec<String> {
        let mut uris: Vec<String> = self.index.resources.keys().cloned().collect();
        uris.sort();
        uris
    }

    /// Number of resources registered directly in this registry.
    pub fn len(&self) -> usize {
        self.index.resources.len()
    }

    /// True if nothing is registered directly in this registry.
    pub fn is_empty(&self) -> bool {
        self.index.resources.is_empty()
    }

    fn resource(&self, uri: &Url) -> Option<&Resource> {
        self.index
            .resources
            .get(uri.as_str())
            .or_else(|| self.parent.as_deref().and_then(|p| p.resource(uri)))
    }

    fn anchor(&self, key: &str) -> Option<&Anchor> {
        self.index
            .anchors
            .get(key)
            .or_else(|| self.parent.as_deref().and_then(|p| p.anchor(key)))
    }

    fn node(&self, value: &Value) -> Option<&NodeInfo> {
        let key = address(value);
        self.index
            .nodes
            .get(&key)
            .or_else(|| self.parent.as_deref().and_then(|p| p.node(value)))
    }

    // -- Lookup -------------------------------------------------------------

    /// Locate the value named by an absolute URI.
    ///
    /// An empty or `/`-prefixed fragment is a JSON pointer from the resource
    /// root; any other fragment names an anchor. Meta-schema URIs match
    /// regardless of `http`/`https` and a trailing `#`.
    pub fn resolve(&self, uri: &Url) -> Option<Resolved<'_>> {
        if let Some(found) = self.lookup(uri) {
            return Some(found);
        }
        let resource = without_fragment(uri);
        let canonical = Dialect::from_uri(resource.as_str())?.meta_schema_uri();
        let mut aliased = Url::parse(canonical).ok()?;
        if aliased.as_str().trim_end_matches('#') == resource.as_str() {
            return None;
        }
        aliased.set_fragment(uri.fragment());
        self.lookup(&aliased)
    }

    fn lookup(&self, uri: &Url) -> Option<Resolved<'_>> {
        let resource_uri = without_fragment(uri);
        let fragment = uri.fragment().unwrap_or("");
        if fragment.is_empty() || fragment.starts_with('/') {
            let resource = self.resource(&resource_uri)?;
            let pointer = JsonPointer::from_uri_fragment(fragment).ok()?;
            let root = resource.pointer.resolve(&resource.document)?;
            let value = pointer.resolve(root)?;
            return Some(self.located(value, &resource.base, pointer));
        }
        let anchor = self.anchor(&anchor_key(&resource_uri, fragment))?;
        let value = anchor.pointer.resolve(&anchor.document)?;
        let fallback = Arc::new(resource_uri);
        Some(self.located(value, &fallback, JsonPointer::root()))
    }

    /// Attach the canonical location of `value`, falling back to the
    /// location it was reached by when the value is not an indexed schema.
    fn located<'r>(&'r self, value: &'r Value, base: &Arc<Url>, pointer: JsonPointer) -> Resolved<'r> {
        match self.node(value) {
            Some(node) => Resolved {
                value,
                base: Arc::clone(&node.base),
                pointer: node.pointer.clone(),
            },
            None => Resolved {
                value,
                base: Arc::clone(base),
                pointer,
            },
        }
    }

    /// The resource URI of `value` if it is the root of a registered
    /// resource. Identity is by address, so only values held by this
    /// registry (or its parents) match.
    pub fn resource_base(&self, value: &Value) -> Option<Arc<Url>> {
        self.node(value)
            .filter(|node| node.resource_root)
            .map(|node| Arc::clone(&node.base))
    }

    /// True if `resource` declares `$dynamicAnchor: name`.
    pub fn has_dynamic_anchor(&self, resource: &Url, name: &str) -> bool {
        self.anchor(&anchor_key(&without_fragment(resource), name))
            .is_some_and(|anchor| anchor.dynamic)
    }

    /// The schema carrying `$dynamicAnchor: name` in `resource`.
    pub fn dynamic_anchor(&self, resource: &Url, name: &str) -> Option<Resolved<'_>> {
        if !self.has_dynamic_anchor(resource, name) {
            return None;
        }
        let mut uri = without_fragment(resource);
        uri.set_fragment(Some(name));
        self.lookup(&uri)
    }

    /// True if the root of `resource` has `$recursiveAnchor: true`.
    pub fn has_recursive_anchor(&self, resource: &Url) -> bool {
        self.resource(&without_fragment(resource))
            .is_some_and(|r| r.recursive_anchor)
    }

    // -- Retrieval ----------------------------------------------------------

    /// URIs referenced by registered documents that no registry in the
    /// chain holds.
    pub fn missing_references(&self) -> Vec<Url> {
        let mut missing: Vec<Url> = self
            .index
            .references
            .iter()
            .filter_map(|uri| Url::parse(uri).ok())
            .filter(|uri| self.resolve(uri).is_none())
            .collect();
        missing.sort();
        missing
    }

    /// Fetch every missing referenced resource through `retriever`, until
    /// no new references appear. Returns the number of documents added.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Retrieval`] if the retriever fails, or any error
    /// registering a retrieved document.
    pub fn retrieve_missing(&mut self, retriever: &dyn Retrieve) -> Result<usize, RegistryError> {
        let mut attempted: HashSet<Url> = HashSet::new();
        let mut added = 0;
        loop {
            let pending: Vec<Url> = self
                .missing_references()
                .into_iter()
                .filter(|uri| !attempted.contains(uri))
                .collect();
            if pending.is_empty() {
                return Ok(added);
            }
            for uri in pending {
                let document = retriever.retrieve(&uri).map_err(|err| RegistryError::Retrieval {
                    uri: uri.to_string(),
                    reason: err.to_string(),
                })?;
                tracing::info!(uri = %uri, "retrieved schema resource");
                self.register_with_uri(uri.as_str(), document)?;
                attempted.insert(uri);
                added += 1;
            }
        }
    }

    // -- Global -------------------------------------------------------------

    /// Snapshot of the process-wide registry.
    pub fn global() -> Arc<SchemaRegistry> {
        Arc::clone(&global_cell().read())
    }

    /// Register a document in the process-wide registry.
    ///
    /// # Errors
    ///
    /// As [`SchemaRegistry::register`]; the global registry is unchanged.
    pub fn register_global(document: Value) -> Result<Arc<Url>, RegistryError> {
        let mut guard = global_cell().write();
        let mut next = SchemaRegistry::clone(&guard);
        let uri = next.register(document)?;
        *guard = Arc::new(next);
        Ok(uri)
    }
}

fn global_cell() -> &'static RwLock<Arc<SchemaRegistry>> {
    static GLOBAL: OnceLock<RwLock<Arc<SchemaRegistry>>> = OnceLock::new();
    GLOBAL.get_or_init(|| RwLock::new(Arc::new(SchemaRegistry::with_metaschemas())))
}

fn synthetic_uri(document: &Value) -> Result<Url, RegistryError> {
    let bytes = CanonicalBytes::new(document)
        .map_err(|err| RegistryError::Canonicalization(err.to_string()))?;
    let id = sha256_digest(&bytes).synthetic_id();
    Url::parse(&id).map_err(|err| RegistryError::InvalidIdentifier {
        identifier: id,
        reason: err.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Walk
// ---------------------------------------------------------------------------

fn index_schema(
    index: &mut Index,
    parent: &Walk,
    value: &Value,
    in_document: JsonPointer,
    document_root: bool,
) -> Result<(), RegistryError> {
    let Value::Object(object) = value else {
        return Ok(());
    };

    let mut walk = Walk {
        document: Arc::clone(&parent.document),
        base: Arc::clone(&parent.base),
        relative: parent.relative.clone(),
        dialect: object
            .get("$schema")
            .and_then(Value::as_str)
            .and_then(Dialect::from_uri)
            .unwrap_or(parent.dialect),
    };
    let mut resource_root = document_root;
    // Under draft-06/07 a `$ref` hides its siblings, identifiers included.
    // A document root keeps its `$id` so it stays addressable.
    let identified = document_root || !(walk.dialect.ignores_ref_siblings() && object.contains_key("$ref"));

    match object.get("$id").and_then(Value::as_str).filter(|_| identified) {
        Some(id) if id.starts_with('#') => {
            let name = &id[1..];
            if !name.is_empty() {
                add_anchor(index, &walk, name, &in_document, false);
            }
        }
        Some(id) => {
            let joined = walk.base.join(id).map_err(|err| RegistryError::InvalidIdentifier {
                identifier: id.to_string(),
                reason: err.to_string(),
            })?;
            let resource = Arc::new(without_fragment(&joined));
            walk.base = Arc::clone(&resource);
            walk.relative = JsonPointer::root();
            resource_root = true;
            index.resources.insert(
                resource.to_string(),
                Resource {
                    document: Arc::clone(&walk.document),
                    pointer: in_document.clone(),
                    base: resource,
                    recursive_anchor: false,
                },
            );
            if let Some(name) = joined.fragment().filter(|f| !f.is_empty()) {
                add_anchor(index, &walk, name, &in_document, false);
            }
        }
        None => {}
    }

    index.nodes.insert(
        address(value),
        NodeInfo {
            base: Arc::clone(&walk.base),
            pointer: walk.relative.clone(),
            resource_root,
        },
    );

    if let Some(name) = object.get("$anchor").and_then(Value::as_str).filter(|_| identified) {
        add_anchor(index, &walk, name, &in_document, false);
    }
    if let Some(name) = object.get("$dynamicAnchor").and_then(Value::as_str).filter(|_| identified) {
        add_anchor(index, &walk, name, &in_document, true);
    }
    if resource_root && object.get("$recursiveAnchor") == Some(&Value::Bool(true)) {
        if let Some(resource) = index.resources.get_mut(walk.base.as_str()) {
            resource.recursive_anchor = true;
        }
    }
    for keyword in ["$ref", "$schema"] {
        if let Some(target) = object.get(keyword).and_then(Value::as_str) {
            if let Ok(uri) = walk.base.join(target) {
                index.references.insert(without_fragment(&uri).to_string());
            }
        }
    }

    let descend = |index: &mut Index, child: &Value, path: &[&str]| {
        let mut relative = walk.relative.clone();
        let mut absolute = in_document.clone();
        for segment in path {
            relative = relative.push(*segment);
            absolute = absolute.push(*segment);
        }
        let cursor = Walk {
            document: Arc::clone(&walk.document),
            base: Arc::clone(&walk.base),
            relative,
            dialect: walk.dialect,
        };
        index_schema(index, &cursor, child, absolute, false)
    };

    for (keyword, child) in object {
        let keyword = keyword.as_str();
        if SCHEMA_KEYWORDS.contains(&keyword) {
            descend(index, child, &[keyword])?;
        } else if SCHEMA_MAP_KEYWORDS.contains(&keyword) || keyword == "dependencies" {
            if let Value::Object(members) = child {
                for (name, member) in members {
                    descend(index, member, &[keyword, name.as_str()])?;
                }
            }
        } else if SCHEMA_ARRAY_KEYWORDS.contains(&keyword) || keyword == "items" {
            match child {
                Value::Array(items) => {
                    for (i, item) in items.iter().enumerate() {
                        let position = i.to_string();
                        descend(index, item, &[keyword, position.as_str()])?;
                    }
                }
                other if keyword == "items" => descend(index, other, &[keyword])?,
                _ => {}
            }
        }
    }
    Ok(())
}

fn add_anchor(index: &mut Index, walk: &Walk, name: &str, in_document: &JsonPointer, dynamic: bool) {
    let key = anchor_key(&walk.base, name);
    let entry = index.anchors.entry(key).or_insert_with(|| Anchor {
        document: Arc::clone(&walk.document),
        pointer: in_document.clone(),
        dynamic,
    });
    entry.dynamic |= dynamic;
}
