//! # Retrieval — Non-local Reference Hook
//!
//! The engine never performs network I/O. References to resources that are
//! not registered are satisfied, if at all, by a [`Retrieve`] implementation
//! supplied through [`EvaluationOptions`](crate::options::EvaluationOptions).
//! Retrieval happens eagerly, while the root schema is registered, so
//! evaluation itself never blocks on a retriever.
//!
//! - [`DirectoryRetriever`] serves `*.json`, `*.yaml` and `*.yml` files from
//!   a local directory, by `$id` and by file name.
//! - [`InMemoryRetriever`] serves a fixed URI → document map.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use url::Url;

/// Fetches a schema document by absolute URI.
pub trait Retrieve: Send + Sync + fmt::Debug {
    /// The document at `uri` (which has no fragment).
    ///
    /// # Errors
    ///
    /// Any error; it is reported as a retrieval failure for `uri`.
    fn retrieve(&self, uri: &Url) -> Result<Value, Box<dyn StdError + Send + Sync>>;
}

/// Error loading a schema or instance document from disk.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File path.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON or YAML.
    #[error("failed to parse {path}: {reason}")]
    Parse {
        /// File path.
        path: String,
        /// Parser diagnostic.
        reason: String,
    },
}

/// Load a JSON or YAML document. `.yaml` and `.yml` files are parsed as
/// YAML; everything else as JSON.
///
/// # Errors
///
/// [`LoadError::Read`] or [`LoadError::Parse`].
pub fn load_document(path: &Path) -> Result<Value, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let parse_error = |reason: String| LoadError::Parse {
        path: path.display().to_string(),
        reason,
    };
    if is_yaml(path) {
        serde_yaml::from_str(&content).map_err(|e| parse_error(e.to_string()))
    } else {
        serde_json::from_str(&content).map_err(|e| parse_error(e.to_string()))
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

fn is_document(path: &Path) -> bool {
    is_yaml(path) || path.extension().and_then(|e| e.to_str()) == Some("json")
}

// ---------------------------------------------------------------------------
// DirectoryRetriever
// ---------------------------------------------------------------------------

/// Serves schema documents from a local directory tree.
///
/// Each document is reachable by its `$id` (without fragment) and by the
/// last path segment of any requested URI matching its file name, so
/// `https://example.com/schemas/address.json` finds `address.json` even if
/// the file carries no `$id`.
pub struct DirectoryRetriever {
    root: PathBuf,
    by_id: HashMap<String, Value>,
    by_file_name: HashMap<String, Value>,
}

impl fmt::Debug for DirectoryRetriever {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryRetriever")
            .field("root", &self.root)
            .field("documents", &self.by_file_name.len())
            .finish()
    }
}

impl DirectoryRetriever {
    /// Load every document under `root`, recursively.
    ///
    /// # Errors
    ///
    /// [`LoadError`] if a directory cannot be listed or a document cannot be
    /// read or parsed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, LoadError> {
        let root = root.into();
        let mut paths = Vec::new();
        walk(&root, &mut paths)?;
        paths.sort();

        let mut by_id = HashMap::new();
        let mut by_file_name = HashMap::new();
        for path in paths {
            let document = load_document(&path)?;
            if let Some(id) = document.get("$id").and_then(Value::as_str) {
                let id = id.split('#').next().unwrap_or(id).to_string();
                by_id.insert(id, document.clone());
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                by_file_name.insert(name.to_string(), document);
            }
        }
        tracing::debug!(root = %root.display(), documents = by_file_name.len(), "indexed schema directory");
        Ok(Self {
            root,
            by_id,
            by_file_name,
        })
    }

    /// Number of documents loaded.
    pub fn len(&self) -> usize {
        self.by_file_name.len()
    }

    /// True if the directory held no documents.
    pub fn is_empty(&self) -> bool {
        self.by_file_name.is_empty()
    }
}

fn walk(dir: &Path, acc: &mut Vec<PathBuf>) -> Result<(), LoadError> {
    let read_error = |source: std::io::Error| LoadError::Read {
        path: dir.display().to_string(),
        source,
    };
    for entry in std::fs::read_dir(dir).map_err(read_error)? {
        let path = entry.map_err(read_error)?.path();
        if path.is_dir() {
            walk(&path, acc)?;
        } else if is_document(&path) {
            acc.push(path);
        }
    }
    Ok(())
}

impl Retrieve for DirectoryRetriever {
    fn retrieve(&self, uri: &Url) -> Result<Value, Box<dyn StdError + Send + Sync>> {
        if let Some(document) = self.by_id.get(uri.as_str()) {
            return Ok(document.clone());
        }
        uri.path_segments()
            .and_then(|mut segments| segments.next_back())
            .and_then(|name| self.by_file_name.get(name))
            .cloned()
            .ok_or_else(|| format!("no document for {uri} under {}", self.root.display()).into())
    }
}

// ---------------------------------------------------------------------------
// InMemoryRetriever
// ---------------------------------------------------------------------------

/// A fixed URI → document map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRetriever {
    documents: HashMap<String, Value>,
}

impl InMemoryRetriever {
    /// An empty retriever; every lookup fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document at `uri`.
    pub fn with(mut self, uri: &str, document: Value) -> Self {
        self.documents.insert(uri.to_string(), document);
        self
    }
}

impl Retrieve for InMemoryRetriever {
    fn retrieve(&self, uri: &Url) -> Result<Value, Box<dyn StdError + Send + Sync>> {
        self.documents
            .get(uri.as_str())
            .cloned()
            .ok_or_else(|| format!("schema not found for URI: {uri}").into())
    }
}
