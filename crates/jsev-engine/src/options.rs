//! # Evaluation Options — Configuration
//!
//! [`EvaluationOptions`] carries the two serializable settings every
//! evaluation reads, plus optional injected registries and a retriever.
//!
//! ## Sources
//!
//! - Code: `EvaluationOptions::default()` and the `with_*` builders.
//! - Files: [`EvaluationOptions::from_file`] reads JSON or YAML (camelCase
//!   field names, every field optional).
//! - Environment: [`EvaluationOptions::with_env_overrides`] applies
//!   `JSEV_REQUIRE_FORMAT` and `JSEV_DEFAULT_DIALECT` on top.
//!
//! Injected registries are never serialized. When one is absent the
//! process-wide registry of that kind is used.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use jsev_core::{Dialect, FormatRegistry};
use serde::{Deserialize, Serialize};

use crate::registry::{KeywordRegistry, SchemaRegistry, VocabularyRegistry};
use crate::retrieve::Retrieve;

/// Environment variable overriding `requireFormatValidation`.
pub const ENV_REQUIRE_FORMAT: &str = "JSEV_REQUIRE_FORMAT";
/// Environment variable overriding `defaultDialect`.
pub const ENV_DEFAULT_DIALECT: &str = "JSEV_DEFAULT_DIALECT";

/// Settings for one or more evaluations.
///
/// Custom `Debug` reports injected registries by presence only.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EvaluationOptions {
    /// Make `format` assert under dialects where it only annotates.
    pub require_format_validation: bool,
    /// Dialect for schemas without `$schema`.
    pub default_dialect: Dialect,
    /// Registry the root schema is layered over.
    #[serde(skip)]
    pub schema_registry: Option<Arc<SchemaRegistry>>,
    /// Keyword handlers.
    #[serde(skip)]
    pub keyword_registry: Option<Arc<KeywordRegistry>>,
    /// Vocabulary definitions.
    #[serde(skip)]
    pub vocabulary_registry: Option<Arc<VocabularyRegistry>>,
    /// Format checkers.
    #[serde(skip)]
    pub formats: Option<Arc<FormatRegistry>>,
    /// Source for referenced resources no registry holds.
    #[serde(skip)]
    pub retriever: Option<Arc<dyn Retrieve>>,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            require_format_validation: false,
            default_dialect: Dialect::Draft202012,
            schema_registry: None,
            keyword_registry: None,
            vocabulary_registry: None,
            formats: None,
            retriever: None,
        }
    }
}

impl fmt::Debug for EvaluationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let injected = |present: bool| if present { "injected" } else { "global" };
        f.debug_struct("EvaluationOptions")
            .field("require_format_validation", &self.require_format_validation)
            .field("default_dialect", &self.default_dialect)
            .field("schema_registry", &injected(self.schema_registry.is_some()))
            .field("keyword_registry", &injected(self.keyword_registry.is_some()))
            .field("vocabulary_registry", &injected(self.vocabulary_registry.is_some()))
            .field("formats", &injected(self.formats.is_some()))
            .field("retriever", &self.retriever)
            .finish()
    }
}

impl EvaluationOptions {
    pub fn with_require_format_validation(mut self, require: bool) -> Self {
        self.require_format_validation = require;
        self
    }

    pub fn with_default_dialect(mut self, dialect: Dialect) -> Self {
        self.default_dialect = dialect;
        self
    }

    pub fn with_schema_registry(mut self, registry: Arc<SchemaRegistry>) -> Self {
        self.schema_registry = Some(registry);
        self
    }

    pub fn with_keyword_registry(mut self, registry: Arc<KeywordRegistry>) -> Self {
        self.keyword_registry = Some(registry);
        self
    }

    pub fn with_vocabulary_registry(mut self, registry: Arc<VocabularyRegistry>) -> Self {
        self.vocabulary_registry = Some(registry);
        self
    }

    pub fn with_formats(mut self, formats: Arc<FormatRegistry>) -> Self {
        self.formats = Some(formats);
        self
    }

    pub fn with_retriever(mut self, retriever: Arc<dyn Retrieve>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    // -- Loading ------------------------------------------------------------

    /// Parse options from JSON text.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] on malformed JSON or an unknown dialect.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse {
            source_name: "<json>".to_string(),
            reason: e.to_string(),
        })
    }

    /// Parse options from YAML text.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] on malformed YAML or an unknown dialect.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(|e| ConfigError::Parse {
            source_name: "<yaml>".to_string(),
            reason: e.to_string(),
        })
    }

    /// Load options from a `.json`, `.yaml` or `.yml` file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Read`] if the file cannot be read, [`ConfigError::Parse`]
    /// if its content does not describe valid options.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let parsed = if yaml {
            Self::from_yaml_str(&text)
        } else {
            Self::from_json_str(&text)
        };
        let options = parsed.map_err(|err| match err {
            ConfigError::Parse { reason, .. } => ConfigError::Parse {
                source_name: path.display().to_string(),
                reason,
            },
            other => other,
        })?;
        tracing::debug!(path = %path.display(), ?options, "loaded evaluation options");
        Ok(options)
    }

    /// Apply `JSEV_REQUIRE_FORMAT` (`true`/`false`/`1`/`0`) and
    /// `JSEV_DEFAULT_DIALECT` (name or meta-schema URI) when set.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidEnv`] if a set variable has an unusable value.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|var| std::env::var(var).ok())
    }

    fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(raw) = lookup(ENV_REQUIRE_FORMAT) {
            self.require_format_validation = match raw.trim() {
                "1" | "true" => true,
                "0" | "false" => false,
                other => {
                    return Err(ConfigError::InvalidEnv(
                        ENV_REQUIRE_FORMAT.to_string(),
                        format!("expected a boolean, got {other:?}"),
                    ))
                }
            };
        }
        if let Some(raw) = lookup(ENV_DEFAULT_DIALECT) {
            self.default_dialect = raw
                .trim()
                .parse()
                .map_err(|e| ConfigError::InvalidEnv(ENV_DEFAULT_DIALECT.to_string(), format!("{e}")))?;
        }
        Ok(self)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read options file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid options in {source_name}: {reason}")]
    Parse { source_name: String, reason: String },
    #[error("invalid value for {0}: {1}")]
    InvalidEnv(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let options = EvaluationOptions::default();
        assert!(!options.require_format_validation);
        assert_eq!(options.default_dialect, Dialect::Draft202012);
        assert!(options.schema_registry.is_none());
    }

    #[test]
    fn test_json_uses_camel_case_and_partial_fields() {
        let options = EvaluationOptions::from_json_str(r#"{"requireFormatValidation": true}"#).unwrap();
        assert!(options.require_format_validation);
        assert_eq!(options.default_dialect, Dialect::Draft202012);

        let options = EvaluationOptions::from_json_str(
            r#"{"defaultDialect": "http://json-schema.org/draft-07/schema#"}"#,
        )
        .unwrap();
        assert_eq!(options.default_dialect, Dialect::Draft7);
    }

    #[test]
    fn test_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jsev.yaml");
        std::fs::write(
            &path,
            "requireFormatValidation: true\ndefaultDialect: https://json-schema.org/draft/2019-09/schema\n",
        )
        .unwrap();
        let options = EvaluationOptions::from_file(&path).unwrap();
        assert!(options.require_format_validation);
        assert_eq!(options.default_dialect, Dialect::Draft201909);
    }

    #[test]
    fn test_parse_error_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"defaultDialect": "draft-99"}"#).unwrap();
        let err = EvaluationOptions::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("bad.json"), "{err}");
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_REQUIRE_FORMAT, "1"),
            (ENV_DEFAULT_DIALECT, "http://json-schema.org/draft-06/schema#"),
        ]
        .into_iter()
        .collect();
        let options = EvaluationOptions::default()
            .with_overrides(|var| vars.get(var).map(|v| v.to_string()))
            .unwrap();
        assert!(options.require_format_validation);
        assert_eq!(options.default_dialect, Dialect::Draft6);

        let bad = EvaluationOptions::default()
            .with_overrides(|var| (var == ENV_REQUIRE_FORMAT).then(|| "maybe".to_string()));
        assert!(matches!(bad, Err(ConfigError::InvalidEnv(..))));
    }

    #[test]
    fn test_debug_hides_registries() {
        let options =
            EvaluationOptions::default().with_schema_registry(Arc::new(SchemaRegistry::new()));
        let rendered = format!("{options:?}");
        assert!(rendered.contains("schema_registry: \"injected\""));
        assert!(rendered.contains("keyword_registry: \"global\""));
    }
}
