//! # Built-in Meta-Schemas
//!
//! The published meta-schemas of every supported dialect, embedded at
//! compile time and parsed when the global schema registry is first used.
//!
//! | Dialect | Documents |
//! |---------|-----------|
//! | draft-06 | `schema` |
//! | draft-07 | `schema` |
//! | 2019-09 | `schema` + core, applicator, validation, meta-data, format, content |
//! | 2020-12 | `schema` + core, applicator, unevaluated, validation, meta-data, format-annotation, format-assertion, content |

use serde_json::Value;

/// (file name, source text) for every embedded meta-schema.
const SOURCES: &[(&str, &str)] = &[
    ("draft-06/schema.json", include_str!("../metaschemas/draft-06/schema.json")),
    ("draft-07/schema.json", include_str!("../metaschemas/draft-07/schema.json")),
    ("2019-09/schema.json", include_str!("../metaschemas/2019-09/schema.json")),
    ("2019-09/meta/core.json", include_str!("../metaschemas/2019-09/meta/core.json")),
    ("2019-09/meta/applicator.json", include_str!("../metaschemas/2019-09/meta/applicator.json")),
    ("2019-09/meta/validation.json", include_str!("../metaschemas/2019-09/meta/validation.json")),
    ("2019-09/meta/meta-data.json", include_str!("../metaschemas/2019-09/meta/meta-data.json")),
    ("2019-09/meta/format.json", include_str!("../metaschemas/2019-09/meta/format.json")),
    ("2019-09/meta/content.json", include_str!("../metaschemas/2019-09/meta/content.json")),
    ("2020-12/schema.json", include_str!("../metaschemas/2020-12/schema.json")),
    ("2020-12/meta/core.json", include_str!("../metaschemas/2020-12/meta/core.json")),
    ("2020-12/meta/applicator.json", include_str!("../metaschemas/2020-12/meta/applicator.json")),
    ("2020-12/meta/unevaluated.json", include_str!("../metaschemas/2020-12/meta/unevaluated.json")),
    ("2020-12/meta/validation.json", include_str!("../metaschemas/2020-12/meta/validation.json")),
    ("2020-12/meta/meta-data.json", include_str!("../metaschemas/2020-12/meta/meta-data.json")),
    (
        "2020-12/meta/format-annotation.json",
        include_str!("../metaschemas/2020-12/meta/format-annotation.json"),
    ),
    (
        "2020-12/meta/format-assertion.json",
        include_str!("../metaschemas/2020-12/meta/format-assertion.json"),
    ),
    ("2020-12/meta/content.json", include_str!("../metaschemas/2020-12/meta/content.json")),
];

/// Parse every embedded meta-schema. A document that fails to parse is
/// logged and left out.
pub fn documents() -> Vec<Value> {
    SOURCES
        .iter()
        .filter_map(|(name, source)| match serde_json::from_str(source) {
            Ok(document) => Some(document),
            Err(err) => {
                tracing::error!(file = name, error = %err, "embedded meta-schema does not parse");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsev_core::Dialect;

    #[test]
    fn test_every_document_parses() {
        assert_eq!(documents().len(), SOURCES.len());
    }

    #[test]
    fn test_every_dialect_has_its_meta_schema() {
        let ids: Vec<String> = documents()
            .iter()
            .filter_map(|d| d.get("$id").and_then(Value::as_str).map(str::to_string))
            .collect();
        for dialect in Dialect::all() {
            assert!(
                ids.iter().any(|id| id == dialect.meta_schema_uri()),
                "missing meta-schema for {dialect}"
            );
        }
    }
}
