//! # Evaluation Results — The Output Diagnostic Tree
//!
//! One [`EvaluationResults`] node is created for every schema node the engine
//! visits. Nodes are immutable once built and are composed bottom-up: a
//! parent owns the nodes produced by the subschemas its keywords applied.
//!
//! ## Wire Format
//!
//! ```json
//! {
//!   "valid": false,
//!   "schemaLocation": "https://example.com/s#/properties/a",
//!   "instanceLocation": "/a",
//!   "evaluationPath": "/properties/a",
//!   "errors": { "type": "expected integer, found string" },
//!   "details": [ ... ]
//! }
//! ```
//!
//! `annotations`, `errors` and `details` are omitted when empty. A node
//! carries annotations only when it is valid, and errors only when it is not.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use jsev_core::JsonPointer;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A node of the results tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResults {
    /// Whether the instance location conforms to the schema node.
    pub valid: bool,
    /// Absolute URI of the schema node, with a JSON-pointer fragment.
    pub schema_location: String,
    /// Location within the instance.
    pub instance_location: JsonPointer,
    /// Keyword path followed from the root schema, including references.
    pub evaluation_path: JsonPointer,
    /// Keyword → annotation, present only on valid nodes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, Value>,
    /// Keyword → failure message, present only on invalid nodes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, String>,
    /// Results of subschemas applied by this node's keywords.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<EvaluationResults>,
}

impl EvaluationResults {
    /// A node with no annotations, errors or children.
    pub fn leaf(
        valid: bool,
        schema_location: impl Into<String>,
        instance_location: JsonPointer,
        evaluation_path: JsonPointer,
    ) -> Self {
        Self {
            valid,
            schema_location: schema_location.into(),
            instance_location,
            evaluation_path,
            annotations: BTreeMap::new(),
            errors: BTreeMap::new(),
            details: Vec::new(),
        }
    }

    /// The annotation a keyword produced at this node.
    pub fn annotation(&self, keyword: &str) -> Option<&Value> {
        self.annotations.get(keyword)
    }

    /// Depth-first, pre-order iterator over this node and all descendants.
    pub fn iter(&self) -> impl Iterator<Item = &EvaluationResults> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.details.iter().rev());
            Some(node)
        })
    }

    /// Render in the requested output format.
    pub fn render(&self, format: OutputFormat) -> Value {
        match format {
            OutputFormat::Flag => json!({ "valid": self.valid }),
            OutputFormat::List => {
                let details: Vec<Value> = self
                    .iter()
                    .filter(|node| !node.errors.is_empty() || !node.annotations.is_empty())
                    .map(Self::flat_unit)
                    .collect();
                json!({ "valid": self.valid, "details": details })
            }
            OutputFormat::Hierarchical => {
                serde_json::to_value(self).unwrap_or_else(|_| json!({ "valid": self.valid }))
            }
        }
    }

    fn flat_unit(&self) -> Value {
        let mut unit = serde_json::Map::new();
        unit.insert("valid".into(), Value::Bool(self.valid));
        unit.insert("schemaLocation".into(), Value::String(self.schema_location.clone()));
        unit.insert(
            "instanceLocation".into(),
            Value::String(self.instance_location.to_string()),
        );
        unit.insert(
            "evaluationPath".into(),
            Value::String(self.evaluation_path.to_string()),
        );
        if !self.annotations.is_empty() {
            let annotations = self.annotations.clone().into_iter().collect();
            unit.insert("annotations".into(), Value::Object(annotations));
        }
        if !self.errors.is_empty() {
            let errors = self
                .errors
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();
            unit.insert("errors".into(), Value::Object(errors));
        }
        Value::Object(unit)
    }
}

// ---------------------------------------------------------------------------
// OutputFormat
// ---------------------------------------------------------------------------

/// How much of the results tree to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `{"valid": bool}` only.
    Flag,
    /// Flat list of every node that carries errors or annotations.
    List,
    /// The full tree.
    #[default]
    Hierarchical,
}

impl OutputFormat {
    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::List => "list",
            Self::Hierarchical => "hierarchical",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flag" => Ok(Self::Flag),
            "list" | "basic" => Ok(Self::List),
            "hierarchical" | "verbose" => Ok(Self::Hierarchical),
            other => Err(format!(
                "unknown output format '{other}' (expected flag, list or hierarchical)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EvaluationResults {
        let root = JsonPointer::root();
        let mut child = EvaluationResults::leaf(
            false,
            "https://x/s#/properties/a",
            root.push("a"),
            root.push("properties").push("a"),
        );
        child.errors.insert("type".into(), "expected integer".into());
        let mut parent = EvaluationResults::leaf(false, "https://x/s#", root.clone(), root);
        parent.errors.insert("properties".into(), "property 'a' is invalid".into());
        parent.details.push(child);
        parent
    }

    #[test]
    fn test_empty_collections_are_omitted() {
        let leaf = EvaluationResults::leaf(true, "https://x/s#", JsonPointer::root(), JsonPointer::root());
        let v = serde_json::to_value(&leaf).unwrap();
        assert_eq!(
            v,
            json!({
                "valid": true,
                "schemaLocation": "https://x/s#",
                "instanceLocation": "",
                "evaluationPath": ""
            })
        );
    }

    #[test]
    fn test_field_names_are_camel_case() {
        let v = serde_json::to_value(sample()).unwrap();
        let details = v["details"].as_array().unwrap();
        assert_eq!(details[0]["instanceLocation"], json!("/a"));
        assert_eq!(details[0]["evaluationPath"], json!("/properties/a"));
        assert_eq!(details[0]["errors"]["type"], json!("expected integer"));
    }

    #[test]
    fn test_iter_is_pre_order() {
        let tree = sample();
        let paths: Vec<String> = tree.iter().map(|n| n.evaluation_path.to_string()).collect();
        assert_eq!(paths, vec!["".to_string(), "/properties/a".to_string()]);
    }

    #[test]
    fn test_render_flag_and_list() {
        let tree = sample();
        assert_eq!(tree.render(OutputFormat::Flag), json!({"valid": false}));
        let list = tree.render(OutputFormat::List);
        assert_eq!(list["details"].as_array().unwrap().len(), 2);
        assert!(list["details"][1].get("details").is_none());
    }

    #[test]
    fn test_hierarchical_round_trips() {
        let tree = sample();
        let v = tree.render(OutputFormat::Hierarchical);
        let back: EvaluationResults = serde_json::from_value(v).unwrap();
        assert_eq!(back, tree);
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("flag".parse::<OutputFormat>().unwrap(), OutputFormat::Flag);
        assert_eq!("basic".parse::<OutputFormat>().unwrap(), OutputFormat::List);
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
