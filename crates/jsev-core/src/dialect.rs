//! # Dialect — Supported JSON Schema Drafts
//!
//! Defines the [`Dialect`] enum: the one list of drafts the engine knows.
//! Every `match` on `Dialect` is exhaustive, so adding a draft forces every
//! keyword that varies by draft to decide how it behaves.
//!
//! Variants are declared oldest first and the enum derives `Ord`, so
//! "2019-09 or later" is written `dialect >= Dialect::Draft201909`.
//!
//! ## Identification
//!
//! A dialect is identified by its meta-schema URI. [`Dialect::from_uri`]
//! tolerates the variations found in real schemas: a trailing empty
//! fragment (`...schema#`) and `http` vs `https`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::JsevError;

/// A JSON Schema dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dialect {
    /// draft-06.
    Draft6,
    /// draft-07.
    Draft7,
    /// 2019-09 (formerly draft 8). Introduces vocabularies.
    Draft201909,
    /// 2020-12.
    Draft202012,
}

impl Dialect {
    /// All supported dialects, oldest first.
    pub fn all() -> &'static [Dialect] {
        &[
            Self::Draft6,
            Self::Draft7,
            Self::Draft201909,
            Self::Draft202012,
        ]
    }

    /// Short name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft6 => "draft-06",
            Self::Draft7 => "draft-07",
            Self::Draft201909 => "2019-09",
            Self::Draft202012 => "2020-12",
        }
    }

    /// The canonical meta-schema URI, exactly as the draft publishes it.
    pub fn meta_schema_uri(&self) -> &'static str {
        match self {
            Self::Draft6 => "http://json-schema.org/draft-06/schema#",
            Self::Draft7 => "http://json-schema.org/draft-07/schema#",
            Self::Draft201909 => "https://json-schema.org/draft/2019-09/schema",
            Self::Draft202012 => "https://json-schema.org/draft/2020-12/schema",
        }
    }

    /// Identify a dialect by meta-schema URI.
    pub fn from_uri(uri: &str) -> Option<Self> {
        let normalized = normalize(uri);
        Self::all()
            .iter()
            .copied()
            .find(|d| normalize(d.meta_schema_uri()) == normalized)
    }

    /// Under draft-06 and draft-07 a schema object containing `$ref` is
    /// treated as the reference alone.
    pub fn ignores_ref_siblings(&self) -> bool {
        match self {
            Self::Draft6 | Self::Draft7 => true,
            Self::Draft201909 | Self::Draft202012 => false,
        }
    }

    /// True for dialects whose meta-schemas declare `$vocabulary`.
    pub fn has_vocabularies(&self) -> bool {
        !self.ignores_ref_siblings()
    }
}

fn normalize(uri: &str) -> &str {
    let uri = uri.trim_end_matches('#');
    uri.strip_prefix("https://")
        .or_else(|| uri.strip_prefix("http://"))
        .unwrap_or(uri)
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = JsevError;

    /// Accepts a short name (`2020-12`, `draft-07`, `draft7`) or a
    /// meta-schema URI.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let by_name = match trimmed.to_ascii_lowercase().as_str() {
            "draft-06" | "draft6" | "6" => Some(Self::Draft6),
            "draft-07" | "draft7" | "7" => Some(Self::Draft7),
            "2019-09" | "draft2019-09" | "draft-2019-09" => Some(Self::Draft201909),
            "2020-12" | "draft2020-12" | "draft-2020-12" => Some(Self::Draft202012),
            _ => None,
        };
        by_name
            .or_else(|| Self::from_uri(trimmed))
            .ok_or_else(|| JsevError::UnknownDialect(s.to_string()))
    }
}

impl Serialize for Dialect {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.meta_schema_uri())
    }
}

impl<'de> Deserialize<'de> for Dialect {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
