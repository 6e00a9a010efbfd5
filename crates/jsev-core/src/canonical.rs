//! # Canonical JSON — Structural Equality and RFC 8785 Bytes
//!
//! Two concerns share this module because both define "the same JSON value":
//!
//! - [`json_equal`] is the equality used by `const`, `enum` and
//!   `uniqueItems`. Numbers compare by mathematical value (`1 == 1.0`),
//!   object member order is irrelevant, and array order is significant.
//! - [`CanonicalBytes`] is the sole construction path for bytes that are
//!   hashed into synthetic schema identifiers. Serialization uses `serde_jcs`
//!   (RFC 8785): sorted keys, compact separators, deterministic number text.
//!
//! ## Invariant
//!
//! `CanonicalBytes` has a private inner field; the only constructor is
//! [`CanonicalBytes::new`]. Digest functions accept `&CanonicalBytes`, so a
//! schema identifier can never be derived from non-canonical bytes.

use std::cmp::Ordering;

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;
use crate::number;

/// Structural JSON equality.
pub fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => number::compare(x, y) == Ordering::Equal,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| json_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(key, l)| y.get(key).is_some_and(|r| json_equal(l, r)))
        }
        _ => false,
    }
}

/// Bytes produced exclusively by RFC 8785 canonicalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Canonicalize any serializable value.
    ///
    /// # Errors
    ///
    /// Returns [`CanonicalizationError::SerializationFailed`] if the value
    /// cannot be represented as JSON.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        let text = serde_jcs::to_string(&value)?;
        Ok(Self(text.into_bytes()))
    }

    /// Access the canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the byte sequence is empty (never the case for valid JSON).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
