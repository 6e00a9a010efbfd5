//! # Content Digest — Deterministic Schema Identifiers
//!
//! A schema registered without `$id` still needs an absolute base URI so that
//! `#/$defs/...` references and output `schemaLocation` values are
//! well-formed. The identifier is derived from the schema's content:
//! `https://jsev.invalid/schema/<sha256 hex>`, so registering the same schema
//! twice yields the same resource and distinct schemas never collide.

use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;

/// Host reserved by RFC 2606; synthetic identifiers can never resolve.
pub const SYNTHETIC_ID_PREFIX: &str = "https://jsev.invalid/schema/";

/// A SHA-256 digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest {
    bytes: [u8; 32],
}

impl ContentDigest {
    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// The synthetic schema identifier for content with this digest.
    pub fn synthetic_id(&self) -> String {
        format!("{SYNTHETIC_ID_PREFIX}{}", self.to_hex())
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sha256:{}", self.to_hex())
    }
}

/// Compute a SHA-256 digest from canonical bytes.
///
/// Accepts only `&CanonicalBytes`, never raw `&[u8]`, so key order and number
/// formatting cannot change a schema's identifier.
pub fn sha256_digest(data: &CanonicalBytes) -> ContentDigest {
    let hash = Sha256::digest(data.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    ContentDigest { bytes }
}
