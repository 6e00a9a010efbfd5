//! # JSON Pointer — Persistent Path Values
//!
//! Every node in an evaluation results tree carries three path trails: the
//! instance location, the schema location, and the evaluation path. Each
//! recursive call extends its parent's trails by one or two segments, so the
//! representation must make appending cheap and must never mutate a trail
//! that a sibling frame still holds.
//!
//! ## Representation
//!
//! [`JsonPointer`] is a persistent singly-linked list stored newest-first.
//! [`JsonPointer::push`] allocates one node and shares the entire existing
//! trail with the parent. Cloning is a reference-count increment.
//!
//! ## Segment Equality
//!
//! A pointer is a string; `/items/0` does not know whether `0` names an array
//! index or an object key. [`PathSegment`] therefore compares and hashes by
//! its textual form, so `Key("0") == Index(0)`.
//!
//! ## Text Forms
//!
//! - [`Display`](std::fmt::Display) renders RFC 6901 (`~0`, `~1` escapes).
//! - [`JsonPointer::to_uri_fragment`] additionally percent-encodes characters
//!   that may not appear in a URI fragment.

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::PointerError;

// ---------------------------------------------------------------------------
// PathSegment
// ---------------------------------------------------------------------------

/// One reference token of a JSON pointer.
#[derive(Debug, Clone)]
pub enum PathSegment {
    /// An object member name (or any token parsed from text).
    Key(Arc<str>),
    /// An array index.
    Index(usize),
}

impl PathSegment {
    /// The unescaped textual form of the segment.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Key(key) => Cow::Borrowed(&**key),
            Self::Index(index) => Cow::Owned(index.to_string()),
        }
    }

    /// Interpret the segment as an array index.
    ///
    /// Keys qualify only when they are canonical decimal integers: `"0"` is an
    /// index, `"01"` and `"-1"` are not.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(index) => Some(*index),
            Self::Key(key) => {
                let canonical = &**key == "0"
                    || (!key.is_empty()
                        && !key.starts_with('0')
                        && key.bytes().all(|b| b.is_ascii_digit()));
                if canonical {
                    key.parse().ok()
                } else {
                    None
                }
            }
        }
    }
}

impl PartialEq for PathSegment {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Key(a), Self::Key(b)) => a == b,
            (Self::Index(a), Self::Index(b)) => a == b,
            _ => self.as_text() == other.as_text(),
        }
    }
}

impl Eq for PathSegment {}

impl Hash for PathSegment {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_text().hash(state);
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => {
                for ch in key.chars() {
                    match ch {
                        '~' => f.write_str("~0")?,
                        '/' => f.write_str("~1")?,
                        other => write!(f, "{other}")?,
                    }
                }
                Ok(())
            }
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(value: &str) -> Self {
        Self::Key(Arc::from(value))
    }
}

impl From<String> for PathSegment {
    fn from(value: String) -> Self {
        Self::Key(Arc::from(value))
    }
}

impl From<usize> for PathSegment {
    fn from(value: usize) -> Self {
        Self::Index(value)
    }
}

// ---------------------------------------------------------------------------
// JsonPointer
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Node {
    segment: PathSegment,
    parent: Option<Arc<Node>>,
    len: usize,
}

/// An immutable JSON pointer (RFC 6901).
///
/// All operations return new pointers; the receiver is never modified.
#[derive(Debug, Clone, Default)]
pub struct JsonPointer {
    last: Option<Arc<Node>>,
}

impl JsonPointer {
    /// The empty pointer, referring to the whole document.
    pub fn root() -> Self {
        Self { last: None }
    }

    /// Append one segment, sharing this pointer as the prefix.
    pub fn push(&self, segment: impl Into<PathSegment>) -> Self {
        let len = self.len() + 1;
        Self {
            last: Some(Arc::new(Node {
                segment: segment.into(),
                parent: self.last.clone(),
                len,
            })),
        }
    }

    /// Append every segment of `other`.
    pub fn join(&self, other: &JsonPointer) -> Self {
        other
            .segments()
            .into_iter()
            .fold(self.clone(), |acc, segment| acc.push(segment))
    }

    /// Number of reference tokens.
    pub fn len(&self) -> usize {
        self.last.as_ref().map_or(0, |node| node.len)
    }

    /// True for the root pointer.
    pub fn is_empty(&self) -> bool {
        self.last.is_none()
    }

    /// The final segment, if any.
    pub fn last(&self) -> Option<&PathSegment> {
        self.last.as_ref().map(|node| &node.segment)
    }

    /// Segments in document order (outermost first).
    pub fn segments(&self) -> Vec<PathSegment> {
        let mut out = Vec::with_capacity(self.len());
        let mut cursor = self.last.as_deref();
        while let Some(node) = cursor {
            out.push(node.segment.clone());
            cursor = node.parent.as_deref();
        }
        out.reverse();
        out
    }

    /// Parse an RFC 6901 pointer string.
    pub fn parse(text: &str) -> Result<Self, PointerError> {
        if text.is_empty() {
            return Ok(Self::root());
        }
        let Some(rest) = text.strip_prefix('/') else {
            return Err(PointerError::MissingLeadingSlash(text.to_string()));
        };
        let mut pointer = Self::root();
        for token in rest.split('/') {
            pointer = pointer.push(unescape_token(token, text)?);
        }
        Ok(pointer)
    }

    /// Parse the fragment part of a URI (without the leading `#`) as a
    /// pointer, percent-decoding it first.
    pub fn from_uri_fragment(fragment: &str) -> Result<Self, PointerError> {
        let decoded = percent_decode(fragment)?;
        Self::parse(&decoded)
    }

    /// Render as a URI fragment (without the leading `#`).
    pub fn to_uri_fragment(&self) -> String {
        let mut out = String::new();
        for byte in self.to_string().bytes() {
            if is_fragment_safe(byte) {
                out.push(byte as char);
            } else {
                out.push_str(&format!("%{byte:02X}"));
            }
        }
        out
    }

    /// Walk `document` along this pointer.
    pub fn resolve<'v>(&self, document: &'v Value) -> Option<&'v Value> {
        let mut current = document;
        for segment in self.segments() {
            current = match current {
                Value::Object(map) => map.get(segment.as_text().as_ref())?,
                Value::Array(items) => items.get(segment.as_index()?)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

fn unescape_token(token: &str, whole: &str) -> Result<PathSegment, PointerError> {
    if !token.contains('~') {
        return Ok(PathSegment::from(token));
    }
    let mut out = String::with_capacity(token.len());
    let mut chars = token.chars();
    while let Some(ch) = chars.next() {
        if ch != '~' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('~'),
            Some('1') => out.push('/'),
            _ => return Err(PointerError::InvalidEscape(whole.to_string())),
        }
    }
    Ok(PathSegment::from(out))
}

fn percent_decode(text: &str) -> Result<String, PointerError> {
    if !text.contains('%') {
        return Ok(text.to_string());
    }
    let invalid = || PointerError::InvalidPercentEncoding(text.to_string());
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3).ok_or_else(invalid)?;
            let hex = std::str::from_utf8(hex).map_err(|_| invalid())?;
            out.push(u8::from_str_radix(hex, 16).map_err(|_| invalid())?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|_| invalid())
}

// RFC 3986 `fragment` minus `%`, which is always re-encoded.
fn is_fragment_safe(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || b"-._~!$&'()*+,;=:@/?".contains(&byte)
}

impl PartialEq for JsonPointer {
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        let mut a = self.last.as_deref();
        let mut b = other.last.as_deref();
        while let (Some(x), Some(y)) = (a, b) {
            if std::ptr::eq(x, y) {
                return true;
            }
            if x.segment != y.segment {
                return false;
            }
            a = x.parent.as_deref();
            b = y.parent.as_deref();
        }
        true
    }
}

impl Eq for JsonPointer {}

impl Hash for JsonPointer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for segment in self.segments() {
            segment.hash(state);
        }
    }
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in self.segments() {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for JsonPointer {
    type Err = PointerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for JsonPointer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for JsonPointer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_root_is_empty_string() {
        let root = JsonPointer::root();
        assert!(root.is_empty());
        assert_eq!(root.to_string(), "");
        assert_eq!(root.len(), 0);
    }

    #[test]
    fn test_push_does_not_modify_parent() {
        let parent = JsonPointer::root().push("properties");
        let a = parent.push("a");
        let b = parent.push("b");
        assert_eq!(parent.to_string(), "/properties");
        assert_eq!(a.to_string(), "/properties/a");
        assert_eq!(b.to_string(), "/properties/b");
    }

    #[test]
    fn test_escapes_tilde_and_slash() {
        let p = JsonPointer::root().push("a/b").push("m~n");
        assert_eq!(p.to_string(), "/a~1b/m~0n");
        assert_eq!(JsonPointer::parse("/a~1b/m~0n").unwrap(), p);
    }

    #[test]
    fn test_parse_rejects_missing_slash() {
        assert_eq!(
            JsonPointer::parse("foo"),
            Err(PointerError::MissingLeadingSlash("foo".into()))
        );
    }

    #[test]
    fn test_parse_rejects_bad_escape() {
        assert!(matches!(
            JsonPointer::parse("/a~2"),
            Err(PointerError::InvalidEscape(_))
        ));
        assert!(matches!(
            JsonPointer::parse("/a~"),
            Err(PointerError::InvalidEscape(_))
        ));
    }

    #[test]
    fn test_index_and_key_compare_textually() {
        let by_index = JsonPointer::root().push("items").push(0usize);
        let by_key = JsonPointer::parse("/items/0").unwrap();
        assert_eq!(by_index, by_key);
        assert_eq!(PathSegment::Index(3), PathSegment::from("3"));
        assert_ne!(PathSegment::Index(3), PathSegment::from("03"));
    }

    #[test]
    fn test_join_appends_all_segments() {
        let a = JsonPointer::parse("/a/b").unwrap();
        let b = JsonPointer::parse("/c/d").unwrap();
        assert_eq!(a.join(&b).to_string(), "/a/b/c/d");
        assert_eq!(a.join(&JsonPointer::root()), a);
    }

    #[test]
    fn test_resolve_objects_and_arrays() {
        let doc = json!({"a": [10, {"b/c": true}], "": 5});
        let p = JsonPointer::parse("/a/1/b~1c").unwrap();
        assert_eq!(p.resolve(&doc), Some(&json!(true)));
        assert_eq!(JsonPointer::parse("/").unwrap().resolve(&doc), Some(&json!(5)));
        assert_eq!(JsonPointer::parse("/a/01").unwrap().resolve(&doc), None);
        assert_eq!(JsonPointer::parse("/a/7").unwrap().resolve(&doc), None);
        assert_eq!(JsonPointer::root().resolve(&doc), Some(&doc));
    }

    #[test]
    fn test_uri_fragment_percent_encoding() {
        let p = JsonPointer::root().push("$defs").push("a b%");
        assert_eq!(p.to_uri_fragment(), "/$defs/a%20b%25");
        assert_eq!(JsonPointer::from_uri_fragment("/$defs/a%20b%25").unwrap(), p);
    }

    #[test]
    fn test_uri_fragment_rejects_truncated_escape() {
        assert!(matches!(
            JsonPointer::from_uri_fragment("/a%2"),
            Err(PointerError::InvalidPercentEncoding(_))
        ));
    }

    #[test]
    fn test_serde_as_string() {
        let p = JsonPointer::parse("/x/0").unwrap();
        assert_eq!(serde_json::to_value(&p).unwrap(), json!("/x/0"));
        let back: JsonPointer = serde_json::from_value(json!("/x/0")).unwrap();
        assert_eq!(back, p);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn segment() -> impl Strategy<Value = PathSegment> {
            prop_oneof![
                "[a-z~/ %]{0,6}".prop_map(PathSegment::from),
                (0usize..50).prop_map(PathSegment::Index),
            ]
        }

        proptest! {
            #[test]
            fn display_then_parse_preserves_pointer(segs in prop::collection::vec(segment(), 0..8)) {
                let p = segs.iter().cloned().fold(JsonPointer::root(), |acc, s| acc.push(s));
                prop_assert_eq!(JsonPointer::parse(&p.to_string()).unwrap(), p.clone());
                prop_assert_eq!(JsonPointer::from_uri_fragment(&p.to_uri_fragment()).unwrap(), p);
            }

            #[test]
            fn join_length_is_additive(
                a in prop::collection::vec(segment(), 0..5),
                b in prop::collection::vec(segment(), 0..5),
            ) {
                let pa = a.into_iter().fold(JsonPointer::root(), |acc, s| acc.push(s));
                let pb = b.into_iter().fold(JsonPointer::root(), |acc, s| acc.push(s));
                prop_assert_eq!(pa.join(&pb).len(), pa.len() + pb.len());
            }
        }
    }
}
