//! # Format Registry — Named String Validators
//!
//! The `format` keyword names a semantic string format (`date-time`,
//! `email`, `uuid`, ...). The engine never hard-codes what those names mean;
//! it consults a [`FormatRegistry`] by name.
//!
//! ## Contract
//!
//! - [`FormatRegistry::check`] returns `None` for an unknown format name.
//!   Unknown formats are never a failure.
//! - Non-string instances always pass: formats only constrain strings.
//!
//! ## Built-in Formats
//!
//! | Name | Checked with |
//! |------|--------------|
//! | `date-time`, `date`, `time` | `chrono` RFC 3339 parsing |
//! | `duration` | ISO 8601 duration grammar (`regex`) |
//! | `email`, `idn-email` | local part + hostname or address literal |
//! | `hostname`, `idn-hostname` | RFC 1123 label rules |
//! | `ipv4`, `ipv6` | `std::net` address parsing |
//! | `uri`, `uri-reference`, `iri`, `iri-reference` | `url` parsing |
//! | `uri-template` | balanced expression braces |
//! | `uuid` | `uuid` hyphenated form |
//! | `regex` | `fancy-regex` compilation (lookaround allowed) |
//! | `json-pointer`, `relative-json-pointer` | RFC 6901 parsing |

use std::collections::BTreeMap;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde_json::Value;
use url::Url;

use crate::pointer::JsonPointer;

/// A format validator.
pub type FormatCheck = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Name → validator table.
#[derive(Clone, Default)]
pub struct FormatRegistry {
    checks: BTreeMap<String, FormatCheck>,
}

impl FormatRegistry {
    /// An empty registry: every format is unknown.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the built-in formats.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register("date-time", is_date_time);
        registry.register("date", is_date);
        registry.register("time", is_time);
        registry.register("duration", is_duration);
        registry.register("email", |s| is_email(s, false));
        registry.register("idn-email", |s| is_email(s, true));
        registry.register("hostname", |s| is_hostname(s, false));
        registry.register("idn-hostname", |s| is_hostname(s, true));
        registry.register("ipv4", |s| s.parse::<Ipv4Addr>().is_ok());
        registry.register("ipv6", |s| s.parse::<Ipv6Addr>().is_ok());
        registry.register("uri", |s| is_uri(s, false));
        registry.register("uri-reference", |s| is_uri_reference(s, false));
        registry.register("iri", |s| is_uri(s, true));
        registry.register("iri-reference", |s| is_uri_reference(s, true));
        registry.register("uri-template", is_uri_template);
        registry.register("uuid", is_uuid);
        registry.register("regex", |s| fancy_regex::Regex::new(s).is_ok());
        registry.register("json-pointer", |s| JsonPointer::parse(s).is_ok());
        registry.register("relative-json-pointer", is_relative_json_pointer);
        registry
    }

    /// The process-wide registry of built-in formats.
    pub fn global() -> Arc<FormatRegistry> {
        static GLOBAL: OnceLock<Arc<FormatRegistry>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Self::with_builtin())))
    }

    /// Add or replace a format.
    pub fn register<F>(&mut self, name: impl Into<String>, check: F)
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        let name = name.into();
        if self.checks.insert(name.clone(), Arc::new(check)).is_some() {
            tracing::debug!(format = %name, "replaced format validator");
        }
    }

    /// True if `name` has a validator.
    pub fn contains(&self, name: &str) -> bool {
        self.checks.contains_key(name)
    }

    /// Registered format names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.checks.keys().map(String::as_str)
    }

    /// Check `instance` against format `name`.
    ///
    /// `None` when the format is unknown; `Some(true)` for any non-string.
    pub fn check(&self, name: &str, instance: &Value) -> Option<bool> {
        let check = self.checks.get(name)?;
        Some(match instance {
            Value::String(s) => check(s),
            _ => true,
        })
    }
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("formats", &self.checks.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Built-in validators
// ---------------------------------------------------------------------------

fn is_date_time(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok()
}

fn is_date(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 10
        && b[4] == b'-'
        && b[7] == b'-'
        && NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

fn is_time(s: &str) -> bool {
    // RFC 3339 full-time, which requires an offset.
    s.len() >= 9 && DateTime::parse_from_rfc3339(&format!("1970-01-01T{s}")).is_ok()
}

fn duration_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"^P(?:\d+W|(?:\d+Y)?(?:\d+M)?(?:\d+D)?(?:T(?:\d+H)?(?:\d+M)?(?:\d+S)?)?)$").ok()
        })
        .as_ref()
}

fn is_duration(s: &str) -> bool {
    s.len() > 1 && !s.ends_with('T') && duration_pattern().is_some_and(|p| p.is_match(s))
}

fn is_email(s: &str, international: bool) -> bool {
    let Some((local, domain)) = s.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || local.len() > 64 || local.starts_with('.') || local.ends_with('.') {
        return false;
    }
    if local.contains("..") || local.chars().any(|c| c.is_whitespace() || c == '@') {
        return false;
    }
    if !international && !local.is_ascii() {
        return false;
    }
    if let Some(literal) = domain.strip_prefix('[').and_then(|d| d.strip_suffix(']')) {
        return match literal.strip_prefix("IPv6:") {
            Some(v6) => v6.parse::<Ipv6Addr>().is_ok(),
            None => literal.parse::<Ipv4Addr>().is_ok(),
        };
    }
    is_hostname(domain, international)
}

fn is_hostname(s: &str, international: bool) -> bool {
    let s = s.strip_suffix('.').unwrap_or(s);
    if s.is_empty() || s.len() > 253 {
        return false;
    }
    s.split('.').all(|label| {
        let valid_char = |c: char| {
            c == '-' || c.is_ascii_alphanumeric() || (international && c.is_alphanumeric())
        };
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(valid_char)
    })
}

fn plausible_uri_text(s: &str, international: bool) -> bool {
    let forbidden = |c: char| {
        c.is_whitespace()
            || c.is_control()
            || matches!(c, '<' | '>' | '"' | '\\' | '^' | '`' | '{' | '|' | '}')
    };
    !s.chars().any(forbidden) && (international || s.is_ascii())
}

fn is_uri(s: &str, international: bool) -> bool {
    plausible_uri_text(s, international) && Url::parse(s).is_ok()
}

fn is_uri_reference(s: &str, international: bool) -> bool {
    if !plausible_uri_text(s, international) {
        return false;
    }
    if s.is_empty() {
        return true;
    }
    match Url::parse("https://jsev.invalid/") {
        Ok(base) => base.join(s).is_ok(),
        Err(_) => false,
    }
}

fn is_uri_template(s: &str) -> bool {
    let mut open = false;
    for c in s.chars() {
        match c {
            '{' if open => return false,
            '{' => open = true,
            '}' if !open => return false,
            '}' => open = false,
            _ => {}
        }
    }
    !open
}

fn is_uuid(s: &str) -> bool {
    s.len() == 36 && uuid::Uuid::parse_str(s).is_ok()
}

fn is_relative_json_pointer(s: &str) -> bool {
    let digits = s.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || (digits > 1 && s.starts_with('0')) {
        return false;
    }
    let rest = &s[digits..];
    rest == "#" || JsonPointer::parse(rest).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn check(name: &str, s: &str) -> bool {
        FormatRegistry::with_builtin()
            .check(name, &json!(s))
            .unwrap_or_else(|| panic!("format {name} missing"))
    }

    #[test]
    fn test_unknown_format_is_none() {
        assert_eq!(FormatRegistry::with_builtin().check("color", &json!("red")), None);
        assert_eq!(FormatRegistry::new().check("email", &json!("x")), None);
    }

    #[test]
    fn test_non_strings_pass() {
        let reg = FormatRegistry::with_builtin();
        assert_eq!(reg.check("email", &json!(12)), Some(true));
        assert_eq!(reg.check("date", &json!(null)), Some(true));
    }

    #[test]
    fn test_date_time_family() {
        assert!(check("date-time", "2024-02-29T12:30:00Z"));
        assert!(check("date-time", "2024-02-29T12:30:00.123+05:30"));
        assert!(!check("date-time", "2023-02-29T12:30:00Z"));
        assert!(check("date", "2024-02-29"));
        assert!(!check("date", "2024-2-9"));
        assert!(check("time", "23:59:59Z"));
        assert!(!check("time", "23:59:59"));
    }

    #[test]
    fn test_duration() {
        assert!(check("duration", "P4DT12H30M5S"));
        assert!(check("duration", "P2W"));
        assert!(!check("duration", "P"));
        assert!(!check("duration", "P1DT"));
        assert!(!check("duration", "PT1D"));
    }

    #[test]
    fn test_email_and_hostname() {
        assert!(check("email", "joe.bloggs@example.com"));
        assert!(check("email", "joe@[127.0.0.1]"));
        assert!(!check("email", "joe..bloggs@example.com"));
        assert!(!check("email", "2962"));
        assert!(check("hostname", "www.example.com"));
        assert!(!check("hostname", "-a-host-name-that-starts-with--"));
        assert!(!check("hostname", &"a".repeat(64)));
        assert!(check("idn-hostname", "실례.테스트"));
        assert!(!check("hostname", "실례.테스트"));
    }

    #[test]
    fn test_ip_addresses() {
        assert!(check("ipv4", "192.168.0.1"));
        assert!(!check("ipv4", "256.0.0.1"));
        assert!(check("ipv6", "::1"));
        assert!(!check("ipv6", "12345::"));
    }

    #[test]
    fn test_uri_family() {
        assert!(check("uri", "http://example.com/path?q=1#frag"));
        assert!(!check("uri", "//example.com/relative"));
        assert!(!check("uri", "http://example.com/with space"));
        assert!(check("uri-reference", "../relative/path"));
        assert!(check("uri-reference", "#fragment"));
        assert!(check("iri", "http://example.com/ünïcödé?q=π"));
        assert!(!check("uri", "http://example.com/ünïcödé"));
        assert!(check("uri-template", "http://example.com/dictionary/{term:1}/{term}"));
        assert!(!check("uri-template", "http://example.com/dictionary/{term:1}/{term"));
    }

    #[test]
    fn test_uuid_and_regex_and_pointers() {
        assert!(check("uuid", "2eb8aa08-aa98-11ea-b4aa-73b441d16380"));
        assert!(!check("uuid", "2eb8aa08aa9811eab4aa73b441d16380"));
        assert!(check("regex", "^[a-z]+$"));
        assert!(!check("regex", "^(abc]"));
        assert!(check("regex", "^(?!foo)"));
        assert!(check("json-pointer", "/foo/bar~0baz"));
        assert!(!check("json-pointer", "/foo/bar~"));
        assert!(check("relative-json-pointer", "1/foo"));
        assert!(check("relative-json-pointer", "0#"));
        assert!(!check("relative-json-pointer", "01/a"));
        assert!(!check("relative-json-pointer", "/foo"));
    }

    #[test]
    fn test_register_custom_format() {
        let mut reg = FormatRegistry::new();
        reg.register("even-length", |s| s.len() % 2 == 0);
        assert!(reg.contains("even-length"));
        assert_eq!(reg.check("even-length", &json!("ab")), Some(true));
        assert_eq!(reg.check("even-length", &json!("abc")), Some(false));
    }

    #[test]
    fn test_global_registry_has_builtins() {
        let global = FormatRegistry::global();
        assert!(global.contains("date-time"));
        assert!(global.names().count() >= 19);
    }
}
