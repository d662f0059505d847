//! # JSON Pointer (RFC 6901)
//!
//! `JsonPointer` addresses locations in both schema documents (schema
//! locations, evaluation paths) and instances (instance locations). The
//! same type also converts to and from the percent-encoded form used in
//! URI fragments (RFC 6901 §6).

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::PointerError;

/// A parsed JSON Pointer: an ordered list of unescaped reference tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JsonPointer(Vec<String>);

impl JsonPointer {
    /// The empty pointer, addressing the whole document.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Parse the string form (`""`, `"/a/b~1c"`).
    ///
    /// # Errors
    ///
    /// Returns `PointerError` if a non-empty pointer lacks the leading `/`
    /// or contains a `~` not followed by `0` or `1`.
    pub fn parse(s: &str) -> Result<Self, PointerError> {
        if s.is_empty() {
            return Ok(Self::root());
        }
        let rest = s
            .strip_prefix('/')
            .ok_or_else(|| PointerError::MissingLeadingSlash(s.to_string()))?;
        rest.split('/')
            .map(|token| unescape(token).ok_or_else(|| PointerError::InvalidEscape(s.to_string())))
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    /// Parse a pointer carried in a URI fragment, percent-decoding first.
    ///
    /// # Errors
    ///
    /// Returns `PointerError` on invalid percent-encoding or pointer syntax.
    pub fn from_uri_fragment(fragment: &str) -> Result<Self, PointerError> {
        let decoded = percent_decode(fragment)
            .ok_or_else(|| PointerError::InvalidPercentEncoding(fragment.to_string()))?;
        Self::parse(&decoded)
    }

    /// Returns a new pointer with `segment` appended.
    pub fn join(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// Returns a new pointer with an array index appended.
    pub fn join_index(&self, index: usize) -> Self {
        self.join(index.to_string())
    }

    /// Returns a new pointer with every segment of `other` appended.
    pub fn concat(&self, other: &JsonPointer) -> Self {
        let mut segments = self.0.clone();
        segments.extend(other.0.iter().cloned());
        Self(segments)
    }

    /// Append a segment in place.
    pub fn push(&mut self, segment: impl Into<String>) {
        self.0.push(segment.into());
    }

    /// Remove and return the last segment.
    pub fn pop(&mut self) -> Option<String> {
        self.0.pop()
    }

    /// The unescaped reference tokens.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// The final reference token, if any.
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Returns the number of reference tokens.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true for the root pointer.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if `prefix` addresses this location or an ancestor of it.
    pub fn starts_with(&self, prefix: &JsonPointer) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// The remainder of this pointer below `prefix`, if `prefix` is an ancestor.
    pub fn strip_prefix(&self, prefix: &JsonPointer) -> Option<JsonPointer> {
        self.0
            .strip_prefix(prefix.0.as_slice())
            .map(|rest| Self(rest.to_vec()))
    }

    /// Walk `value` along this pointer.
    pub fn resolve<'v>(&self, value: &'v Value) -> Option<&'v Value> {
        self.0.iter().try_fold(value, |current, token| match current {
            Value::Object(map) => map.get(token),
            Value::Array(items) => parse_index(token).and_then(|i| items.get(i)),
            _ => None,
        })
    }

    /// Render as a URI fragment (without the leading `#`), percent-encoding
    /// every byte that may not appear literally in a fragment.
    pub fn to_uri_fragment(&self) -> String {
        let mut out = String::new();
        for b in self.to_string().bytes() {
            if is_fragment_safe(b) {
                out.push(b as char);
            } else {
                out.push_str(&format!("%{b:02X}"));
            }
        }
        out
    }
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.0 {
            f.write_str("/")?;
            f.write_str(&segment.replace('~', "~0").replace('/', "~1"))?;
        }
        Ok(())
    }
}

impl Serialize for JsonPointer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromIterator<String> for JsonPointer {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn unescape(token: &str) -> Option<String> {
    let mut out = String::with_capacity(token.len());
    let mut chars = token.chars();
    while let Some(c) = chars.next() {
        if c == '~' {
            match chars.next() {
                Some('0') => out.push('~'),
                Some('1') => out.push('/'),
                _ => return None,
            }
        } else {
            out.push(c);
        }
    }
    Some(out)
}

/// Array index tokens are decimal without leading zeros.
fn parse_index(token: &str) -> Option<usize> {
    if token.is_empty() || (token.len() > 1 && token.starts_with('0')) {
        return None;
    }
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

fn is_fragment_safe(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"-._~!$&'()*+,;=:@/?".contains(&b)
}

/// Decode `%XX` escapes; `None` on malformed escapes or invalid UTF-8.
pub fn percent_decode(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3)?;
            let hex = std::str::from_utf8(hex).ok()?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_and_display_round_trip_escapes() {
        let ptr = JsonPointer::parse("/a~1b/c~0d/0").unwrap();
        assert_eq!(ptr.segments(), &["a/b", "c~d", "0"]);
        assert_eq!(ptr.to_string(), "/a~1b/c~0d/0");
    }

    #[test]
    fn test_parse_rejects_missing_slash() {
        assert!(matches!(
            JsonPointer::parse("a/b"),
            Err(PointerError::MissingLeadingSlash(_))
        ));
    }

    #[test]
    fn test_parse_rejects_bad_escape() {
        assert!(matches!(
            JsonPointer::parse("/a~2"),
            Err(PointerError::InvalidEscape(_))
        ));
    }

    #[test]
    fn test_resolve_objects_and_arrays() {
        let doc = json!({"$defs": {"list": {"prefixItems": [true, {"type": "string"}]}}});
        let ptr = JsonPointer::parse("/$defs/list/prefixItems/1").unwrap();
        assert_eq!(ptr.resolve(&doc), Some(&json!({"type": "string"})));
        assert_eq!(JsonPointer::parse("/$defs/list/prefixItems/01").unwrap().resolve(&doc), None);
        assert_eq!(JsonPointer::parse("/$defs/missing").unwrap().resolve(&doc), None);
        assert_eq!(JsonPointer::root().resolve(&doc), Some(&doc));
    }

    #[test]
    fn test_uri_fragment_encoding() {
        let ptr = JsonPointer::root().join("$defs").join("a b%c");
        assert_eq!(ptr.to_uri_fragment(), "/$defs/a%20b%25c");
        let back = JsonPointer::from_uri_fragment(&ptr.to_uri_fragment()).unwrap();
        assert_eq!(back, ptr);
    }

    #[test]
    fn test_percent_decode_rejects_truncated_escape() {
        assert_eq!(percent_decode("%2"), None);
        assert_eq!(percent_decode("%zz"), None);
        assert_eq!(percent_decode("a%25b").as_deref(), Some("a%b"));
    }

    #[test]
    fn test_prefix_operations() {
        let base = JsonPointer::parse("/properties/foo").unwrap();
        let deep = base.join("items").join_index(2);
        assert!(deep.starts_with(&base));
        assert_eq!(deep.strip_prefix(&base).unwrap().to_string(), "/items/2");
        assert_eq!(base.strip_prefix(&deep), None);
        assert_eq!(deep.last(), Some("2"));
    }

    #[test]
    fn test_serializes_as_string() {
        let ptr = JsonPointer::root().join("a/b");
        assert_eq!(serde_json::to_value(&ptr).unwrap(), json!("/a~1b"));
    }
}
