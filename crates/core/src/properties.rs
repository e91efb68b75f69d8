//! Java `.properties` file support
//!
//! Gradle projects keep signing credentials in `key.properties`. This module
//! reads that format (comments, `=`/`:`/whitespace separators, line
//! continuations, backslash and `\uXXXX` escapes) and writes it back.
//! Files that are not valid UTF-8 are read as ISO-8859-1, the encoding
//! `java.util.Properties` uses for byte streams.

use crate::error::{Error, ErrorCode, Result, ResultExt};
use std::collections::BTreeMap;
use std::path::Path;

/// An ordered set of string properties
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    /// Create an empty property set
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse properties from text
    pub fn parse(input: &str) -> Result<Self> {
        let mut props = Self::new();
        let mut lines = input.lines().enumerate();

        while let Some((index, raw)) = lines.next() {
            let trimmed = raw.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                continue;
            }

            // Join continuation lines; leading whitespace on each follow-up is dropped
            let mut logical = trimmed.to_string();
            while ends_with_continuation(&logical) {
                logical.pop();
                match lines.next() {
                    Some((_, next)) => logical.push_str(next.trim_start()),
                    None => break,
                }
            }

            let (key, value) = split_key_value(&logical);
            let key = unescape(key).map_err(|e| e.with_context(format!("line {}", index + 1)))?;
            let value =
                unescape(value).map_err(|e| e.with_context(format!("line {}", index + 1)))?;
            props.entries.insert(key, value);
        }

        Ok(props)
    }

    /// Load properties from a file
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).context(format!("Failed to read {}", path.display()))?;
        Self::parse(&decode(bytes)).context(format!("Parsing {}", path.display()))
    }

    /// Load properties from a file if it exists, otherwise return an empty set
    pub fn load_if_exists(path: &Path) -> Result<Self> {
        if path.is_file() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "properties file not present");
            Ok(Self::new())
        }
    }

    /// Look up a property
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Set a property, returning the previous value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    /// Whether the set has no properties
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render in `.properties` syntax, one `key=value` per line
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.entries {
            out.push_str(&escape(key, true));
            out.push('=');
            out.push_str(&escape(value, false));
            out.push('\n');
        }
        out
    }
}

/// UTF-8 when valid, otherwise one char per byte (ISO-8859-1)
fn decode(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => e.into_bytes().into_iter().map(char::from).collect(),
    }
}

fn ends_with_continuation(line: &str) -> bool {
    let trailing = line.chars().rev().take_while(|c| *c == '\\').count();
    trailing % 2 == 1
}

/// Split a logical line at the first unescaped separator
fn split_key_value(line: &str) -> (&str, &str) {
    let bytes = line.as_bytes();
    let mut i = 0;
    let mut key_end = line.len();

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'=' | b':' | b' ' | b'\t' | b'\x0c' => {
                key_end = i;
                break;
            }
            _ => i += 1,
        }
    }

    if key_end >= line.len() {
        return (line, "");
    }

    let key = &line[..key_end];
    let mut rest = line[key_end..].trim_start_matches([' ', '\t', '\x0c']);
    if let Some(stripped) = rest.strip_prefix(['=', ':']) {
        rest = stripped.trim_start_matches([' ', '\t', '\x0c']);
    }
    (key, rest)
}

fn unescape(raw: &str) -> Result<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('u') => {
                let unit = utf16_unit(&mut chars)?;
                let decoded = if (0xD800..0xDC00).contains(&unit) {
                    // High surrogate: must pair with a following \uDC00-\uDFFF
                    let mut lookahead = chars.clone();
                    let low = match (lookahead.next(), lookahead.next()) {
                        (Some('\\'), Some('u')) => Some(utf16_unit(&mut lookahead)?),
                        _ => None,
                    };
                    match low.filter(|low| (0xDC00..0xE000).contains(low)) {
                        Some(low) => {
                            chars = lookahead;
                            char::decode_utf16([unit, low]).next().and_then(|r| r.ok())
                        }
                        None => None,
                    }
                } else {
                    char::from_u32(u32::from(unit))
                };
                out.push(decoded.ok_or_else(|| malformed_unicode(&format!("{:04X}", unit)))?);
            }
            Some(other) => out.push(other),
            None => {}
        }
    }

    Ok(out)
}

/// Read the four hex digits of a `\uXXXX` escape
fn utf16_unit(chars: &mut std::str::Chars<'_>) -> Result<u16> {
    let hex: String = chars.by_ref().take(4).collect();
    if hex.len() != 4 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(malformed_unicode(&hex));
    }
    u16::from_str_radix(&hex, 16).map_err(|_| malformed_unicode(&hex))
}

fn malformed_unicode(hex: &str) -> Error {
    Error::new(ErrorCode::InvalidFormat, format!("Malformed \\u escape: \\u{}", hex))
}

fn escape(value: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(value.len());
    for (i, c) in value.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\x0c' => out.push_str("\\f"),
            '=' | ':' if is_key => {
                out.push('\\');
                out.push(c);
            }
            ' ' if is_key || i == 0 => out.push_str("\\ "),
            '#' | '!' if i == 0 => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_key_properties() {
        let props = Properties::parse(
            "storePassword=secret\nkeyPassword=secret2\nkeyAlias=upload\nstoreFile=/home/me/upload.jks\n",
        )
        .unwrap();

        assert_eq!(props.get("keyAlias"), Some("upload"));
        assert_eq!(props.get("storePassword"), Some("secret"));
        assert_eq!(props.get("storeFile"), Some("/home/me/upload.jks"));
    }

    #[test]
    fn test_parse_separators_and_comments() {
        let props = Properties::parse(
            "# comment\n! also a comment\n\n  a = 1\nb:2\nc 3\nd\n",
        )
        .unwrap();

        assert_eq!(props.get("a"), Some("1"));
        assert_eq!(props.get("b"), Some("2"));
        assert_eq!(props.get("c"), Some("3"));
        assert_eq!(props.get("d"), Some(""));
        assert_eq!(props.get("comment"), None);
    }

    #[test]
    fn test_parse_continuation() {
        let props = Properties::parse("path = C:\\\\keys\\\\\nlong = first \\\n    second\n").unwrap();
        assert_eq!(props.get("path"), Some("C:\\keys\\"));
        assert_eq!(props.get("long"), Some("first second"));
    }

    #[test]
    fn test_parse_escapes() {
        let props = Properties::parse("key\\ with\\ space=caf\\u00e9\\tx\n").unwrap();
        assert_eq!(props.get("key with space"), Some("café\tx"));
    }

    #[test]
    fn test_parse_malformed_unicode() {
        let err = Properties::parse("k=\\u12\n").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFormat);
        assert_eq!(err.context.as_deref(), Some("line 1"));
    }

    #[test]
    fn test_parse_surrogate_pair() {
        let props = Properties::parse("storePassword=p\\uD83D\\uDE00w\n").unwrap();
        assert_eq!(props.get("storePassword"), Some("p\u{1F600}w"));
    }

    #[test]
    fn test_parse_lone_surrogate_rejected() {
        let err = Properties::parse("a=x\nk=\\uD83Dz\n").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFormat);
        assert_eq!(err.context.as_deref(), Some("line 2"));

        let err = Properties::parse("k=\\uDE00\n").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFormat);
    }

    #[test]
    fn test_parse_high_surrogate_then_plain_escape() {
        let err = Properties::parse("k=\\uD83D\\u0041\n").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFormat);
    }

    #[test]
    fn test_later_key_overrides() {
        let props = Properties::parse("a=1\na=2\n").unwrap();
        assert_eq!(props.get("a"), Some("2"));
    }

    #[test]
    fn test_load_if_exists_missing() {
        let temp = TempDir::new().unwrap();
        let props = Properties::load_if_exists(&temp.path().join("key.properties")).unwrap();
        assert!(props.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("key.properties");
        std::fs::write(&path, "keyAlias=release\n").unwrap();

        let props = Properties::load_if_exists(&path).unwrap();
        assert_eq!(props.get("keyAlias"), Some("release"));
    }

    #[test]
    fn test_load_latin1_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("key.properties");
        std::fs::write(&path, b"storePassword=caf\xe9\nkeyAlias=upload\n").unwrap();

        let props = Properties::load(&path).unwrap();
        assert_eq!(props.get("storePassword"), Some("caf\u{e9}"));
        assert_eq!(props.get("keyAlias"), Some("upload"));
    }

    #[test]
    fn test_load_utf8_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("key.properties");
        std::fs::write(&path, "storePassword=café\n").unwrap();

        let props = Properties::load(&path).unwrap();
        assert_eq!(props.get("storePassword"), Some("café"));
    }

    #[test]
    fn test_render_escapes_separators_in_keys() {
        let mut props = Properties::new();
        props.set("a=b", " leading");
        assert_eq!(props.render(), "a\\=b=\\ leading\n");
    }

    proptest! {
        #[test]
        fn prop_parse_never_panics(input in "\\PC*") {
            let _ = Properties::parse(&input);
        }

        #[test]
        fn prop_rendered_values_survive_reparse(
            key in "[A-Za-z][A-Za-z0-9._]{0,12}",
            value in "[ -~]{0,24}",
        ) {
            let mut props = Properties::new();
            props.set(key.clone(), value.clone());
            let reparsed = Properties::parse(&props.render()).unwrap();
            prop_assert_eq!(reparsed.get(&key), Some(value.as_str()));
        }
    }
}
