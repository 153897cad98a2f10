//! Id alphabet and target-language identifier helpers.
//!
//! Interned ids are bijective base-26 strings over `a..z`:
//! `0 → a`, `25 → z`, `26 → aa`, `27 → ab`, ... Ordinals whose rendering is a
//! reserved word of the target language are never handed out, so every id is
//! usable both as a property name and as a bare variable name.

use crate::helpers::RuntimeHelper;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

const ALPHABET_LEN: u64 = 26;

/// Longest id accepted from a payload. Every ordinal below this bound has
/// `u64` headroom of more than a hundredfold, so advancing a parsed cursor
/// cannot overflow.
pub const MAX_ID_LEN: usize = 12;

lazy_static! {
    static ref IDENTIFIER_RE: Regex = Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap();
    static ref ID_RE: Regex = Regex::new(r"^[a-z]+$").unwrap();

    /// Words that cannot appear as a bare binding in generated code.
    pub static ref RESERVED_WORDS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        for word in [
            "break", "case", "catch", "class", "const", "continue", "debugger", "default",
            "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for",
            "function", "if", "import", "in", "instanceof", "new", "null", "return", "super",
            "switch", "this", "throw", "true", "try", "typeof", "var", "void", "while", "with",
            "yield", "let", "static", "implements", "interface", "package", "private",
            "protected", "public", "await",
            // Legal, but shadowing them breaks generated code.
            "arguments", "eval", "undefined",
        ] {
            s.insert(word);
        }
        s
    };
}

/// Renders an ordinal in the id alphabet.
fn render(mut ordinal: u64) -> String {
    let mut digits = Vec::new();
    loop {
        digits.push(char::from(b'a' + (ordinal % ALPHABET_LEN) as u8));
        ordinal /= ALPHABET_LEN;
        if ordinal == 0 {
            break;
        }
        ordinal -= 1;
    }
    digits.iter().rev().collect()
}

/// Inverse of [`render`]. `None` for anything outside `[a-z]+` or longer
/// than [`MAX_ID_LEN`].
fn ordinal_of(id: &str) -> Option<u64> {
    if id.len() > MAX_ID_LEN || !ID_RE.is_match(id) {
        return None;
    }
    let mut value: u64 = 0;
    for b in id.bytes() {
        value = value
            .checked_mul(ALPHABET_LEN)?
            .checked_add(u64::from(b - b'a') + 1)?;
    }
    Some(value - 1)
}

/// Next-id cursor. Strictly increasing; never yields the same id twice.
///
/// The cursor always rests on an ordinal that renders to a non-reserved id,
/// so its string form is exactly the id the next allocation returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct IdCursor {
    ordinal: u64,
}

impl IdCursor {
    pub fn new() -> Self {
        Self::at(0)
    }

    fn at(ordinal: u64) -> Self {
        let mut cursor = IdCursor { ordinal };
        cursor.skip_reserved();
        cursor
    }

    fn skip_reserved(&mut self) {
        while is_unusable(&render(self.ordinal)) {
            self.ordinal += 1;
        }
    }

    /// Parses the string form of a cursor (the next id it will hand out).
    pub fn parse(s: &str) -> Option<Self> {
        ordinal_of(s).map(Self::at)
    }

    /// The cursor positioned just past `id`.
    pub fn after(id: &str) -> Option<Self> {
        ordinal_of(id).map(|ordinal| Self::at(ordinal + 1))
    }

    /// Hands out the current id and advances.
    pub fn next_id(&mut self) -> String {
        let id = render(self.ordinal);
        self.ordinal += 1;
        self.skip_reserved();
        id
    }

    /// The id the next call to [`IdCursor::next_id`] returns.
    pub fn peek(&self) -> String {
        render(self.ordinal)
    }

    /// True when `id` was (or would have been) handed out before this position.
    pub fn is_past(&self, id: &str) -> bool {
        ordinal_of(id).is_some_and(|ordinal| ordinal < self.ordinal)
    }
}

impl fmt::Display for IdCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.peek())
    }
}

impl Serialize for IdCursor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.peek())
    }
}

impl<'de> Deserialize<'de> for IdCursor {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        IdCursor::parse(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid id cursor '{}'", s)))
    }
}

/// Reserved words and bare helper aliases such as `nil`, which the unit
/// prologue already binds.
fn is_unusable(id: &str) -> bool {
    RESERVED_WORDS.contains(id) || RuntimeHelper::from_alias(id).is_some()
}

/// True when `id` could have been produced by an [`IdCursor`].
pub fn is_valid_id(id: &str) -> bool {
    ordinal_of(id).is_some() && !is_unusable(id)
}

/// Target-language identifier grammar (ASCII subset).
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name)
}

/// Escapes `s` into a double-quoted target string literal.
pub fn quote(s: &str) -> String {
    serde_json::Value::from(s)
        .to_string()
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

/// Member access for `name`: `.name` when it is a plain identifier,
/// `["name"]` otherwise.
pub fn property_access(name: &str) -> String {
    if is_identifier(name) && !RESERVED_WORDS.contains(name) {
        format!(".{}", name)
    } else {
        format!("[{}]", quote(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alphabet_sequence() {
        let mut cursor = IdCursor::new();
        let ids: Vec<String> = (0..28).map(|_| cursor.next_id()).collect();
        assert_eq!(ids[0], "a");
        assert_eq!(ids[1], "b");
        assert_eq!(ids[25], "z");
        assert_eq!(ids[26], "aa");
        assert_eq!(ids[27], "ab");
    }

    #[test]
    fn test_reserved_words_are_skipped() {
        let mut cursor = IdCursor::parse("dn").unwrap();
        assert_eq!(cursor.next_id(), "dn");
        // "do" is reserved
        assert_eq!(cursor.next_id(), "dp");

        let cursor = IdCursor::parse("if").unwrap();
        assert_eq!(cursor.peek(), "ig");
    }

    #[test]
    fn test_bare_helper_aliases_are_skipped() {
        let mut cursor = IdCursor::parse("nik").unwrap();
        assert_eq!(cursor.next_id(), "nik");
        assert_eq!(cursor.next_id(), "nim");
        assert_eq!(IdCursor::parse("nil").unwrap().peek(), "nim");
        assert!(!is_valid_id("nil"));
    }

    #[test]
    fn test_overlong_ids_are_rejected() {
        let longest = "z".repeat(MAX_ID_LEN);
        let mut cursor = IdCursor::parse(&longest).unwrap();
        assert_eq!(cursor.next_id(), longest);
        assert_eq!(cursor.next_id(), "a".repeat(MAX_ID_LEN + 1));

        // Would otherwise sit one step short of u64::MAX.
        assert!(IdCursor::parse("gkgwbylwrxtlpo").is_none());
        assert!(IdCursor::after("gkgwbylwrxtlpo").is_none());
        assert!(!is_valid_id("gkgwbylwrxtlpo"));
    }

    #[test]
    fn test_parse_and_display_agree() {
        for s in ["a", "z", "aa", "zz", "abc"] {
            assert_eq!(IdCursor::parse(s).unwrap().to_string(), s);
        }
        assert!(IdCursor::parse("").is_none());
        assert!(IdCursor::parse("A").is_none());
        assert!(IdCursor::parse("a1").is_none());
    }

    #[test]
    fn test_cursor_ordering() {
        let a = IdCursor::parse("z").unwrap();
        let b = IdCursor::parse("aa").unwrap();
        assert!(a < b);
        assert!(b.is_past("z"));
        assert!(!a.is_past("z"));
        assert_eq!(IdCursor::after("z"), Some(b));
    }

    #[test]
    fn test_ids_are_never_reserved() {
        let mut cursor = IdCursor::new();
        for _ in 0..2000 {
            let id = cursor.next_id();
            assert!(is_valid_id(&id), "{} should be a usable id", id);
        }
    }

    #[test]
    fn test_property_access() {
        assert_eq!(property_access("foo"), ".foo");
        assert_eq!(property_access("$bar_1"), ".$bar_1");
        assert_eq!(property_access("empty?"), "[\"empty?\"]");
        assert_eq!(property_access("new"), "[\"new\"]");
    }

    #[test]
    fn test_quote_escapes_once() {
        assert_eq!(quote("plain"), "\"plain\"");
        assert_eq!(quote("say \"hi\""), "\"say \\\"hi\\\"\"");
        assert_eq!(quote("a\\b"), "\"a\\\\b\"");
        assert_eq!(quote("line\nbreak"), "\"line\\nbreak\"");
        assert_eq!(quote("\u{2028}"), "\"\\u2028\"");
    }
}
