//! Cache Persistence Codec
//!
//! A [`CachePayload`] has two serialized forms:
//!
//! - the embeddable literal, a call the target runtime executes to register
//!   the mapping with its own bookkeeping:
//!   `$runtime.intern_ids({"foo": "a", "bar": "b"}, "c")`
//! - a JSON document for build tools that keep the cache on disk.
//!
//! Both decoders validate the payload; a malformed cache is always an error,
//! never an empty table.

use crate::error::CachePayloadError;
use crate::ident::{is_valid_id, quote, IdCursor};
use oxc_allocator::Allocator;
use oxc_ast::ast::{Argument, Expression, ObjectPropertyKind, PropertyKey};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};

/// Runtime function the embeddable literal calls.
pub const REGISTRAR: &str = "$runtime.intern_ids";

/// Snapshot of a persistent interning table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachePayload {
    /// `(name, id)` pairs in insertion order.
    pub entries: Vec<(String, String)>,
    pub next: IdCursor,
}

impl CachePayload {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Checks the invariants a table loaded from this payload relies on.
    pub fn validate(&self) -> Result<(), CachePayloadError> {
        let mut names = HashSet::new();
        let mut owners: HashMap<&str, &str> = HashMap::new();

        for (name, id) in &self.entries {
            if !is_valid_id(id) {
                return Err(CachePayloadError::InvalidId {
                    name: name.clone(),
                    id: id.clone(),
                });
            }
            if !names.insert(name.as_str()) {
                return Err(CachePayloadError::DuplicateName(name.clone()));
            }
            if let Some(first) = owners.insert(id.as_str(), name.as_str()) {
                return Err(CachePayloadError::DuplicateId {
                    id: id.clone(),
                    first: first.to_string(),
                    second: name.clone(),
                });
            }
            if !self.next.is_past(id) {
                return Err(CachePayloadError::CursorBehind {
                    cursor: self.next.to_string(),
                    id: id.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, CachePayloadError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, CachePayloadError> {
        let payload: CachePayload = serde_json::from_str(json)?;
        payload.validate()?;
        Ok(payload)
    }

    /// SHA-256 of the embeddable literal. Equal tables give equal digests.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(encode(self).as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Renders `payload` as the registration call.
pub fn encode(payload: &CachePayload) -> String {
    let mapping = payload
        .entries
        .iter()
        .map(|(name, id)| format!("{}: {}", quote(name), quote(id)))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{}({{{}}}, {})",
        REGISTRAR,
        mapping,
        quote(&payload.next.to_string())
    )
}

/// Parses a literal produced by [`encode`].
pub fn decode(literal: &str) -> Result<CachePayload, CachePayloadError> {
    let source = literal.trim().trim_end_matches(';');
    let allocator = Allocator::default();
    let expr = Parser::new(&allocator, source, SourceType::default())
        .parse_expression()
        .map_err(|errors| CachePayloadError::Unparseable(format!("{:?}", errors)))?;

    let Expression::CallExpression(call) = &expr else {
        return Err(CachePayloadError::NotACall);
    };

    let callee_span = call.callee.span();
    let callee = &source[callee_span.start as usize..callee_span.end as usize];
    if callee != REGISTRAR {
        return Err(CachePayloadError::WrongRegistrar {
            found: callee.to_string(),
            expected: REGISTRAR,
        });
    }
    if call.arguments.len() != 2 {
        return Err(CachePayloadError::Arity(call.arguments.len()));
    }

    let Argument::ObjectExpression(mapping) = &call.arguments[0] else {
        return Err(CachePayloadError::ExpectedObject);
    };

    let mut entries = Vec::with_capacity(mapping.properties.len());
    for property in &mapping.properties {
        let ObjectPropertyKind::ObjectProperty(property) = property else {
            return Err(CachePayloadError::NonStringKey(property.span().start));
        };
        if property.computed {
            return Err(CachePayloadError::NonStringKey(property.span.start));
        }
        let name = match &property.key {
            PropertyKey::StringLiteral(s) => s.value.to_string(),
            PropertyKey::StaticIdentifier(ident) => ident.name.to_string(),
            other => return Err(CachePayloadError::NonStringKey(other.span().start)),
        };
        let Expression::StringLiteral(id) = &property.value else {
            return Err(CachePayloadError::NonStringValue(name));
        };
        entries.push((name, id.value.to_string()));
    }

    let Argument::StringLiteral(cursor) = &call.arguments[1] else {
        return Err(CachePayloadError::ExpectedCursor);
    };
    let next = IdCursor::parse(cursor.value.as_str())
        .ok_or_else(|| CachePayloadError::InvalidCursor(cursor.value.to_string()))?;

    let payload = CachePayload { entries, next };
    payload.validate()?;
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(entries: &[(&str, &str)], next: &str) -> CachePayload {
        CachePayload {
            entries: entries
                .iter()
                .map(|(n, i)| (n.to_string(), i.to_string()))
                .collect(),
            next: IdCursor::parse(next).unwrap(),
        }
    }

    #[test]
    fn test_encode_shape() {
        let p = payload(&[("foo", "a"), ("bar", "b")], "c");
        assert_eq!(
            encode(&p),
            r#"$runtime.intern_ids({"foo": "a", "bar": "b"}, "c")"#
        );
        assert_eq!(encode(&CachePayload::default()), r#"$runtime.intern_ids({}, "a")"#);
    }

    #[test]
    fn test_validate_rejects_cursor_behind() {
        let p = payload(&[("foo", "a"), ("bar", "b")], "b");
        assert!(matches!(
            p.validate(),
            Err(CachePayloadError::CursorBehind { ref id, .. }) if id == "b"
        ));
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let p = payload(&[("foo", "a"), ("foo", "b")], "c");
        assert!(matches!(p.validate(), Err(CachePayloadError::DuplicateName(ref n)) if n == "foo"));

        let p = payload(&[("foo", "a"), ("bar", "a")], "c");
        assert!(matches!(p.validate(), Err(CachePayloadError::DuplicateId { .. })));
    }

    #[test]
    fn test_validate_rejects_reserved_id() {
        let p = payload(&[("foo", "do")], "zz");
        assert!(matches!(p.validate(), Err(CachePayloadError::InvalidId { .. })));
    }

    #[test]
    fn test_digest_is_stable() {
        let a = payload(&[("foo", "a"), ("bar", "b")], "c");
        let b = a.clone();
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);

        let reordered = payload(&[("bar", "b"), ("foo", "a")], "c");
        assert_ne!(a.digest(), reordered.digest());
    }
}
