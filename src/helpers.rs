//! Runtime Helper Registry
//!
//! Generated code never spells out runtime entry points. It refers to short
//! aliases which every wrapped unit binds, once, to members of the runtime
//! context argument.

use serde::Serialize;

/// One alias binding: `var <alias> = $rt.<member>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HelperAlias {
    pub alias: &'static str,
    pub member: &'static str,
}

/// The closed set of runtime helpers generated code may rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeHelper {
    Nil,
    ClassDef,
    SuperDispatch,
    ConstLookup,
    MethodDef,
    SingletonDef,
    Send,
    Range,
    Hash,
    Slice,
    BreakSignal,
    NoBlock,
    Symbol,
}

static REGISTRY: [HelperAlias; 13] = [
    RuntimeHelper::Nil.entry(),
    RuntimeHelper::ClassDef.entry(),
    RuntimeHelper::SuperDispatch.entry(),
    RuntimeHelper::ConstLookup.entry(),
    RuntimeHelper::MethodDef.entry(),
    RuntimeHelper::SingletonDef.entry(),
    RuntimeHelper::Send.entry(),
    RuntimeHelper::Range.entry(),
    RuntimeHelper::Hash.entry(),
    RuntimeHelper::Slice.entry(),
    RuntimeHelper::BreakSignal.entry(),
    RuntimeHelper::NoBlock.entry(),
    RuntimeHelper::Symbol.entry(),
];

impl RuntimeHelper {
    pub const ALL: [RuntimeHelper; 13] = [
        RuntimeHelper::Nil,
        RuntimeHelper::ClassDef,
        RuntimeHelper::SuperDispatch,
        RuntimeHelper::ConstLookup,
        RuntimeHelper::MethodDef,
        RuntimeHelper::SingletonDef,
        RuntimeHelper::Send,
        RuntimeHelper::Range,
        RuntimeHelper::Hash,
        RuntimeHelper::Slice,
        RuntimeHelper::BreakSignal,
        RuntimeHelper::NoBlock,
        RuntimeHelper::Symbol,
    ];

    /// Name generated code uses.
    pub const fn alias(self) -> &'static str {
        match self {
            RuntimeHelper::Nil => "nil",
            RuntimeHelper::ClassDef => "$class",
            RuntimeHelper::SuperDispatch => "$super",
            RuntimeHelper::ConstLookup => "$const",
            RuntimeHelper::MethodDef => "$defn",
            RuntimeHelper::SingletonDef => "$defs",
            RuntimeHelper::Send => "$send",
            RuntimeHelper::Range => "$range",
            RuntimeHelper::Hash => "$hash",
            RuntimeHelper::Slice => "$slice",
            RuntimeHelper::BreakSignal => "$breaker",
            RuntimeHelper::NoBlock => "$noproc",
            RuntimeHelper::Symbol => "$symbol",
        }
    }

    /// Member of the runtime context the alias is bound to.
    pub const fn member(self) -> &'static str {
        match self {
            RuntimeHelper::Nil => "nil",
            RuntimeHelper::ClassDef => "define_class",
            RuntimeHelper::SuperDispatch => "super_send",
            RuntimeHelper::ConstLookup => "const_get",
            RuntimeHelper::MethodDef => "define_method",
            RuntimeHelper::SingletonDef => "define_singleton_method",
            RuntimeHelper::Send => "send",
            RuntimeHelper::Range => "range",
            RuntimeHelper::Hash => "hash",
            RuntimeHelper::Slice => "slice",
            RuntimeHelper::BreakSignal => "break_signal",
            RuntimeHelper::NoBlock => "no_block",
            RuntimeHelper::Symbol => "symbol",
        }
    }

    pub const fn entry(self) -> HelperAlias {
        HelperAlias {
            alias: self.alias(),
            member: self.member(),
        }
    }

    /// Every helper in declaration order.
    pub fn registry() -> &'static [HelperAlias] {
        &REGISTRY
    }

    pub fn from_alias(alias: &str) -> Option<RuntimeHelper> {
        RuntimeHelper::ALL.into_iter().find(|h| h.alias() == alias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::is_identifier;
    use std::collections::HashSet;

    #[test]
    fn test_registry_matches_enum_order() {
        let registry = RuntimeHelper::registry();
        assert_eq!(registry.len(), RuntimeHelper::ALL.len());
        for (entry, helper) in registry.iter().zip(RuntimeHelper::ALL) {
            assert_eq!(*entry, helper.entry());
        }
    }

    #[test]
    fn test_aliases_are_unique_identifiers() {
        let mut seen = HashSet::new();
        for entry in RuntimeHelper::registry() {
            assert!(is_identifier(entry.alias), "bad alias {}", entry.alias);
            assert!(is_identifier(entry.member), "bad member {}", entry.member);
            assert!(seen.insert(entry.alias), "duplicate alias {}", entry.alias);
        }
    }

    #[test]
    fn test_from_alias() {
        assert_eq!(
            RuntimeHelper::from_alias("$super"),
            Some(RuntimeHelper::SuperDispatch)
        );
        assert_eq!(RuntimeHelper::from_alias("$nope"), None);
    }
}
