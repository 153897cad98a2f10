//! Runtime Helper Wrapping
//!
//! Every compiled unit becomes one function literal:
//!
//! ```text
//! function($rt) {
//! var nil = $rt.nil, $class = $rt.define_class, ...;
//! var $s1 = $rt.symbol("each");
//! <raw generated code>
//! }
//! ```
//!
//! The foundational unit takes `($rt, $root, $file)` instead. Output is a
//! pure function of its inputs: same registry, same symbols, same raw code,
//! same bytes.

use crate::helpers::{HelperAlias, RuntimeHelper};
use crate::ident::quote;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Parameter bound to the runtime context.
pub const RUNTIME_PARAM: &str = "$rt";
/// Root namespace, passed to the foundational unit only.
pub const ROOT_PARAM: &str = "$root";
/// Current file identifier, passed to the foundational unit only.
pub const FILE_PARAM: &str = "$file";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum UnitShape {
    #[default]
    Ordinary,
    /// Bootstraps the definitions ordinary units assume exist.
    Core,
}

impl UnitShape {
    pub fn params(self) -> &'static [&'static str] {
        match self {
            UnitShape::Ordinary => &[RUNTIME_PARAM],
            UnitShape::Core => &[RUNTIME_PARAM, ROOT_PARAM, FILE_PARAM],
        }
    }
}

/// A symbol literal hoisted into the unit prologue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolLiteral {
    pub id: String,
    pub name: String,
}

/// Symbol literals referenced by one unit, numbered `$s1`, `$s2`, ... in
/// first-use order.
#[derive(Debug, Clone, Default)]
pub struct SymbolLiterals {
    literals: Vec<SymbolLiteral>,
    index: HashMap<String, usize>,
}

impl SymbolLiterals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_insert(&mut self, name: &str) -> String {
        if let Some(&i) = self.index.get(name) {
            return self.literals[i].id.clone();
        }
        let id = format!("$s{}", self.literals.len() + 1);
        self.index.insert(name.to_string(), self.literals.len());
        self.literals.push(SymbolLiteral {
            id: id.clone(),
            name: name.to_string(),
        });
        id
    }

    pub fn as_slice(&self) -> &[SymbolLiteral] {
        &self.literals
    }

    pub fn into_vec(self) -> Vec<SymbolLiteral> {
        self.literals
    }
}

pub fn wrap(
    shape: UnitShape,
    helpers: &[HelperAlias],
    symbols: &[SymbolLiteral],
    raw: &str,
) -> String {
    let mut out = format!("function({}) {{\n", shape.params().join(", "));

    if !helpers.is_empty() {
        let decls = helpers
            .iter()
            .map(|h| format!("{} = {}.{}", h.alias, RUNTIME_PARAM, h.member))
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!("var {};\n", decls));
    }

    if !symbols.is_empty() {
        let decls = symbols
            .iter()
            .map(|s| {
                format!(
                    "{} = {}.{}({})",
                    s.id,
                    RUNTIME_PARAM,
                    RuntimeHelper::Symbol.member(),
                    quote(&s.name)
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!("var {};\n", decls));
    }

    out.push_str(raw);
    if !raw.is_empty() && !raw.ends_with('\n') {
        out.push('\n');
    }
    out.push('}');
    out
}

/// Ordinary unit with the full runtime registry.
pub fn wrap_unit(raw: &str) -> String {
    wrap(UnitShape::Ordinary, RuntimeHelper::registry(), &[], raw)
}

/// Foundational unit with the full runtime registry.
pub fn wrap_core_unit(raw: &str) -> String {
    wrap(UnitShape::Core, RuntimeHelper::registry(), &[], raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_helper_prologue() {
        let helpers = [HelperAlias {
            alias: "$x",
            member: "y",
        }];
        assert_eq!(
            wrap(UnitShape::Ordinary, &helpers, &[], "1+1"),
            "function($rt) {\nvar $x = $rt.y;\n1+1\n}"
        );
    }

    #[test]
    fn test_core_shape_parameters() {
        let out = wrap(UnitShape::Core, &[], &[], "x();\n");
        assert_eq!(out, "function($rt, $root, $file) {\nx();\n}");
    }

    #[test]
    fn test_registry_order_is_preserved() {
        let out = wrap_unit("");
        let prologue = out.lines().nth(1).unwrap();
        assert!(prologue.starts_with("var nil = $rt.nil, $class = $rt.define_class, "));
        assert!(prologue.ends_with("$symbol = $rt.symbol;"));
        assert_eq!(wrap_unit("a()"), wrap_unit("a()"));
    }

    #[test]
    fn test_symbol_literals_are_quoted() {
        let symbols = [
            SymbolLiteral {
                id: "$s1".to_string(),
                name: "each".to_string(),
            },
            SymbolLiteral {
                id: "$s2".to_string(),
                name: "a\"b".to_string(),
            },
        ];
        let out = wrap(UnitShape::Ordinary, &[], &symbols, "f($s1)");
        assert_eq!(
            out,
            "function($rt) {\nvar $s1 = $rt.symbol(\"each\"), $s2 = $rt.symbol(\"a\\\"b\");\nf($s1)\n}"
        );
    }

    #[test]
    fn test_symbol_literals_dedupe() {
        let mut symbols = SymbolLiterals::new();
        assert_eq!(symbols.get_or_insert("each"), "$s1");
        assert_eq!(symbols.get_or_insert("map"), "$s2");
        assert_eq!(symbols.get_or_insert("each"), "$s1");
        assert_eq!(symbols.as_slice().len(), 2);
        assert_eq!(symbols.into_vec()[1].name, "map");
    }

    #[test]
    fn test_core_unit_uses_full_registry() {
        let out = wrap_core_unit("boot()");
        assert!(out.starts_with("function($rt, $root, $file) {\nvar nil = $rt.nil"));
        assert!(out.ends_with("boot()\n}"));
    }
}
