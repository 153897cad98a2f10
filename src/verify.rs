//! Output verification for wrapped units.

use crate::error::OutputError;
use oxc_allocator::Allocator;
use oxc_ast::ast::{BindingIdentifier, Class, Function, IdentifierReference};
use oxc_ast_visit::Visit;
use oxc_parser::Parser;
use oxc_span::SourceType;
use oxc_syntax::scope::ScopeFlags;
use std::collections::{BTreeSet, HashSet};

/// Checks a wrapped unit: it must parse as target code, and every
/// `$`-prefixed identifier it reads must be bound somewhere in the unit
/// (a parameter, a prologue alias, a symbol literal or a local).
///
/// Scoping is flat: a binding anywhere in the unit satisfies a reference
/// anywhere in it.
pub fn verify_unit(file: &str, wrapped: &str) -> Result<(), OutputError> {
    let allocator = Allocator::default();
    let source = format!("({})", wrapped);
    let expr = Parser::new(&allocator, &source, SourceType::default())
        .parse_expression()
        .map_err(|errors| OutputError::Unparseable {
            file: file.to_string(),
            message: format!("{:?}", errors),
        })?;

    let mut collector = UsageCollector::default();
    collector.visit_expression(&expr);

    match collector
        .references
        .iter()
        .find(|name| !collector.bindings.contains(*name))
    {
        Some(name) => Err(OutputError::UnresolvedHelper {
            file: file.to_string(),
            name: name.clone(),
        }),
        None => Ok(()),
    }
}

#[derive(Default)]
struct UsageCollector {
    references: BTreeSet<String>,
    bindings: HashSet<String>,
}

impl<'a> Visit<'a> for UsageCollector {
    fn visit_identifier_reference(&mut self, ident: &IdentifierReference<'a>) {
        if ident.name.starts_with('$') {
            self.references.insert(ident.name.to_string());
        }
    }

    fn visit_binding_identifier(&mut self, ident: &BindingIdentifier<'a>) {
        self.bindings.insert(ident.name.to_string());
    }

    fn visit_function(&mut self, func: &Function<'a>, flags: ScopeFlags) {
        if let Some(id) = &func.id {
            self.bindings.insert(id.name.to_string());
        }
        oxc_ast_visit::walk::walk_function(self, func, flags);
    }

    fn visit_class(&mut self, class: &Class<'a>) {
        if let Some(id) = &class.id {
            self.bindings.insert(id.name.to_string());
        }
        oxc_ast_visit::walk::walk_class(self, class);
    }
}
